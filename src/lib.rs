//! Named, hierarchically scoped parameter variables with file persistence.
//!
//! A [`ParameterStore`] holds a tree of named scopes, each slot of which is
//! either a nested scope or a parameter [`Variable`]. Scopes are entered with
//! [`ParameterStore::scope`], which returns a guard restoring the previous
//! scope on drop, so nested scopes compose correctly even when an error
//! propagates mid-scope:
//!
//! ```
//! use param_store::{Initializer, ParameterStore};
//!
//! let mut store = ParameterStore::new();
//! {
//!     let mut conv1 = store.scope("conv1").unwrap();
//!     conv1
//!         .get_parameter_or_create("w", &[16, 3, 5, 5], Some(&Initializer::Zeros), true)
//!         .unwrap();
//! }
//! assert!(store.get_parameter("conv1/w").unwrap().is_some());
//! ```
//!
//! The full parameter set can be saved to and loaded from two formats,
//! selected by file extension: a hierarchical binary container (`.h5`) and a
//! flat protobuf message stream (`.protobuf`).

pub mod codec;
mod error;
pub mod initializer;
pub mod scope;
pub mod store;
pub mod variable;

pub use error::ParamError;
pub use initializer::Initializer;
pub use store::{ParameterStore, ScopeGuard};
pub use variable::Variable;
