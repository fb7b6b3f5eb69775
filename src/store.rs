//! The parameter registry: scope entry/exit, path-addressed get/set/create,
//! enumeration, and extension-dispatched save/load.

use std::fs::File;
use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::rc::Rc;

use crate::codec;
use crate::error::ParamError;
use crate::initializer::Initializer;
use crate::scope::{ScopeEntry, SharedScope};
use crate::variable::Variable;

/// A hierarchical registry of named parameter [`Variable`]s.
///
/// The store owns a scope tree and a "current scope" pointer, initially the
/// root. Registry operations resolve '/'-separated paths relative to the
/// current scope; [`scope`](Self::scope) moves the pointer for the lifetime
/// of the returned guard.
pub struct ParameterStore {
    root: SharedScope,
    current: SharedScope,
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ParameterStore {
    pub fn new() -> Self {
        let root: SharedScope = SharedScope::default();
        Self {
            current: Rc::clone(&root),
            root,
        }
    }

    /// Whether the current scope is the root scope.
    pub fn at_root(&self) -> bool {
        Rc::ptr_eq(&self.current, &self.root)
    }

    /// Enters the subscope `name` of the current scope, creating it when
    /// absent, and returns a guard that restores the previous current scope
    /// on drop. Fails when `name` is bound to a parameter.
    pub fn scope(&mut self, name: &str) -> Result<ScopeGuard<'_>, ParamError> {
        let child = self.current.borrow_mut().child_scope(name)?;
        let prev = std::mem::replace(&mut self.current, child);
        Ok(ScopeGuard { prev, store: self })
    }

    /// Resolves the scope holding the last segment of `path`, creating
    /// intermediate subscopes as needed. The current scope is not moved.
    fn leaf_scope<'p>(&self, path: &'p str) -> Result<(SharedScope, &'p str), ParamError> {
        let (dirs, leaf) = match path.rsplit_once('/') {
            Some((dirs, leaf)) => (dirs, leaf),
            None => ("", path),
        };
        let mut node = Rc::clone(&self.current);
        if !dirs.is_empty() {
            for segment in dirs.split('/') {
                let child = node.borrow_mut().child_scope(segment)?;
                node = child;
            }
        }
        Ok((node, leaf))
    }

    /// Returns the parameter registered at `path`, or `None` when the slot is
    /// empty. Fails when the path runs through or ends on an entry of the
    /// wrong kind.
    pub fn get_parameter(&self, path: &str) -> Result<Option<Variable>, ParamError> {
        let (node, leaf) = self.leaf_scope(path)?;
        let node = node.borrow();
        match node.get(leaf) {
            None => Ok(None),
            Some(ScopeEntry::Param(var)) => Ok(Some(var.clone())),
            Some(entry @ ScopeEntry::Scope(_)) => {
                Err(ParamError::type_mismatch(path, "parameter", entry.kind()))
            }
        }
    }

    /// Registers `variable` at `path`, overwriting any previously registered
    /// parameter under that name.
    pub fn set_parameter(&self, path: &str, variable: Variable) -> Result<(), ParamError> {
        let (node, leaf) = self.leaf_scope(path)?;
        let result = node.borrow_mut().insert_param(leaf, variable);
        result
    }

    /// Returns the parameter at `path`, creating and registering it when
    /// absent.
    ///
    /// A created variable has the given `shape` and `need_grad`, and data
    /// filled by `initializer` (zeroed when none is given). An existing
    /// variable must match `shape` exactly; when its `need_grad` differs from
    /// the requested one, an [unlinked](Variable::unlinked) view carrying the
    /// requested flag is returned and the registered variable is untouched.
    /// Otherwise the registered variable itself is returned, so repeated
    /// calls with the same path, shape and flag hand out the same instance.
    pub fn get_parameter_or_create(
        &self,
        path: &str,
        shape: &[usize],
        initializer: Option<&Initializer>,
        need_grad: bool,
    ) -> Result<Variable, ParamError> {
        match self.get_parameter(path)? {
            None => {
                let var = Variable::new(shape, need_grad);
                if let Some(initializer) = initializer {
                    var.set_data(initializer.init(shape));
                }
                self.set_parameter(path, var.clone())?;
                Ok(var)
            }
            Some(var) => {
                if var.shape() != shape {
                    return Err(ParamError::ShapeMismatch {
                        path: path.into(),
                        registered: var.shape().to_vec(),
                        requested: shape.to_vec(),
                    });
                }
                if var.need_grad() != need_grad {
                    let view = var.unlinked();
                    view.set_need_grad(need_grad);
                    Ok(view)
                } else {
                    Ok(var)
                }
            }
        }
    }

    /// Enumerates the parameters under the current scope, depth-first, as
    /// '/'-joined paths relative to it. Entries at every level are visited in
    /// insertion order, so the result is deterministic absent intervening
    /// mutation. With `grad_only`, variables with `need_grad == false` are
    /// skipped.
    pub fn get_parameters(&self, grad_only: bool) -> Vec<(String, Variable)> {
        let mut params = Vec::new();
        collect_params(&self.current, "", grad_only, &mut params);
        params
    }

    /// Removes every entry of the current scope. Sibling and ancestor scopes
    /// are unaffected.
    pub fn clear_parameters(&self) {
        self.current.borrow_mut().clear();
    }

    /// Saves all parameters under the current scope (including those with
    /// `need_grad == false`) to `path`. The format is selected by extension:
    /// `.h5` for the hierarchical container, `.protobuf` for the flat message
    /// stream. Any other extension fails before a file is created.
    pub fn save_parameters<P: AsRef<Path>>(&self, path: P) -> Result<(), ParamError> {
        let path = path.as_ref();
        match extension(path) {
            "h5" => {
                let mut file = File::create(path)?;
                codec::container::save(self, &mut file)?;
            }
            "protobuf" => {
                let mut file = File::create(path)?;
                codec::proto::save(self, &mut file)?;
            }
            other => {
                log::error!("only the h5 and protobuf formats are supported");
                return Err(ParamError::UnsupportedFormat(other.to_string()));
            }
        }
        log::info!("parameter save: {}", path.display());
        Ok(())
    }

    /// Loads parameters from `path` into the current scope, creating missing
    /// ones and overwriting the data of existing ones. Format selection works
    /// as in [`save_parameters`](Self::save_parameters).
    pub fn load_parameters<P: AsRef<Path>>(&self, path: P) -> Result<(), ParamError> {
        let path = path.as_ref();
        match extension(path) {
            "h5" => {
                let mut file = open_file(path)?;
                codec::container::load(self, &mut file)?;
            }
            "protobuf" => {
                let mut file = open_file(path)?;
                let mut proto = codec::proto::ParameterCollection::default();
                codec::proto::load(self, &mut file, &mut proto)?;
            }
            other => {
                log::error!("only the h5 and protobuf formats are supported");
                return Err(ParamError::UnsupportedFormat(other.to_string()));
            }
        }
        log::info!("parameter load: {}", path.display());
        Ok(())
    }
}

fn collect_params(
    node: &SharedScope,
    prefix: &str,
    grad_only: bool,
    params: &mut Vec<(String, Variable)>,
) {
    for (name, entry) in node.borrow().iter() {
        let path = if prefix.is_empty() {
            name.clone()
        } else {
            format!("{prefix}/{name}")
        };
        match entry {
            ScopeEntry::Scope(child) => collect_params(child, &path, grad_only, params),
            ScopeEntry::Param(var) => {
                if !grad_only || var.need_grad() {
                    params.push((path, var.clone()));
                }
            }
        }
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|ext| ext.to_str()).unwrap_or("")
}

fn open_file(path: &Path) -> Result<File, ParamError> {
    File::open(path).map_err(ParamError::Io)
}

/// Guard returned by [`ParameterStore::scope`]. Dereferences to the store so
/// registry calls nest inside the entered scope; dropping it restores the
/// previous current scope, on normal exit and during unwinding alike.
pub struct ScopeGuard<'a> {
    store: &'a mut ParameterStore,
    prev: SharedScope,
}

impl Deref for ScopeGuard<'_> {
    type Target = ParameterStore;

    fn deref(&self) -> &Self::Target {
        self.store
    }
}

impl DerefMut for ScopeGuard<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.store
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.store.current = Rc::clone(&self.prev);
    }
}

// Keep the registry semantics covered here; file round-trips live in
// tests/round_trip.rs.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_guard_restores_previous_scope() {
        let mut store = ParameterStore::new();
        {
            let mut outer = store.scope("a").unwrap();
            assert!(!outer.at_root());
            {
                let inner = outer.scope("b").unwrap();
                inner.set_parameter("w", Variable::new(&[1], true)).unwrap();
            }
            assert!(!outer.at_root());
        }
        assert!(store.at_root());
        assert!(store.get_parameter("a/b/w").unwrap().is_some());
    }

    #[test]
    fn scope_guard_restores_on_error_propagation() {
        fn faulty(store: &mut ParameterStore) -> Result<(), ParamError> {
            let scoped = store.scope("layer")?;
            scoped.set_parameter("w", Variable::new(&[1], true))?;
            // A parameter slot cannot be entered as a scope.
            scoped.get_parameter("w/x")?;
            unreachable!()
        }

        let mut store = ParameterStore::new();
        assert!(faulty(&mut store).is_err());
        assert!(store.at_root());
    }

    #[test]
    fn get_or_create_returns_same_instance() {
        let store = ParameterStore::new();
        let first = store
            .get_parameter_or_create("a/b/w", &[3, 4], None, true)
            .unwrap();
        let second = store
            .get_parameter_or_create("a/b/w", &[3, 4], None, true)
            .unwrap();
        assert!(Variable::ptr_eq(&first, &second));
    }

    #[test]
    fn get_or_create_with_other_need_grad_returns_unlinked_view() {
        let store = ParameterStore::new();
        let original = store
            .get_parameter_or_create("w", &[2, 2], None, true)
            .unwrap();
        let frozen = store
            .get_parameter_or_create("w", &[2, 2], None, false)
            .unwrap();

        assert!(!Variable::ptr_eq(&original, &frozen));
        assert!(Variable::shares_data(&original, &frozen));
        assert!(original.need_grad());
        assert!(!frozen.need_grad());

        // The registered entry is still the original.
        let again = store.get_parameter("w").unwrap().unwrap();
        assert!(Variable::ptr_eq(&original, &again));
    }

    #[test]
    fn get_or_create_rejects_shape_mismatch() {
        let store = ParameterStore::new();
        store
            .get_parameter_or_create("p", &[2, 2], None, true)
            .unwrap();
        let err = store
            .get_parameter_or_create("p", &[3, 3], None, true)
            .unwrap_err();
        assert!(matches!(err, ParamError::ShapeMismatch { .. }));
    }

    #[test]
    fn get_or_create_applies_initializer() {
        let store = ParameterStore::new();
        let var = store
            .get_parameter_or_create("w", &[2, 3], Some(&Initializer::Constant(1.5)), true)
            .unwrap();
        assert_eq!(var.to_flat_vec(), vec![1.5; 6]);
    }

    #[test]
    fn get_parameters_filters_and_orders() {
        let mut store = ParameterStore::new();
        {
            let scoped = store.scope("block").unwrap();
            scoped
                .get_parameter_or_create("w", &[2], None, true)
                .unwrap();
            scoped
                .get_parameter_or_create("mean", &[2], None, false)
                .unwrap();
        }
        store.get_parameter_or_create("out", &[1], None, true).unwrap();

        let all: Vec<String> = store
            .get_parameters(false)
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(all, vec!["block/w", "block/mean", "out"]);

        let trainable: Vec<String> = store
            .get_parameters(true)
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(trainable, vec!["block/w", "out"]);
    }

    #[test]
    fn get_parameters_is_relative_to_current_scope() {
        let mut store = ParameterStore::new();
        store
            .get_parameter_or_create("a/w", &[1], None, true)
            .unwrap();
        store
            .get_parameter_or_create("b/w", &[1], None, true)
            .unwrap();

        let scoped = store.scope("a").unwrap();
        let paths: Vec<String> = scoped
            .get_parameters(false)
            .into_iter()
            .map(|(path, _)| path)
            .collect();
        assert_eq!(paths, vec!["w"]);
    }

    #[test]
    fn clear_parameters_spares_siblings() {
        let mut store = ParameterStore::new();
        store
            .get_parameter_or_create("a/w", &[1], None, true)
            .unwrap();
        store
            .get_parameter_or_create("b/w", &[1], None, true)
            .unwrap();

        {
            let scoped = store.scope("a").unwrap();
            scoped.clear_parameters();
        }

        assert!(store.get_parameter("a/w").unwrap().is_none());
        assert!(store.get_parameter("b/w").unwrap().is_some());
    }

    #[test]
    fn set_parameter_overwrites_unconditionally() {
        let store = ParameterStore::new();
        let first = Variable::new(&[2], true);
        let second = Variable::new(&[3], false);
        store.set_parameter("w", first).unwrap();
        store.set_parameter("w", second.clone()).unwrap();

        let found = store.get_parameter("w").unwrap().unwrap();
        assert!(Variable::ptr_eq(&found, &second));
    }

    #[test]
    fn parameter_slot_cannot_become_scope() {
        let mut store = ParameterStore::new();
        store.set_parameter("w", Variable::new(&[1], true)).unwrap();
        assert!(store.scope("w").is_err());
        assert!(store.get_parameter("w/nested").is_err());
        assert!(store.at_root());
    }
}
