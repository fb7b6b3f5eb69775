/// Errors raised by the parameter store and its codecs.
#[derive(thiserror::Error, Debug)]
pub enum ParamError {
    /// An existing parameter was requested with a different shape.
    #[error(
        "shape mismatch for parameter '{path}': registered {registered:?}, requested {requested:?}"
    )]
    ShapeMismatch {
        path: String,
        registered: Vec<usize>,
        requested: Vec<usize>,
    },

    /// A name is already bound to the other kind of entry (parameter vs scope).
    #[error("'{path}' is bound to a {found}, expected a {expected}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Save or load called with a file extension that maps to no codec.
    #[error("unsupported parameter file format '{0}', only 'h5' and 'protobuf' are supported")]
    UnsupportedFormat(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("encode error: {0}")]
    Encode(String),

    #[error("decode error: {0}")]
    Decode(String),
}

impl ParamError {
    pub(crate) fn type_mismatch(path: &str, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }
}
