use thiserror::Error;

/// Closed error surface returned by [`crate::process_embroidery`].
///
/// `AssetMissing` conditions (a named fabric background that isn't bundled) are
/// deliberately not a variant here — per the design, they are recovered internally
/// by falling back to a default color and never reach the caller.
#[derive(Debug, Error)]
pub enum ThreadcraftError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("unsupported option: {0}")]
    UnsupportedOption(String),

    #[error("internal error in stage '{stage}': {message}")]
    InternalError { stage: &'static str, message: String },
}

impl ThreadcraftError {
    pub fn internal(stage: &'static str, message: impl Into<String>) -> Self {
        ThreadcraftError::InternalError { stage, message: message.into() }
    }
}

pub type Result<T> = std::result::Result<T, ThreadcraftError>;
