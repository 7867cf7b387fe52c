use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid range bound '{literal}': {reason}")]
    InvalidRangeBound { literal: String, reason: String },

    #[error("Precondition violated: {0}")]
    PreconditionViolation(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn invalid_bound(literal: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidRangeBound {
            literal: literal.into(),
            reason: reason.to_string(),
        }
    }
}

/// Checks an internal invariant.
///
/// Debug and test builds panic on the spot; release builds surface the
/// failure as [`Error::PreconditionViolation`] so a broken invariant can
/// never turn into silently wrong counts.
macro_rules! precondition {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            let msg = format!($($arg)+);
            if cfg!(debug_assertions) {
                panic!("precondition violated: {}", msg);
            }
            return Err($crate::error::Error::PreconditionViolation(msg));
        }
    };
}

pub(crate) use precondition;
