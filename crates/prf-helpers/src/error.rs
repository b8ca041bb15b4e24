use std::fmt;

/// Errors surfaced while normalizing credentials or extracting PRF outputs.
///
/// Variant names line up with the error taxonomy in the orchestrator
/// (`secure_confirm::error::ConfirmError`) so a `PrfError` can be mapped to a
/// decision envelope error kind without re-deriving the classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrfError {
    /// The credential's extension results carried no `prf` object at all —
    /// the platform/authenticator does not support the PRF extension.
    PrfUnsupported,
    /// The credential carried a `prf.results` object but both `first` and
    /// `second` were absent. This is a hard failure, not a platform
    /// limitation, because a well-behaved authenticator that supports PRF
    /// always returns at least `first`.
    PrfMissing,
}

impl fmt::Display for PrfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrfError::PrfUnsupported => {
                write!(f, "authenticator did not expose the PRF extension")
            }
            PrfError::PrfMissing => write!(
                f,
                "PRF extension results were present but empty (first and second both missing)"
            ),
        }
    }
}

impl std::error::Error for PrfError {}
