use thiserror::Error;

/// Fatal audit failures. Line-level defects never surface here: the
/// validator recovers them in place and records a warning instead.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    #[error("candidate document root is not an object")]
    InputShape,
}
