use thiserror::Error;

use strum::Display;

/// Result alias used by the matching, validation and evaluation phases.
pub type FunctionResult<T> = Result<T, FunctionError>;

/// Kind of named dependency an evaluation had to wait on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum DependencyKind {
    #[strum(serialize = "reference")]
    Reference,
    #[strum(serialize = "condition")]
    Condition,
}

/// Errors raised while validating or evaluating template functions.
///
/// `Validation` and `UnsupportedFunction` are terminal for the current
/// template: re-running evaluation cannot fix them. `NotReady` is the
/// retryable subset, raised when a declared dependency exists but its
/// value has not been provisioned yet; the caller re-evaluates once the
/// provisioner reports progress. `Internal` marks a defect in a
/// collaborator, not in the template text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FunctionError {
    #[error("Template error: {0}")]
    Validation(String),
    #[error("Template error: {kind} {name} not ready")]
    NotReady { kind: DependencyKind, name: String },
    #[error("Template Error: Encountered unsupported function: {0} Supported functions are: [Fn::Base64, Fn::GetAtt, Fn::GetAZs, Fn::Join, Fn::FindInMap, Fn::Select, Ref, Fn::Equals, Fn::If, Fn::Not, Condition, Fn::And, Fn::Or]")]
    UnsupportedFunction(String),
    #[error("Internal failure: {0}")]
    Internal(String),
}

impl FunctionError {
    pub fn validation<S: Into<String>>(message: S) -> Self {
        FunctionError::Validation(message.into())
    }

    pub fn not_ready<S: Into<String>>(kind: DependencyKind, name: S) -> Self {
        FunctionError::NotReady {
            kind,
            name: name.into(),
        }
    }

    pub fn internal<S: Into<String>>(message: S) -> Self {
        FunctionError::Internal(message.into())
    }

    /// Whether a later evaluation of the same template may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FunctionError::NotReady { .. })
    }

    /// Whether the template author, rather than this library or its
    /// collaborators, has to act on the error.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FunctionError::Validation(_) | FunctionError::UnsupportedFunction(_)
        )
    }
}
