use crate::format::ValidationError;
use thiserror::Error;

/// Errors surfaced at the few API seams that return `Result`.
///
/// Most degraded situations (duplicate column ids, unknown sort targets,
/// bad row values) are logged no-ops per the error-handling design; only
/// operations with a caller that must react carry an error value.
#[derive(Debug, Error)]
pub enum GridError {
    #[error("no edit session in progress")]
    NoEditSession,
    #[error("validation failed: {}", format_errors(.0))]
    ValidationFailed(Vec<ValidationError>),
    #[error("malformed settings bundle: {0}")]
    Settings(#[from] serde_json::Error),
}

fn format_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
