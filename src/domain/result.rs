//! Result type alias for the semantic layer

use super::errors::SemanticError;

/// Result type alias for semantic layer operations
///
/// # Examples
///
/// ```
/// use hrms_semantic::domain::result::Result;
/// use hrms_semantic::domain::errors::SemanticError;
///
/// fn failing_function() -> Result<()> {
///     Err(SemanticError::Validation("Invalid input".to_string()))
/// }
/// assert!(failing_function().is_err());
/// ```
pub type Result<T> = std::result::Result<T, SemanticError>;
