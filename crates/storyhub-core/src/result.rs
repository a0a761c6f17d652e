//! Convenience result type alias for StoryHub.

use crate::error::AppError;

/// A specialized `Result` type for StoryHub infrastructure operations.
pub type AppResult<T> = Result<T, AppError>;
