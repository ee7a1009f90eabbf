//! Error types produced while rendering dynamic values.

mod constructors;
mod types;

pub use types::{BoxError, FlattenViolation, SourceError};
