//! Prelude module for convenient imports.
//!
//! # Usage
//!
//! ```rust,ignore
//! use distill::prelude::*;
//! ```

pub use crate::backend::{
    CompletionBackend, GenerateParams, MockBackend, OpenAI, OpenAIConfig, RawOutput, SharedBackend,
};
pub use crate::error::{BackendError, ExtractError, Result};
pub use crate::extract::{
    DEFAULT_MAX_ATTEMPTS, ExtractRequest, Extraction, Extractor, corrective_feedback,
};
pub use crate::message::{Message, Role};
pub use crate::schema::{Constraint, Field, FieldType, Schema, SchemaHint};
pub use crate::validate::{ValidationOutcome, Violation, validate};
