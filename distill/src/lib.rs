//! Distill - structured extraction from LLM output
//!
//! This crate turns free-text completions from a language model into
//! typed, validated records. Define a [`Schema`](schema::Schema) for the
//! record you want, hand the [`Extractor`](extract::Extractor) a
//! conversation, and get back an instance that satisfies every declared
//! constraint, or a typed error once the validate-and-retry budget runs
//! out.
//!
//! ```rust,ignore
//! use distill::prelude::*;
//!
//! let schema = Schema::new("UserInfo")
//!     .field(Field::new("name", FieldType::String))
//!     .field(Field::new("age", FieldType::Integer).constraint(Constraint::Positive));
//!
//! let extractor = Extractor::from_backend(OpenAI::from_env()?);
//! let request = ExtractRequest::new(schema)
//!     .user("Hey, I'm John Doe. I'm 30 years old.")
//!     .max_attempts(3);
//!
//! let extraction = extractor.extract(&request).await?;
//! println!("{}", extraction.value["name"]);
//! ```

pub mod backend;
pub mod error;
pub mod extract;
pub mod message;
pub mod prelude;
pub mod schema;
pub mod validate;

pub use error::{BackendError, ExtractError, Result};
