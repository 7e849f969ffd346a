//! Logging helpers.

mod redact;

pub use redact::{SecretRedactor, redact};
