//! Error types for xmlcompose
//!
//! This module defines all error types used throughout the library.
//!
//! The taxonomy separates the fatal registry-construction failures
//! ([`Error::Discovery`], [`Error::Composition`]) from propagated input
//! failures ([`Error::Parse`]). Ordinary schema non-conformance is *not* an
//! error: [`crate::SchemaRegistry::validate`] reports it as `Ok(false)` plus
//! a diagnostic stream.

use std::fmt;
use thiserror::Error;

/// Result type alias using xmlcompose Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for xmlcompose operations
#[derive(Error, Debug)]
pub enum Error {
    /// Schema fragment discovery failed (fatal at registry construction)
    #[error("discovery error: {0}")]
    Discovery(String),

    /// Composing the fragments into one schema failed (fatal at registry
    /// construction): a malformed fragment or a compilation diagnostic
    #[error("composition error: {0}")]
    Composition(String),

    /// Input text is not well-formed XML. Distinct from schema
    /// non-conformance: the caller can tell "could not even parse" apart
    /// from "parsed but invalid".
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// The underlying validator failed internally (not a verdict on the
    /// document)
    #[error("validator error: {0}")]
    Validator(String),

    /// Namespace error (undeclared prefix, invalid declaration)
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Invalid schema location entry in a location table
    #[error("location error: {0}")]
    Location(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Well-formedness error with positional context
#[derive(Debug, Clone)]
pub struct ParseError {
    /// Error message
    pub message: String,
    /// Byte offset into the input where parsing stopped, if known
    pub position: Option<u64>,
}

impl ParseError {
    /// Create a new parse error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            position: None,
        }
    }

    /// Set the byte offset where parsing stopped
    pub fn with_position(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(position) = self.position {
            write!(f, " (at byte {})", position)?;
        }
        Ok(())
    }
}

impl std::error::Error for ParseError {}
