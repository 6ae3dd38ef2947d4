//! Error types for parsing and writing delimited text.
//!
//! Every error aborts the session that produced it. There is no resumable
//! skip: a malformed row stops the parse and the caller gets a single typed
//! error carrying a message and the 1-based line number.
//!
//! ## Error Categories
//!
//! - **Configuration errors**: invalid option combinations, raised before any
//!   input is consumed
//! - **Malformed input**: quoting and structural violations, field size limits
//! - **Invalid encoding**: a chunk of input is not valid UTF-8 (reported as
//!   malformed input at the current line)
//! - **I/O errors**: read or write failures from the underlying stream,
//!   propagated unchanged
//!
//! ## Examples
//!
//! ```rust
//! use csv_stream::{parse_line, Error, ParseOptions};
//!
//! let err = parse_line("1,2,\"3...", ParseOptions::new()).unwrap_err();
//! assert!(err.is_malformed());
//! assert_eq!(err.line(), Some(1));
//! assert_eq!(err.to_string(), "Unclosed quoted field in line 1.");
//! ```

use std::fmt;
use std::io;
use std::str::Utf8Error;
use thiserror::Error;

/// Represents all possible errors that can occur while parsing or writing.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid option or option combination
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Quoting or structural violation in the input
    #[error("{message} in line {line}.")]
    MalformedInput { message: String, line: usize },

    /// Input bytes that are not valid UTF-8
    #[error("Invalid byte sequence in UTF-8 in line {line}.")]
    InvalidEncoding {
        line: usize,
        #[source]
        source: Utf8Error,
    },

    /// Failure of the underlying reader or writer
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    /// Creates a configuration error.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use csv_stream::Error;
    ///
    /// let err = Error::configuration("column separator must not be empty");
    /// assert!(err.to_string().contains("must not be empty"));
    /// ```
    pub fn configuration<T: fmt::Display>(msg: T) -> Self {
        Error::Configuration(msg.to_string())
    }

    /// Creates a malformed-input error located at `line`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use csv_stream::Error;
    ///
    /// let err = Error::malformed("Illegal quoting", 4);
    /// assert_eq!(err.to_string(), "Illegal quoting in line 4.");
    /// ```
    pub fn malformed(msg: &str, line: usize) -> Self {
        Error::MalformedInput {
            message: msg.to_string(),
            line,
        }
    }

    /// Creates an encoding error located at `line`.
    pub fn invalid_encoding(source: Utf8Error, line: usize) -> Self {
        Error::InvalidEncoding { line, source }
    }

    /// Returns `true` for errors caused by the content of the input.
    #[must_use]
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Error::MalformedInput { .. } | Error::InvalidEncoding { .. }
        )
    }

    /// The line at which the error was detected, if it is tied to input.
    #[must_use]
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::MalformedInput { line, .. } | Error::InvalidEncoding { line, .. } => {
                Some(*line)
            }
            _ => None,
        }
    }

    /// The reason without the location suffix.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Error::MalformedInput { message, .. } => message.clone(),
            Error::InvalidEncoding { .. } => "Invalid byte sequence in UTF-8".to_string(),
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
