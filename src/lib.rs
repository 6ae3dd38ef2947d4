//! # csv_stream
//!
//! A streaming parser and writer for delimiter-separated values (CSV, TSV and
//! friends).
//!
//! ## What it does
//!
//! Input is read in bounded chunks through a lookahead scanner, so files of
//! any size can be parsed without loading them whole. Records come out of an
//! [`Iterator`] as soon as they are complete, and the result never depends on
//! where chunk boundaries fall: a quoted field, a multi-character separator or
//! a UTF-8 sequence split across two reads parses the same as in memory.
//!
//! ## Key Features
//!
//! - **Streaming**: any [`std::io::Read`] or in-memory text, chained sources
//! - **Row separator detection**: `\r\n`, `\r` or `\n` sniffed from the input
//! - **Strict or liberal quoting**: RFC 4180 quoting with doubled quotes, or
//!   lenient handling of stray quotes
//! - **Limits**: field size limits enforced while a field is still being read
//! - **Line skipping**: by substring, regular expression or custom matcher
//! - **Headers**: from the first row, a list, or a delimited string
//! - **Writing**: minimal quoting, streaming [`Writer`]
//! - **Serde**: [`Record`] implements `Serialize`
//!
//! ## Quick Start
//!
//! ```rust
//! use csv_stream::{parse_str, ParseOptions};
//!
//! let records = parse_str("name,age\nAlice,30\n\"Bob, Jr.\",7\n", ParseOptions::new()).unwrap();
//!
//! assert_eq!(records.len(), 3);
//! assert_eq!(records[2].get(0), Some("Bob, Jr."));
//! ```
//!
//! ### Headers
//!
//! ```rust
//! use csv_stream::{parse_str, Headers, ParseOptions};
//!
//! let options = ParseOptions::new().with_headers(Headers::FirstRow);
//! let records = parse_str("name,age\nAlice,30\n", options).unwrap();
//!
//! assert_eq!(records[0].get_by_header("age"), Some("30"));
//! assert_eq!(serde_json::to_string(&records[0]).unwrap(), r#"{"name":"Alice","age":"30"}"#);
//! ```
//!
//! ### Streaming from a reader
//!
//! ```rust
//! use csv_stream::{from_reader, ParseOptions};
//! use std::io::Cursor;
//!
//! let input = Cursor::new(b"a;b\r\n1;2\r\n".to_vec());
//! let parser = from_reader(input, ParseOptions::new().with_column_separator(";")).unwrap();
//!
//! assert_eq!(parser.row_separator(), "\r\n");
//! for record in parser {
//!     let record = record.unwrap();
//!     assert_eq!(record.len(), 2);
//! }
//! ```
//!
//! ### Writing
//!
//! ```rust
//! use csv_stream::{generate_line, WriteOptions};
//!
//! let line = generate_line([Some("a,b"), None, Some("")], &WriteOptions::new()).unwrap();
//! assert_eq!(line, "\"a,b\",,\"\"\n");
//! ```
//!
//! ## Errors
//!
//! Parsing stops at the first problem. Every [`Error`] tied to the input
//! carries the line it was found on; see the [`error`] module.
//!
//! ## Logging
//!
//! The crate emits [`tracing`](https://docs.rs/tracing) events at `debug` and
//! `trace` level (separator detection, header resolution, chunk loads, skipped
//! lines). It never installs a subscriber.
//!
//! ## Demos
//!
//! See the `demos/` directory:
//!
//! - **`stream_parse.rs`** - Parsing a reader in small chunks
//! - **`custom_options.rs`** - Separators, quoting, skipping and writing
//!
//! Run one with: `cargo run --example <name>`

pub mod error;
pub mod options;
pub mod parser;
mod pattern;
pub mod record;
mod scanner;
pub mod sniffer;
pub mod source;
pub mod writer;

pub use error::{Error, Result};
pub use options::{
    Config, Encoding, Headers, LineBreakPolicy, LineMatcher, ParseOptions, RowSeparator,
    SkipLines, WriteOptions, DEFAULT_CHUNK_SIZE, DEFAULT_ROW_SEPARATOR,
};
pub use parser::Parser;
pub use record::{HeaderList, Record};
pub use sniffer::detect_row_separator;
pub use source::Source;
pub use writer::{generate_line, FieldValue, Writer};

use std::io;

/// Parses all records of `input`.
///
/// # Examples
///
/// ```rust
/// use csv_stream::{parse_str, ParseOptions};
///
/// let records = parse_str("a,,\"\"\n", ParseOptions::new()).unwrap();
/// assert_eq!(
///     records[0].fields(),
///     &[Some("a".to_string()), None, Some(String::new())]
/// );
/// ```
///
/// # Errors
///
/// Returns the first configuration or malformed-input error.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_str(input: &str, options: ParseOptions) -> Result<Vec<Record>> {
    Parser::new(input, options)?.collect()
}

/// Parses the first record of `input`; `None` for empty input.
///
/// # Examples
///
/// ```rust
/// use csv_stream::{parse_line, ParseOptions};
///
/// let record = parse_line("foo,\"bar\nbaz\"\nignored\n", ParseOptions::new()).unwrap().unwrap();
/// assert_eq!(record.get(1), Some("bar\nbaz"));
///
/// assert!(parse_line("", ParseOptions::new()).unwrap().is_none());
/// ```
///
/// # Errors
///
/// Returns a configuration error, or a malformed-input error in the first
/// record.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn parse_line(input: &str, options: ParseOptions) -> Result<Option<Record>> {
    Parser::new(input, options)?.next().transpose()
}

/// Starts a streaming parse over `reader`.
///
/// # Errors
///
/// Returns a configuration error, or an I/O error while sniffing the row
/// separator.
#[must_use = "this returns the result of the operation, errors must be handled"]
pub fn from_reader<'a, R>(reader: R, options: ParseOptions) -> Result<Parser<'a>>
where
    R: io::Read + 'a,
{
    Parser::new(Source::reader(reader), options)
}
