//! Configuration for parsing and writing.
//!
//! This module provides the builder types callers fill in and the frozen
//! configuration a parse session runs with:
//!
//! - [`ParseOptions`]: builder for the reading side
//! - [`WriteOptions`]: builder for the writing side
//! - [`Config`]: validated, immutable parse configuration, cheap to clone and
//!   safe to share between threads
//!
//! ## Examples
//!
//! ```rust
//! use csv_stream::{Headers, ParseOptions, RowSeparator, SkipLines};
//!
//! let options = ParseOptions::new()
//!     .with_column_separator(";")
//!     .with_row_separator(RowSeparator::literal("\r\n"))
//!     .with_headers(Headers::FirstRow)
//!     .with_skip_lines(SkipLines::pattern("#"))
//!     .with_field_size_limit(1024 * 1024);
//!
//! let config = options.build().unwrap();
//! assert_eq!(config.column_separator(), ";");
//! ```

use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::sync::Arc;

/// Row separator used when auto-detection finds no line break.
pub const DEFAULT_ROW_SEPARATOR: &str = "\n";

/// Default number of bytes requested from a reader per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// How rows are separated in the input.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum RowSeparator {
    /// Sniff the separator (`\r\n`, `\r` or `\n`) from the start of the input.
    #[default]
    Auto,
    /// A fixed, possibly multi-character separator.
    Literal(String),
}

impl RowSeparator {
    /// Shorthand for [`RowSeparator::Literal`].
    ///
    /// ```rust
    /// use csv_stream::RowSeparator;
    ///
    /// assert_eq!(RowSeparator::literal("\r\n"), RowSeparator::Literal("\r\n".to_string()));
    /// ```
    #[must_use]
    pub fn literal(separator: &str) -> Self {
        RowSeparator::Literal(separator.to_string())
    }
}

/// Where the header names of a parse come from.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum Headers {
    /// No headers; records are plain field lists.
    #[default]
    None,
    /// The first record of the input is the header row.
    FirstRow,
    /// Explicit header names.
    List(Vec<String>),
    /// Header names given as one delimited line, parsed with the session's
    /// separators and quote character.
    Delimited(String),
}

impl Headers {
    fn is_used(&self) -> bool {
        !matches!(self, Headers::None)
    }
}

/// A predicate over one raw input line, used to skip comment lines and the
/// like.
///
/// Implemented for [`Regex`] and for any `Fn(&str) -> bool` closure.
pub trait LineMatcher: Send + Sync {
    /// Returns `true` if `line` (including its row separator, if any) should
    /// be skipped.
    fn matches(&self, line: &str) -> bool;
}

impl LineMatcher for Regex {
    fn matches(&self, line: &str) -> bool {
        self.is_match(line)
    }
}

impl<F> LineMatcher for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn matches(&self, line: &str) -> bool {
        self(line)
    }
}

/// Which lines to skip before parsing each record.
///
/// With a field size limit set, lines of at least that many bytes are judged
/// on their first `field_size_limit` bytes only.
#[derive(Clone)]
pub enum SkipLines {
    /// Skip lines containing this text anywhere.
    Substring(String),
    /// Skip lines where this regular expression matches at the line start.
    /// Compiled when the configuration is built.
    Pattern(String),
    /// Skip lines accepted by a custom matcher.
    Matcher(Arc<dyn LineMatcher>),
}

impl SkipLines {
    #[must_use]
    pub fn substring(text: &str) -> Self {
        SkipLines::Substring(text.to_string())
    }

    #[must_use]
    pub fn pattern(pattern: &str) -> Self {
        SkipLines::Pattern(pattern.to_string())
    }

    /// Wraps any [`LineMatcher`], closures included.
    ///
    /// ```rust
    /// use csv_stream::SkipLines;
    ///
    /// let skip = SkipLines::matcher(|line: &str| line.trim().is_empty());
    /// ```
    #[must_use]
    pub fn matcher<M: LineMatcher + 'static>(matcher: M) -> Self {
        SkipLines::Matcher(Arc::new(matcher))
    }

    fn compile(&self) -> Result<LineSkipper> {
        Ok(match self {
            SkipLines::Substring(text) => LineSkipper::Substring(text.clone()),
            SkipLines::Pattern(pattern) => {
                let anchored = format!(r"\A(?:{})", pattern);
                let regex = Regex::new(&anchored).map_err(|e| {
                    Error::configuration(format!("skip_lines pattern {:?}: {}", pattern, e))
                })?;
                LineSkipper::Regex(regex)
            }
            SkipLines::Matcher(matcher) => LineSkipper::Matcher(Arc::clone(matcher)),
        })
    }
}

impl fmt::Debug for SkipLines {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipLines::Substring(text) => f.debug_tuple("Substring").field(text).finish(),
            SkipLines::Pattern(pattern) => f.debug_tuple("Pattern").field(pattern).finish(),
            SkipLines::Matcher(_) => f.write_str("Matcher(..)"),
        }
    }
}

/// The compiled form of [`SkipLines`].
#[derive(Clone)]
pub(crate) enum LineSkipper {
    Substring(String),
    Regex(Regex),
    Matcher(Arc<dyn LineMatcher>),
}

impl LineSkipper {
    pub(crate) fn should_skip(&self, line: &str) -> bool {
        match self {
            LineSkipper::Substring(text) => line.contains(text.as_str()),
            LineSkipper::Regex(regex) => regex.is_match(line),
            LineSkipper::Matcher(matcher) => matcher.matches(line),
        }
    }
}

impl fmt::Debug for LineSkipper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LineSkipper::Substring(text) => f.debug_tuple("Substring").field(text).finish(),
            LineSkipper::Regex(regex) => f.debug_tuple("Regex").field(&regex.as_str()).finish(),
            LineSkipper::Matcher(_) => f.write_str("Matcher(..)"),
        }
    }
}

/// Whether raw CR and LF may appear inside unquoted fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LineBreakPolicy {
    /// A raw CR or LF is allowed in an unquoted field when the row separator
    /// is a single character other than it (e.g. `\r` inside a field of an
    /// `\n`-separated file).
    #[default]
    AllowForeign,
    /// Raw CR and LF are never allowed in unquoted fields.
    Forbid,
}

/// Text encoding of the input. Only UTF-8 is supported; anything else fails
/// validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
}

impl Encoding {
    /// Resolves an encoding label such as `"UTF-8"`.
    ///
    /// ```rust
    /// use csv_stream::Encoding;
    ///
    /// assert_eq!(Encoding::from_label("utf8").unwrap(), Encoding::Utf8);
    /// assert!(Encoding::from_label("Shift_JIS").is_err());
    /// ```
    pub fn from_label(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "utf-8" | "utf8" => Ok(Encoding::Utf8),
            _ => Err(Error::configuration(format!(
                "unsupported encoding: {}",
                label
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
        }
    }
}

/// Options for parsing delimited text.
///
/// # Examples
///
/// ```rust
/// use csv_stream::{ParseOptions, RowSeparator};
///
/// // Comma separated, row separator sniffed from the input
/// let options = ParseOptions::new();
/// assert_eq!(options.row_separator, RowSeparator::Auto);
///
/// // Tab separated
/// let options = ParseOptions::tsv();
/// assert_eq!(options.column_separator, "\t");
///
/// // Quoting disabled, lenient about stray quotes
/// let options = ParseOptions::new()
///     .without_quoting()
///     .with_liberal_parsing(true);
/// ```
#[derive(Clone, Debug)]
pub struct ParseOptions {
    pub column_separator: String,
    pub row_separator: RowSeparator,
    pub quote_char: Option<char>,
    pub field_size_limit: Option<usize>,
    pub skip_lines: Option<SkipLines>,
    pub headers: Headers,
    pub return_headers: bool,
    pub skip_blanks: bool,
    pub liberal_parsing: bool,
    pub unconverted_fields: bool,
    pub encoding: Encoding,
    pub line_breaks: LineBreakPolicy,
    pub chunk_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            column_separator: ",".to_string(),
            row_separator: RowSeparator::Auto,
            quote_char: Some('"'),
            field_size_limit: None,
            skip_lines: None,
            headers: Headers::None,
            return_headers: false,
            skip_blanks: false,
            liberal_parsing: false,
            unconverted_fields: false,
            encoding: Encoding::Utf8,
            line_breaks: LineBreakPolicy::AllowForeign,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ParseOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tab separated values.
    #[must_use]
    pub fn tsv() -> Self {
        ParseOptions {
            column_separator: "\t".to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_column_separator(mut self, separator: &str) -> Self {
        self.column_separator = separator.to_string();
        self
    }

    #[must_use]
    pub fn with_row_separator(mut self, separator: RowSeparator) -> Self {
        self.row_separator = separator;
        self
    }

    #[must_use]
    pub fn with_quote_char(mut self, quote: char) -> Self {
        self.quote_char = Some(quote);
        self
    }

    /// Treats every character literally; no field is ever quoted.
    #[must_use]
    pub fn without_quoting(mut self) -> Self {
        self.quote_char = None;
        self
    }

    /// Fields whose byte length reaches `limit` are rejected.
    #[must_use]
    pub fn with_field_size_limit(mut self, limit: usize) -> Self {
        self.field_size_limit = Some(limit);
        self
    }

    /// Fields longer than `max` bytes are rejected.
    ///
    /// ```rust
    /// use csv_stream::ParseOptions;
    ///
    /// let options = ParseOptions::new().with_max_field_size(5);
    /// assert_eq!(options.field_size_limit, Some(6));
    /// ```
    #[must_use]
    pub fn with_max_field_size(mut self, max: usize) -> Self {
        self.field_size_limit = Some(max.saturating_add(1));
        self
    }

    #[must_use]
    pub fn with_skip_lines(mut self, skip_lines: SkipLines) -> Self {
        self.skip_lines = Some(skip_lines);
        self
    }

    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_return_headers(mut self, return_headers: bool) -> Self {
        self.return_headers = return_headers;
        self
    }

    #[must_use]
    pub fn with_skip_blanks(mut self, skip_blanks: bool) -> Self {
        self.skip_blanks = skip_blanks;
        self
    }

    #[must_use]
    pub fn with_liberal_parsing(mut self, liberal: bool) -> Self {
        self.liberal_parsing = liberal;
        self
    }

    #[must_use]
    pub fn with_unconverted_fields(mut self, unconverted: bool) -> Self {
        self.unconverted_fields = unconverted;
        self
    }

    #[must_use]
    pub fn with_encoding(mut self, encoding: Encoding) -> Self {
        self.encoding = encoding;
        self
    }

    #[must_use]
    pub fn with_line_breaks(mut self, policy: LineBreakPolicy) -> Self {
        self.line_breaks = policy;
        self
    }

    /// Number of bytes requested per read from a reader source.
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Validates the options and freezes them into a [`Config`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for empty or clashing separators, a
    /// quote character that occurs in a separator, a zero field size limit or
    /// chunk size, and skip-line patterns that fail to compile.
    pub fn build(self) -> Result<Config> {
        if self.column_separator.is_empty() {
            return Err(Error::configuration("column separator must not be empty"));
        }
        if let RowSeparator::Literal(row_separator) = &self.row_separator {
            if row_separator.is_empty() {
                return Err(Error::configuration("row separator must not be empty"));
            }
            if *row_separator == self.column_separator {
                return Err(Error::configuration(format!(
                    "column and row separators must differ: {:?}",
                    row_separator
                )));
            }
        }
        if let Some(quote) = self.quote_char {
            if self.column_separator.contains(quote) {
                return Err(Error::configuration(format!(
                    "quote character {:?} must not occur in the column separator",
                    quote
                )));
            }
            if let RowSeparator::Literal(row_separator) = &self.row_separator {
                if row_separator.contains(quote) {
                    return Err(Error::configuration(format!(
                        "quote character {:?} must not occur in the row separator",
                        quote
                    )));
                }
            }
        }
        if self.field_size_limit == Some(0) {
            return Err(Error::configuration("field size limit must be positive"));
        }
        if self.chunk_size == 0 {
            return Err(Error::configuration("chunk size must be positive"));
        }
        let skip_lines = self.skip_lines.as_ref().map(SkipLines::compile).transpose()?;

        Ok(Config {
            inner: Arc::new(ConfigInner {
                column_separator: self.column_separator,
                row_separator: self.row_separator,
                quote_char: self.quote_char,
                field_size_limit: self.field_size_limit,
                skip_lines,
                headers: self.headers,
                return_headers: self.return_headers,
                skip_blanks: self.skip_blanks,
                liberal_parsing: self.liberal_parsing,
                unconverted_fields: self.unconverted_fields,
                encoding: self.encoding,
                line_breaks: self.line_breaks,
                chunk_size: self.chunk_size,
            }),
        })
    }
}

#[derive(Debug)]
struct ConfigInner {
    column_separator: String,
    row_separator: RowSeparator,
    quote_char: Option<char>,
    field_size_limit: Option<usize>,
    skip_lines: Option<LineSkipper>,
    headers: Headers,
    return_headers: bool,
    skip_blanks: bool,
    liberal_parsing: bool,
    unconverted_fields: bool,
    encoding: Encoding,
    line_breaks: LineBreakPolicy,
    chunk_size: usize,
}

/// Validated, immutable parse configuration.
///
/// Built with [`ParseOptions::build`]. Cloning is cheap and a `Config` can
/// start any number of independent parse sessions, including on different
/// threads.
#[derive(Clone, Debug)]
pub struct Config {
    inner: Arc<ConfigInner>,
}

impl Config {
    pub fn column_separator(&self) -> &str {
        &self.inner.column_separator
    }

    /// The configured row separator; may still be [`RowSeparator::Auto`].
    pub fn row_separator(&self) -> &RowSeparator {
        &self.inner.row_separator
    }

    pub fn quote_char(&self) -> Option<char> {
        self.inner.quote_char
    }

    pub fn field_size_limit(&self) -> Option<usize> {
        self.inner.field_size_limit
    }

    pub fn headers(&self) -> &Headers {
        &self.inner.headers
    }

    pub fn uses_headers(&self) -> bool {
        self.inner.headers.is_used()
    }

    pub fn return_headers(&self) -> bool {
        self.inner.return_headers
    }

    pub fn skip_blanks(&self) -> bool {
        self.inner.skip_blanks
    }

    pub fn liberal_parsing(&self) -> bool {
        self.inner.liberal_parsing
    }

    pub fn unconverted_fields(&self) -> bool {
        self.inner.unconverted_fields
    }

    pub fn encoding(&self) -> Encoding {
        self.inner.encoding
    }

    pub fn line_breaks(&self) -> LineBreakPolicy {
        self.inner.line_breaks
    }

    pub fn chunk_size(&self) -> usize {
        self.inner.chunk_size
    }

    pub(crate) fn skip_lines(&self) -> Option<&LineSkipper> {
        self.inner.skip_lines.as_ref()
    }
}

/// Options for writing delimited text.
///
/// # Examples
///
/// ```rust
/// use csv_stream::{generate_line, WriteOptions};
///
/// let options = WriteOptions::new().with_row_separator("\r\n");
/// let line = generate_line(["a", "b,c"], &options).unwrap();
/// assert_eq!(line, "a,\"b,c\"\r\n");
/// ```
#[derive(Clone, Debug)]
pub struct WriteOptions {
    pub column_separator: String,
    pub row_separator: String,
    pub quote_char: char,
    pub force_quotes: bool,
    pub quote_empty: bool,
    pub headers: Option<Vec<String>>,
    pub write_headers: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        WriteOptions {
            column_separator: ",".to_string(),
            row_separator: DEFAULT_ROW_SEPARATOR.to_string(),
            quote_char: '"',
            force_quotes: false,
            quote_empty: true,
            headers: None,
            write_headers: false,
        }
    }
}

impl WriteOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tab separated values.
    #[must_use]
    pub fn tsv() -> Self {
        WriteOptions {
            column_separator: "\t".to_string(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_column_separator(mut self, separator: &str) -> Self {
        self.column_separator = separator.to_string();
        self
    }

    #[must_use]
    pub fn with_row_separator(mut self, separator: &str) -> Self {
        self.row_separator = separator.to_string();
        self
    }

    #[must_use]
    pub fn with_quote_char(mut self, quote: char) -> Self {
        self.quote_char = quote;
        self
    }

    /// Quote every field, absent ones included.
    #[must_use]
    pub fn with_force_quotes(mut self, force: bool) -> Self {
        self.force_quotes = force;
        self
    }

    /// Whether empty strings are written as `""` (the default) or as nothing.
    #[must_use]
    pub fn with_quote_empty(mut self, quote_empty: bool) -> Self {
        self.quote_empty = quote_empty;
        self
    }

    /// Header names for [`Writer`](crate::Writer); written before the first
    /// record when `write_headers` is also set.
    #[must_use]
    pub fn with_headers(mut self, headers: Vec<String>) -> Self {
        self.headers = Some(headers);
        self
    }

    #[must_use]
    pub fn with_write_headers(mut self, write_headers: bool) -> Self {
        self.write_headers = write_headers;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for empty or identical separators or
    /// a quote character that occurs in a separator.
    pub fn validate(&self) -> Result<()> {
        if self.column_separator.is_empty() {
            return Err(Error::configuration("column separator must not be empty"));
        }
        if self.row_separator.is_empty() {
            return Err(Error::configuration("row separator must not be empty"));
        }
        if self.column_separator == self.row_separator {
            return Err(Error::configuration(format!(
                "column and row separators must differ: {:?}",
                self.row_separator
            )));
        }
        if self.column_separator.contains(self.quote_char)
            || self.row_separator.contains(self.quote_char)
        {
            return Err(Error::configuration(format!(
                "quote character {:?} must not occur in a separator",
                self.quote_char
            )));
        }
        Ok(())
    }
}
