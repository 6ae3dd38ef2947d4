//! Streaming record parser.
//!
//! [`Parser`] drives the scanner through the quote/escape state machine and
//! yields one [`Record`] per row through [`Iterator`]. Rows are produced
//! lazily: a reader source is only read as far as the next record requires.
//!
//! Every failure is terminal. After the first error the iterator is fused and
//! yields nothing more.
//!
//! ```rust
//! use csv_stream::{ParseOptions, Parser};
//!
//! let input = "a,b\n\"x, y\",\"say \"\"hi\"\"\"\n";
//! let mut parser = Parser::new(input, ParseOptions::new()).unwrap();
//!
//! let first = parser.next().unwrap().unwrap();
//! assert_eq!(first.fields(), &[Some("a".to_string()), Some("b".to_string())]);
//!
//! let second = parser.next().unwrap().unwrap();
//! assert_eq!(second.get(0), Some("x, y"));
//! assert_eq!(second.get(1), Some("say \"hi\""));
//! assert_eq!(parser.lineno(), 2);
//!
//! assert!(parser.next().is_none());
//! ```

use crate::error::{Error, Result};
use crate::options::{Config, Headers, LineBreakPolicy, ParseOptions, RowSeparator};
use crate::pattern::{Literal, LineUntil, Run};
use crate::record::{HeaderList, Record};
use crate::scanner::Scanner;
use crate::sniffer::sniff_row_separator;
use crate::source::Source;
use std::collections::VecDeque;
use tracing::{debug, trace};

const LINE_BREAKS: [&str; 2] = ["\r", "\n"];

/// How a field was written, which decides the error reported when garbage
/// follows it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FieldKind {
    Unquoted,
    Quoted,
}

/// The patterns of one session, derived from the configuration and the
/// resolved row separator.
#[derive(Debug)]
struct Tokens {
    column_end: Literal,
    row_end: Literal,
    quote: Option<Literal>,
    /// Unquoted field content.
    unquoted: Run,
    /// Content between quotes.
    quoted: Run,
    /// Text trailing a closing quote, kept in liberal mode.
    liberal_tail: Run,
    line: LineUntil,
}

impl Tokens {
    fn new(config: &Config, row_separator: &str) -> Self {
        let column_separator = config.column_separator();
        let mut stops = vec![column_separator.to_string(), row_separator.to_string()];
        stops.extend(
            LINE_BREAKS
                .iter()
                .filter(|brk| !line_break_allowed(config.line_breaks(), row_separator, brk))
                .map(|brk| brk.to_string()),
        );

        let liberal_tail = Run::excluding(stops.clone());
        let mut unquoted_stops = stops;
        let mut quoted_stops = Vec::new();
        if let Some(quote) = config.quote_char() {
            if !config.liberal_parsing() {
                unquoted_stops.push(quote.to_string());
            }
            quoted_stops.push(quote.to_string());
        }

        Tokens {
            column_end: Literal::new(column_separator),
            row_end: Literal::new(row_separator),
            quote: config.quote_char().map(Literal::from_char),
            unquoted: Run::excluding(unquoted_stops),
            quoted: Run::excluding(quoted_stops),
            liberal_tail,
            line: LineUntil::new(row_separator),
        }
    }
}

/// Whether a raw CR or LF (`brk`) may appear inside an unquoted field.
fn line_break_allowed(policy: LineBreakPolicy, row_separator: &str, brk: &str) -> bool {
    match policy {
        LineBreakPolicy::AllowForeign => row_separator.chars().count() == 1 && row_separator != brk,
        LineBreakPolicy::Forbid => false,
    }
}

/// The part of a raw line the skip matcher sees: at most `limit` bytes, cut
/// back to a character boundary.
fn judged_prefix(text: &str, limit: Option<usize>) -> &str {
    let Some(limit) = limit else {
        return text;
    };
    if text.len() <= limit {
        return text;
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

fn check_size(length: usize, limit: Option<usize>, line: usize) -> Result<()> {
    match limit {
        Some(limit) if length >= limit => Err(Error::malformed("Field size exceeded", line)),
        _ => Ok(()),
    }
}

/// A parse session over one or more sources.
pub struct Parser<'a> {
    config: Config,
    scanner: Scanner<'a>,
    tokens: Tokens,
    row_separator: String,
    lineno: usize,
    line: String,
    headers: Option<HeaderList>,
    pending_header: Option<Record>,
    finished: bool,
}

impl<'a> Parser<'a> {
    /// Validates `options` and starts a session over `source`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for invalid options. Sniffing the row
    /// separator of a reader may also fail with [`Error::Io`].
    pub fn new<S: Into<Source<'a>>>(source: S, options: ParseOptions) -> Result<Self> {
        Self::with_config(source, options.build()?)
    }

    /// Starts a session from an already validated configuration.
    pub fn with_config<S: Into<Source<'a>>>(source: S, config: Config) -> Result<Self> {
        Self::from_sources(vec![source.into()], config)
    }

    /// Starts a session reading `sources` in order as one stream.
    ///
    /// ```rust
    /// use csv_stream::{ParseOptions, Parser, Source};
    ///
    /// let config = ParseOptions::new().build().unwrap();
    /// let sources = vec![Source::from("a,b\n1,"), Source::reader(&b"2\n"[..])];
    /// let records: Vec<_> = Parser::from_sources(sources, config)
    ///     .unwrap()
    ///     .collect::<Result<_, _>>()
    ///     .unwrap();
    /// assert_eq!(records[1].get(1), Some("2"));
    /// ```
    pub fn from_sources(sources: Vec<Source<'a>>, config: Config) -> Result<Self> {
        let mut sources: VecDeque<Source<'a>> = sources.into();
        let row_separator = match config.row_separator() {
            RowSeparator::Literal(separator) => separator.clone(),
            RowSeparator::Auto => sniff_row_separator(&mut sources)?,
        };
        if row_separator == config.column_separator() {
            return Err(Error::configuration(format!(
                "column and row separators must differ: {:?}",
                row_separator
            )));
        }
        if let Some(quote) = config.quote_char() {
            if row_separator.contains(quote) {
                return Err(Error::configuration(format!(
                    "quote character {:?} must not occur in the row separator",
                    quote
                )));
            }
        }

        let headers = resolve_headers(&config, &row_separator)?;
        let pending_header = match &headers {
            Some(headers) if config.return_headers() => {
                let raw = config.unconverted_fields().then(Vec::new);
                Some(Record::header_row(headers.clone(), headers.to_vec(), 0, raw))
            }
            _ => None,
        };

        debug!(
            column_separator = ?config.column_separator(),
            row_separator = ?row_separator,
            encoding = config.encoding().as_str(),
            "starting parse session"
        );

        let read_hint = row_separator.as_bytes().last().copied();
        let scanner = Scanner::new(sources, config.chunk_size(), read_hint);
        let tokens = Tokens::new(&config, &row_separator);

        Ok(Parser {
            config,
            scanner,
            tokens,
            row_separator,
            lineno: 0,
            line: String::new(),
            headers,
            pending_header,
            finished: false,
        })
    }

    /// Number of lines consumed so far: emitted records, dropped blank rows
    /// and skipped lines.
    #[must_use]
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// Raw text of the last record, row separator included.
    #[must_use]
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Header names, once known.
    #[must_use]
    pub fn headers(&self) -> Option<&[Option<String>]> {
        self.headers.as_deref()
    }

    /// The row separator in effect (after detection).
    #[must_use]
    pub fn row_separator(&self) -> &str {
        &self.row_separator
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn read_record(&mut self) -> Result<Option<Record>> {
        loop {
            let Some(fields) = self.read_row()? else {
                return Ok(None);
            };
            if fields.is_empty() && self.config.skip_blanks() {
                trace!(line = self.lineno, "dropped blank row");
                continue;
            }
            let raw = self.config.unconverted_fields().then(|| fields.clone());

            if self.config.uses_headers() && self.headers.is_none() {
                let headers: HeaderList = fields.clone().into();
                debug!(count = headers.len(), line = self.lineno, "resolved headers");
                self.headers = Some(headers.clone());
                if self.config.return_headers() {
                    return Ok(Some(Record::header_row(headers, fields, self.lineno, raw)));
                }
                continue;
            }

            return Ok(Some(Record::parsed(
                fields,
                self.headers.clone(),
                self.lineno,
                raw,
            )));
        }
    }

    /// Parses one row. `None` at the end of the stream; an empty vector for a
    /// blank row.
    fn read_row(&mut self) -> Result<Option<Vec<Option<String>>>> {
        self.skip_needless_lines()?;
        self.scanner.mark_start();

        let mut row = Vec::new();
        loop {
            let line = self.lineno + 1;
            let (value, kind) = self.parse_field()?;
            if let Some(value) = &value {
                check_size(value.len(), self.config.field_size_limit(), line)?;
            }

            let column_end = self.scanner.scan(&self.tokens.column_end);
            if column_end.map_err(|e| e.at_line(line))?.is_some() {
                row.push(value);
                continue;
            }
            let row_end = self.scanner.scan(&self.tokens.row_end);
            if row_end.map_err(|e| e.at_line(line))?.is_some() {
                if !(row.is_empty() && value.is_none()) {
                    row.push(value);
                }
                self.finish_row();
                return Ok(Some(row));
            }
            if self.scanner.eos().map_err(|e| e.at_line(line))? {
                if row.is_empty() && value.is_none() {
                    self.scanner.mark_drop();
                    return Ok(None);
                }
                row.push(value);
                self.finish_row();
                return Ok(Some(row));
            }
            return Err(self.unexpected(kind, line));
        }
    }

    fn finish_row(&mut self) {
        self.line = self.scanner.mark_end();
        self.lineno += 1;
    }

    /// Drops lines accepted by the skip-line matcher. The peek never reads
    /// past the field size limit: longer lines are judged on their first
    /// `limit` bytes, and a skipped one is discarded without being buffered.
    fn skip_needless_lines(&mut self) -> Result<()> {
        let Some(skipper) = self.config.skip_lines() else {
            return Ok(());
        };
        let limit = self.config.field_size_limit();
        loop {
            let line = self.lineno + 1;
            self.scanner.mark_start();
            let text = self
                .scanner
                .scan_greedy_bounded(&self.tokens.line, limit.unwrap_or(usize::MAX))
                .map_err(|e| e.at_line(line))?;
            let Some(text) = text else {
                self.scanner.rewind();
                return Ok(());
            };
            let whole = text.ends_with(self.row_separator.as_str())
                || self.scanner.eos().map_err(|e| e.at_line(line))?;
            if !skipper.should_skip(judged_prefix(&text, limit)) {
                self.scanner.rewind();
                return Ok(());
            }
            self.scanner.mark_drop();
            if !whole {
                self.scanner
                    .skip_greedy(&self.tokens.line)
                    .map_err(|e| e.at_line(line))?;
            }
            self.lineno += 1;
            trace!(line = self.lineno, "skipped line");
        }
    }

    fn parse_field(&mut self) -> Result<(Option<String>, FieldKind)> {
        let line = self.lineno + 1;
        let limit = self.config.field_size_limit();

        if self.config.liberal_parsing() {
            if let Some(content) = self.parse_quoted(line, limit)? {
                let base = content.len() + 2;
                let tail = self
                    .scanner
                    .scan_greedy_with(&self.tokens.liberal_tail, |tail| {
                        check_size(base + tail.len(), limit, line)
                    })
                    .map_err(|e| e.at_line(line))?;
                return Ok(match (tail, &self.tokens.quote) {
                    (Some(tail), Some(quote)) => {
                        let quote = quote.as_str();
                        (
                            Some(format!("{}{}{}{}", quote, content, quote, tail)),
                            FieldKind::Unquoted,
                        )
                    }
                    _ => (Some(content), FieldKind::Quoted),
                });
            }
            let value = self.scan_unquoted(line, limit)?;
            return Ok((value, FieldKind::Unquoted));
        }

        if let Some(value) = self.scan_unquoted(line, limit)? {
            return Ok((Some(value), FieldKind::Unquoted));
        }
        match self.parse_quoted(line, limit)? {
            Some(content) => Ok((Some(content), FieldKind::Quoted)),
            None => Ok((None, FieldKind::Unquoted)),
        }
    }

    fn scan_unquoted(&mut self, line: usize, limit: Option<usize>) -> Result<Option<String>> {
        self.scanner
            .scan_greedy_with(&self.tokens.unquoted, |value| {
                check_size(value.len(), limit, line)
            })
            .map_err(|e| e.at_line(line))
    }

    /// Parses a quoted field if one starts at the cursor and returns its
    /// unescaped content.
    fn parse_quoted(&mut self, line: usize, limit: Option<usize>) -> Result<Option<String>> {
        let Some(quote) = &self.tokens.quote else {
            return Ok(None);
        };
        if self.scanner.scan(quote).map_err(|e| e.at_line(line))?.is_none() {
            return Ok(None);
        }

        let mut content = String::new();
        loop {
            let base = content.len();
            let run = self
                .scanner
                .scan_greedy_with(&self.tokens.quoted, |run| {
                    check_size(base + run.len(), limit, line)
                })
                .map_err(|e| e.at_line(line))?;
            if let Some(run) = run {
                content.push_str(&run);
            }
            if self.scanner.scan(quote).map_err(|e| e.at_line(line))?.is_none() {
                return Err(Error::malformed("Unclosed quoted field", line));
            }
            // A doubled quote is a literal quote.
            if self.scanner.scan(quote).map_err(|e| e.at_line(line))?.is_none() {
                return Ok(Some(content));
            }
            content.push_str(quote.as_str());
            check_size(content.len(), limit, line)?;
        }
    }

    fn unexpected(&self, kind: FieldKind, line: usize) -> Error {
        let rest = self.scanner.rest();
        if kind == FieldKind::Quoted {
            return Error::malformed("Any value after quoted field isn't allowed", line);
        }
        if let Some(brk) = LINE_BREAKS.iter().find(|brk| rest.starts_with(**brk)) {
            let message = format!("Unquoted fields do not allow new line <{:?}>", brk);
            return Error::malformed(&message, line);
        }
        if let Some(quote) = &self.tokens.quote {
            if rest.starts_with(quote.as_str()) {
                return Error::malformed("Illegal quoting", line);
            }
        }
        let next = rest.chars().next().unwrap_or_default();
        Error::malformed(&format!("Unexpected character {:?} after field", next), line)
    }
}

/// Resolves headers given up front; `None` when they come from the first row
/// or are not used.
fn resolve_headers(config: &Config, row_separator: &str) -> Result<Option<HeaderList>> {
    match config.headers() {
        Headers::None | Headers::FirstRow => Ok(None),
        Headers::List(names) => {
            let headers: HeaderList = names.iter().cloned().map(Some).collect();
            debug!(count = headers.len(), "using preset headers");
            Ok(Some(headers))
        }
        Headers::Delimited(text) => {
            let options = ParseOptions {
                column_separator: config.column_separator().to_string(),
                row_separator: RowSeparator::Literal(row_separator.to_string()),
                quote_char: config.quote_char(),
                ..ParseOptions::default()
            };
            let fields = Parser::new(Source::from(text.clone()), options)?
                .next()
                .transpose()?
                .map(Record::into_fields)
                .unwrap_or_default();
            debug!(count = fields.len(), "parsed preset headers");
            Ok(Some(fields.into()))
        }
    }
}

impl Iterator for Parser<'_> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        if let Some(header) = self.pending_header.take() {
            return Some(Ok(header));
        }
        match self.read_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.finished = true;
                debug!(lines = self.lineno, "parse session finished");
                None
            }
            Err(e) => {
                self.finished = true;
                debug!(error = %e, "parse session aborted");
                Some(Err(e))
            }
        }
    }
}

impl std::iter::FusedIterator for Parser<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SkipLines;

    fn rows(input: &str, options: ParseOptions) -> Vec<Vec<Option<String>>> {
        Parser::new(input, options)
            .unwrap()
            .map(|record| record.unwrap().into_fields())
            .collect()
    }

    fn strings(row: &[&str]) -> Vec<Option<String>> {
        row.iter().map(|field| Some(field.to_string())).collect()
    }

    #[test]
    fn test_line_keeps_raw_text() {
        let mut parser = Parser::new("a,b\r\n\"c\nd\",e\r\n", ParseOptions::new()).unwrap();
        assert_eq!(parser.row_separator(), "\r\n");
        parser.next().unwrap().unwrap();
        assert_eq!(parser.line(), "a,b\r\n");
        let record = parser.next().unwrap().unwrap();
        assert_eq!(record.get(0), Some("c\nd"));
        assert_eq!(parser.line(), "\"c\nd\",e\r\n");
        assert_eq!(parser.lineno(), 2);
    }

    #[test]
    fn test_skipped_lines_count() {
        let options = ParseOptions::new().with_skip_lines(SkipLines::pattern("#"));
        let mut parser = Parser::new("#a\n1\n#b\n#c\n2\n", options).unwrap();
        assert_eq!(parser.next().unwrap().unwrap().line(), 2);
        assert_eq!(parser.next().unwrap().unwrap().line(), 5);
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_fused_after_error() {
        let mut parser = Parser::new("\"a\nb,c\n", ParseOptions::new()).unwrap();
        let err = parser.next().unwrap().unwrap_err();
        assert_eq!(err.to_string(), "Unclosed quoted field in line 1.");
        assert!(parser.next().is_none());
    }

    #[test]
    fn test_escaped_quote_counts_toward_limit() {
        let options = ParseOptions::new().with_field_size_limit(3);
        let err = Parser::new("\"ab\"\"\"", options)
            .unwrap()
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(err.message(), "Field size exceeded");
    }

    #[test]
    fn test_liberal_tail() {
        let options = ParseOptions::new().with_liberal_parsing(true);
        assert_eq!(
            rows("1,\"23\"4,5\n", options),
            vec![strings(&["1", "\"23\"4", "5"])]
        );
    }

    #[test]
    fn test_after_quote_error() {
        let err = Parser::new("1,\"23\"4,5\n", ParseOptions::new())
            .unwrap()
            .next()
            .unwrap()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Any value after quoted field isn't allowed in line 1."
        );
    }

    #[test]
    fn test_line_break_policy() {
        assert!(line_break_allowed(LineBreakPolicy::AllowForeign, "\n", "\r"));
        assert!(line_break_allowed(LineBreakPolicy::AllowForeign, "|", "\n"));
        assert!(!line_break_allowed(LineBreakPolicy::AllowForeign, "\r\n", "\r"));
        assert!(!line_break_allowed(LineBreakPolicy::AllowForeign, "\r", "\r"));
        assert!(!line_break_allowed(LineBreakPolicy::Forbid, "\n", "\r"));
    }

    #[test]
    fn test_forbid_policy_rejects_cr() {
        let options = ParseOptions::new().with_line_breaks(LineBreakPolicy::Forbid);
        let err = Parser::new("a\nb\rc\n", options)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unquoted fields do not allow new line <\"\\r\"> in line 2."
        );
    }

    #[test]
    fn test_auto_separator_clashing_with_column_separator() {
        let options = ParseOptions::new().with_column_separator("\n");
        let err = Parser::new("a\nb", options).err().unwrap();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_delimited_headers_use_session_separators() {
        let options = ParseOptions::new()
            .with_column_separator(";")
            .with_headers(Headers::Delimited("x;\"y;z\"".to_string()));
        let parser = Parser::new("1;2\n", options).unwrap();
        assert_eq!(
            parser.headers(),
            Some(&[Some("x".to_string()), Some("y;z".to_string())][..])
        );
    }
}
