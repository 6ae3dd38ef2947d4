//! Serializing records back to delimited text.
//!
//! [`generate_line`] turns one list of fields into a line; [`Writer`] streams
//! lines into any [`io::Write`]. A field is quoted only when it has to be:
//!
//! - it is empty and `quote_empty` is set (the default), so `""` and an
//!   absent field stay distinguishable
//! - it contains the column separator, the row separator, the quote
//!   character, CR or LF
//! - `force_quotes` is set
//!
//! Quote characters inside a quoted field are doubled.
//!
//! ```rust
//! use csv_stream::{generate_line, WriteOptions};
//!
//! let fields = [Some("plain"), Some("say \"hi\""), None, Some("")];
//! let line = generate_line(fields, &WriteOptions::new()).unwrap();
//! assert_eq!(line, "plain,\"say \"\"hi\"\"\",,\"\"\n");
//! ```

use crate::error::Result;
use crate::options::WriteOptions;
use crate::record::Record;
use std::borrow::Cow;
use std::io;
use tracing::debug;

/// Anything that can be written as one field. `None` is an absent field.
pub trait FieldValue {
    fn as_field(&self) -> Option<&str>;
}

impl FieldValue for str {
    fn as_field(&self) -> Option<&str> {
        Some(self)
    }
}

impl FieldValue for String {
    fn as_field(&self) -> Option<&str> {
        Some(self.as_str())
    }
}

impl FieldValue for Cow<'_, str> {
    fn as_field(&self) -> Option<&str> {
        Some(self.as_ref())
    }
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn as_field(&self) -> Option<&str> {
        self.as_ref().and_then(|value| value.as_field())
    }
}

impl<T: FieldValue + ?Sized> FieldValue for &T {
    fn as_field(&self) -> Option<&str> {
        (**self).as_field()
    }
}

/// Serializes `fields` as one line, row separator included.
///
/// # Errors
///
/// Returns [`Error::Configuration`](crate::Error::Configuration) when the
/// options are invalid.
pub fn generate_line<I>(fields: I, options: &WriteOptions) -> Result<String>
where
    I: IntoIterator,
    I::Item: FieldValue,
{
    options.validate()?;
    let mut line = String::new();
    encode_line(fields, options, &mut line);
    Ok(line)
}

fn encode_line<I>(fields: I, options: &WriteOptions, out: &mut String)
where
    I: IntoIterator,
    I::Item: FieldValue,
{
    for (index, field) in fields.into_iter().enumerate() {
        if index > 0 {
            out.push_str(&options.column_separator);
        }
        encode_field(field.as_field(), options, out);
    }
    out.push_str(&options.row_separator);
}

fn encode_field(field: Option<&str>, options: &WriteOptions, out: &mut String) {
    match field {
        None if options.force_quotes => {
            out.push(options.quote_char);
            out.push(options.quote_char);
        }
        None => {}
        Some(value) if options.force_quotes || needs_quotes(value, options) => {
            let quote = options.quote_char;
            out.push(quote);
            for ch in value.chars() {
                if ch == quote {
                    out.push(quote);
                }
                out.push(ch);
            }
            out.push(quote);
        }
        Some(value) => out.push_str(value),
    }
}

#[inline]
fn needs_quotes(value: &str, options: &WriteOptions) -> bool {
    if value.is_empty() {
        return options.quote_empty;
    }
    value.contains(options.column_separator.as_str())
        || value.contains(options.row_separator.as_str())
        || value.contains(options.quote_char)
        || value.contains('\r')
        || value.contains('\n')
}

/// Streams lines into an [`io::Write`].
///
/// ```rust
/// use csv_stream::{WriteOptions, Writer};
///
/// let options = WriteOptions::new()
///     .with_headers(vec!["id".to_string(), "name".to_string()])
///     .with_write_headers(true);
/// let mut writer = Writer::new(Vec::new(), options).unwrap();
/// writer.write_record(["1", "Alice"]).unwrap();
/// writer.write_record([Some("2"), None]).unwrap();
///
/// assert_eq!(writer.lineno(), 3);
/// let output = writer.into_inner().unwrap();
/// assert_eq!(output, b"id,name\n1,Alice\n2,\n");
/// ```
#[derive(Debug)]
pub struct Writer<W: io::Write> {
    inner: W,
    options: WriteOptions,
    lineno: usize,
    headers_pending: bool,
    buffer: String,
}

impl<W: io::Write> Writer<W> {
    /// # Errors
    ///
    /// Returns [`Error::Configuration`](crate::Error::Configuration) when the
    /// options are invalid.
    pub fn new(inner: W, options: WriteOptions) -> Result<Self> {
        options.validate()?;
        let headers_pending = options.write_headers && options.headers.is_some();
        Ok(Writer {
            inner,
            options,
            lineno: 0,
            headers_pending,
            buffer: String::new(),
        })
    }

    /// Writes one line of fields, preceded by the headers if they are still
    /// pending.
    pub fn write_record<I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: FieldValue,
    {
        self.write_pending_headers()?;
        self.write_line(fields)
    }

    /// Writes the fields of a parsed record.
    pub fn write(&mut self, record: &Record) -> Result<()> {
        self.write_record(record.fields())
    }

    /// Number of lines written, header line included.
    #[must_use]
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    #[must_use]
    pub fn options(&self) -> &WriteOptions {
        &self.options
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Writes pending headers and flushes the underlying writer.
    pub fn flush(&mut self) -> Result<()> {
        self.write_pending_headers()?;
        self.inner.flush()?;
        Ok(())
    }

    /// Flushes and returns the underlying writer.
    pub fn into_inner(mut self) -> Result<W> {
        self.flush()?;
        Ok(self.inner)
    }

    fn write_pending_headers(&mut self) -> Result<()> {
        if !self.headers_pending {
            return Ok(());
        }
        self.headers_pending = false;
        if let Some(headers) = self.options.headers.take() {
            debug!(count = headers.len(), "writing header line");
            self.write_line(&headers)?;
            self.options.headers = Some(headers);
        }
        Ok(())
    }

    fn write_line<I>(&mut self, fields: I) -> Result<()>
    where
        I: IntoIterator,
        I::Item: FieldValue,
    {
        self.buffer.clear();
        encode_line(fields, &self.options, &mut self.buffer);
        self.inner.write_all(self.buffer.as_bytes())?;
        self.lineno += 1;
        Ok(())
    }
}
