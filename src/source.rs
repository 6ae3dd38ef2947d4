//! Input sources for the scanner.
//!
//! A [`Source`] is either a buffer already in memory or a reader that is
//! consumed chunk by chunk. Several sources can be chained; the scanner reads
//! them in order as one logical stream.
//!
//! ```rust
//! use csv_stream::Source;
//! use std::io::Cursor;
//!
//! let in_memory = Source::from("a,b\n1,2\n");
//! let streamed = Source::reader(Cursor::new(b"a,b\n1,2\n".to_vec()));
//! ```

use std::borrow::Cow;
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};

/// One input of a parse session.
pub enum Source<'a> {
    /// Bytes already in memory, loaded as a single chunk.
    Bytes(Cow<'a, [u8]>),
    /// A stream read in bounded chunks.
    Reader(Box<dyn BufRead + 'a>),
}

impl<'a> Source<'a> {
    #[must_use]
    pub fn bytes<B: Into<Cow<'a, [u8]>>>(bytes: B) -> Self {
        Source::Bytes(bytes.into())
    }

    /// Wraps any reader in a [`BufReader`].
    #[must_use]
    pub fn reader<R: Read + 'a>(reader: R) -> Self {
        Source::Reader(Box::new(BufReader::new(reader)))
    }

    /// Uses an already buffered reader as is.
    #[must_use]
    pub fn buf_reader<R: BufRead + 'a>(reader: R) -> Self {
        Source::Reader(Box::new(reader))
    }

    /// Appends the next chunk to `out` and returns the number of bytes read;
    /// `0` means the source is exhausted.
    ///
    /// A reader delivers at most `limit` bytes from one buffer fill and stops
    /// right after `stop` when that byte shows up, so chunks tend to end on a
    /// row boundary. Bytes already buffered are handed out before the
    /// underlying reader is asked for more.
    pub(crate) fn read_chunk(
        &mut self,
        limit: usize,
        stop: Option<u8>,
        out: &mut Vec<u8>,
    ) -> io::Result<usize> {
        match self {
            Source::Bytes(bytes) => {
                let data = std::mem::take(bytes);
                out.extend_from_slice(&data);
                Ok(data.len())
            }
            Source::Reader(reader) => loop {
                let available = match reader.fill_buf() {
                    Ok(available) => available,
                    Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                    Err(e) => return Err(e),
                };
                let wanted = limit.min(available.len());
                let stop_at = stop.and_then(|s| available[..wanted].iter().position(|&b| b == s));
                let taken = match stop_at {
                    Some(index) => index + 1,
                    None => wanted,
                };
                out.extend_from_slice(&available[..taken]);
                reader.consume(taken);
                return Ok(taken);
            },
        }
    }
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Source::Bytes(Cow::Borrowed(text.as_bytes()))
    }
}

impl From<String> for Source<'static> {
    fn from(text: String) -> Self {
        Source::Bytes(Cow::Owned(text.into_bytes()))
    }
}

impl<'a> From<&'a [u8]> for Source<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Source::Bytes(Cow::Borrowed(bytes))
    }
}

impl From<Vec<u8>> for Source<'static> {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(Cow::Owned(bytes))
    }
}

impl fmt::Debug for Source<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Source::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}
