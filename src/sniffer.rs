//! Row separator detection.
//!
//! When the row separator is [`RowSeparator::Auto`](crate::RowSeparator::Auto)
//! the first line break of the input decides it: `\r\n`, `\r` or `\n`. Bytes
//! already in memory are inspected in place. Readers are sampled in small
//! reads, and the sampled bytes are put back in front of the reader as an
//! in-memory source, so the parse still sees every byte once and in order.

use crate::options::DEFAULT_ROW_SEPARATOR;
use crate::source::Source;
use std::borrow::Cow;
use std::collections::VecDeque;
use std::io::{self, Read};
use tracing::debug;

/// Bytes requested per sample read.
pub(crate) const SAMPLE_SIZE: usize = 1024;

/// Upper bound on sample reads before falling back to the default.
pub(crate) const MAX_SAMPLES: usize = 64;

/// Finds the first line break in a stream of byte slices.
#[derive(Debug, Default)]
struct Detector {
    after_cr: bool,
}

impl Detector {
    fn feed(&mut self, bytes: &[u8]) -> Option<&'static str> {
        for byte in bytes {
            if self.after_cr {
                return Some(if *byte == b'\n' { "\r\n" } else { "\r" });
            }
            match byte {
                b'\r' => self.after_cr = true,
                b'\n' => return Some("\n"),
                _ => {}
            }
        }
        None
    }

    fn finish(&self) -> Option<&'static str> {
        self.after_cr.then_some("\r")
    }
}

/// Detects the row separator of a single buffer.
///
/// ```rust
/// use csv_stream::detect_row_separator;
///
/// assert_eq!(detect_row_separator(b"a,b\r\nc,d"), Some("\r\n"));
/// assert_eq!(detect_row_separator(b"a,b\rc,d"), Some("\r"));
/// assert_eq!(detect_row_separator(b"a,b\nc,d"), Some("\n"));
/// assert_eq!(detect_row_separator(b"a,b"), None);
/// ```
#[must_use]
pub fn detect_row_separator(sample: &[u8]) -> Option<&'static str> {
    let mut detector = Detector::default();
    detector.feed(sample).or_else(|| detector.finish())
}

/// Resolves the row separator from the start of `sources`. Sampled reader
/// bytes are re-inserted in front of their reader.
pub(crate) fn sniff_row_separator(sources: &mut VecDeque<Source<'_>>) -> io::Result<String> {
    let mut detector = Detector::default();
    let mut samples = 0;
    let mut index = 0;
    let mut found = None;

    while index < sources.len() && found.is_none() && samples < MAX_SAMPLES {
        let mut sampled = Vec::new();
        match &mut sources[index] {
            Source::Bytes(bytes) => found = detector.feed(&bytes[..]),
            Source::Reader(reader) => {
                let mut buffer = [0u8; SAMPLE_SIZE];
                while found.is_none() && samples < MAX_SAMPLES {
                    let read = read_some(reader, &mut buffer)?;
                    if read == 0 {
                        break;
                    }
                    samples += 1;
                    sampled.extend_from_slice(&buffer[..read]);
                    found = detector.feed(&buffer[..read]);
                }
            }
        }
        if sampled.is_empty() {
            index += 1;
        } else {
            debug!(bytes = sampled.len(), "re-injecting sampled input");
            sources.insert(index, Source::Bytes(Cow::Owned(sampled)));
            index += 2;
        }
    }

    let separator = found
        .or_else(|| detector.finish())
        .unwrap_or(DEFAULT_ROW_SEPARATOR);
    debug!(separator = ?separator, samples, "resolved row separator");
    Ok(separator.to_string())
}

fn read_some<R: Read + ?Sized>(reader: &mut R, buffer: &mut [u8]) -> io::Result<usize> {
    loop {
        match reader.read(buffer) {
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}
