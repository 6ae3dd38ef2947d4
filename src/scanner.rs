//! Chunked lookahead scanner.
//!
//! The [`Scanner`] presents any number of [`Source`]s as one logical text
//! stream. It owns a window of decoded text and a cursor into it; loading a
//! chunk replaces the window with the unconsumed tail plus the new text and
//! resets the cursor. Patterns never see a chunk boundary: when one cannot
//! decide on the current window, the scanner loads more and asks again.
//!
//! Checkpoints (`mark_start` / `mark_end` / `rewind`) record the cursor.
//! Text consumed under an open checkpoint is moved into the checkpoint's carry
//! buffer whenever the window is replaced, so the consumed text can always be
//! reproduced and the cursor restored.

use crate::pattern::{Match, Pattern};
use crate::source::Source;
use std::collections::VecDeque;
use std::io;
use std::str::Utf8Error;
use thiserror::Error;
use tracing::trace;

/// Failures raised while scanning; the parser attaches the line number.
#[derive(Debug, Error)]
pub(crate) enum ScanError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("invalid UTF-8: {0}")]
    Encoding(#[from] Utf8Error),

    /// A caller hook rejected the text accumulated so far.
    #[error(transparent)]
    Rejected(#[from] crate::Error),
}

impl ScanError {
    /// Converts into the public error, located at `line`.
    pub(crate) fn at_line(self, line: usize) -> crate::Error {
        match self {
            ScanError::Io(e) => crate::Error::Io(e),
            ScanError::Encoding(e) => crate::Error::invalid_encoding(e, line),
            ScanError::Rejected(e) => e,
        }
    }
}

type ScanResult<T> = std::result::Result<T, ScanError>;

#[derive(Debug)]
struct Checkpoint {
    offset: usize,
    carry: String,
}

pub(crate) struct Scanner<'a> {
    sources: VecDeque<Source<'a>>,
    window: String,
    cursor: usize,
    checkpoints: Vec<Checkpoint>,
    /// Trailing bytes of an incomplete UTF-8 sequence, completed by the next read.
    pending: Vec<u8>,
    chunk_size: usize,
    read_hint: Option<u8>,
}

impl<'a> Scanner<'a> {
    pub(crate) fn new(
        sources: VecDeque<Source<'a>>,
        chunk_size: usize,
        read_hint: Option<u8>,
    ) -> Self {
        Scanner {
            sources,
            window: String::new(),
            cursor: 0,
            checkpoints: Vec::new(),
            pending: Vec::new(),
            chunk_size,
            read_hint,
        }
    }

    /// Matches `pattern` at the cursor. On success the cursor moves past the
    /// match and the matched text is returned; otherwise nothing moves.
    pub(crate) fn scan<P: Pattern>(&mut self, pattern: &P) -> ScanResult<Option<String>> {
        loop {
            let complete = self.sources.is_empty();
            match pattern.match_at(self.rest(), complete) {
                Match::Found(length) => {
                    let value = self.rest()[..length].to_string();
                    self.advance(length)?;
                    return Ok(Some(value));
                }
                Match::Partial(_) => {
                    self.load_chunk()?;
                }
                Match::Missing => return Ok(None),
            }
        }
    }

    /// Matches a run that may continue across any number of chunks and
    /// returns it concatenated.
    #[cfg(test)]
    pub(crate) fn scan_greedy<P: Pattern>(&mut self, pattern: &P) -> ScanResult<Option<String>> {
        self.accumulate(pattern, |_| Ok(true))
    }

    /// Greedy scan with a hook that sees the accumulated text after every
    /// step and can abort the scan.
    pub(crate) fn scan_greedy_with<P, F>(
        &mut self,
        pattern: &P,
        mut inspect: F,
    ) -> ScanResult<Option<String>>
    where
        P: Pattern,
        F: FnMut(&str) -> crate::Result<()>,
    {
        self.accumulate(pattern, |value| {
            inspect(value)?;
            Ok(true)
        })
    }

    /// Greedy scan that stops accumulating once at least `max` bytes are
    /// collected. The match may then be cut short; the
    /// cursor sits right after the returned text.
    pub(crate) fn scan_greedy_bounded<P: Pattern>(
        &mut self,
        pattern: &P,
        max: usize,
    ) -> ScanResult<Option<String>> {
        self.accumulate(pattern, |value| Ok(value.len() < max))
    }

    /// Consumes a greedy match without keeping it and returns its length.
    /// Memory stays bounded by the chunk size however long the match is.
    pub(crate) fn skip_greedy<P: Pattern>(&mut self, pattern: &P) -> ScanResult<usize> {
        let mut skipped = 0;
        loop {
            let complete = self.sources.is_empty();
            match pattern.match_at(self.rest(), complete) {
                Match::Found(length) => {
                    self.advance(length)?;
                    return Ok(skipped + length);
                }
                Match::Partial(length) => {
                    self.cursor += length;
                    skipped += length;
                    self.load_chunk()?;
                }
                Match::Missing => return Ok(skipped),
            }
        }
    }

    /// Greedy matching loop. `step` sees the accumulated text after every
    /// extension and returns `false` to stop early.
    fn accumulate<P, F>(&mut self, pattern: &P, mut step: F) -> ScanResult<Option<String>>
    where
        P: Pattern,
        F: FnMut(&str) -> ScanResult<bool>,
    {
        let mut value: Option<String> = None;
        loop {
            let complete = self.sources.is_empty();
            match pattern.match_at(self.rest(), complete) {
                Match::Found(length) => {
                    let text = value.get_or_insert_with(String::new);
                    text.push_str(&self.window[self.cursor..self.cursor + length]);
                    self.cursor += length;
                    step(text)?;
                    if self.cursor == self.window.len() {
                        self.load_chunk()?;
                    }
                    return Ok(value);
                }
                Match::Partial(length) => {
                    if length > 0 {
                        let text = value.get_or_insert_with(String::new);
                        text.push_str(&self.window[self.cursor..self.cursor + length]);
                        self.cursor += length;
                        if !step(text)? {
                            return Ok(value);
                        }
                    }
                    self.load_chunk()?;
                }
                Match::Missing => return Ok(value),
            }
        }
    }

    /// `true` once every source is exhausted and the window is consumed.
    pub(crate) fn eos(&mut self) -> ScanResult<bool> {
        while self.cursor == self.window.len() {
            if !self.load_chunk()? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Unconsumed text of the current window only.
    pub(crate) fn rest(&self) -> &str {
        &self.window[self.cursor..]
    }

    /// Cursor position inside the current window.
    #[cfg(test)]
    pub(crate) fn position(&self) -> usize {
        self.cursor
    }

    /// Moves the cursor inside the current window. Moving it to the end of
    /// the window loads the next chunk.
    #[cfg(test)]
    pub(crate) fn set_position(&mut self, position: usize) -> ScanResult<()> {
        self.cursor = position.min(self.window.len());
        if self.cursor == self.window.len() {
            self.load_chunk()?;
        }
        Ok(())
    }

    pub(crate) fn mark_start(&mut self) {
        self.checkpoints.push(Checkpoint {
            offset: self.cursor,
            carry: String::new(),
        });
    }

    /// Closes the innermost checkpoint and returns everything consumed since
    /// it was opened.
    pub(crate) fn mark_end(&mut self) -> String {
        match self.checkpoints.pop() {
            Some(Checkpoint { offset, mut carry }) => {
                carry.push_str(&self.window[offset..self.cursor]);
                carry
            }
            None => String::new(),
        }
    }

    /// Closes the innermost checkpoint, keeping the cursor where it is.
    pub(crate) fn mark_drop(&mut self) {
        self.checkpoints.pop();
    }

    /// Closes the innermost checkpoint and moves the cursor back to it.
    pub(crate) fn rewind(&mut self) {
        let Some(Checkpoint { offset, carry }) = self.checkpoints.pop() else {
            return;
        };
        if carry.is_empty() {
            self.cursor = offset;
            return;
        }
        // The carried text is unconsumed again; outer checkpoints carried the
        // same bytes as their suffix.
        for outer in &mut self.checkpoints {
            let keep = outer.carry.len().saturating_sub(carry.len());
            outer.carry.truncate(keep);
        }
        let mut window = carry;
        window.push_str(&self.window[offset..]);
        self.window = window;
        self.cursor = 0;
    }

    fn advance(&mut self, length: usize) -> ScanResult<()> {
        self.cursor += length;
        if self.cursor == self.window.len() {
            self.load_chunk()?;
        }
        Ok(())
    }

    /// Reads the next non-empty chunk into the window. Returns `false` when
    /// all sources are exhausted.
    fn load_chunk(&mut self) -> ScanResult<bool> {
        loop {
            let Some(source) = self.sources.front_mut() else {
                if !self.pending.is_empty() {
                    let pending = std::mem::take(&mut self.pending);
                    std::str::from_utf8(&pending)?;
                }
                return Ok(false);
            };
            let mut bytes = std::mem::take(&mut self.pending);
            let read = source.read_chunk(self.chunk_size, self.read_hint, &mut bytes)?;
            if read == 0 {
                self.sources.pop_front();
                self.pending = bytes;
                continue;
            }
            match std::str::from_utf8(&bytes) {
                Ok(text) => {
                    self.append(text);
                    return Ok(true);
                }
                Err(e) if e.error_len().is_none() => {
                    let valid = e.valid_up_to();
                    self.pending = bytes[valid..].to_vec();
                    if valid == 0 {
                        continue;
                    }
                    let text = std::str::from_utf8(&bytes[..valid])?;
                    self.append(text);
                    return Ok(true);
                }
                Err(e) => return Err(ScanError::Encoding(e)),
            }
        }
    }

    fn append(&mut self, text: &str) {
        for checkpoint in &mut self.checkpoints {
            checkpoint
                .carry
                .push_str(&self.window[checkpoint.offset..self.cursor]);
            checkpoint.offset = 0;
        }
        self.window.drain(..self.cursor);
        self.window.push_str(text);
        self.cursor = 0;
        trace!(
            chunk = text.len(),
            window = self.window.len(),
            "loaded chunk"
        );
    }
}
