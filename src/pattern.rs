//! Anchored token patterns matched by the scanner.
//!
//! A pattern looks at the unconsumed text and says how much of it matches.
//! Because the text is only the current lookahead window, a pattern may also
//! answer that it cannot decide yet: a multi-character separator could be cut
//! by a chunk boundary, or a run could continue in the next chunk. The scanner
//! then loads more input and asks again.

/// Outcome of matching a pattern at the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Match {
    /// The first `n` bytes match and the match is final.
    Found(usize),
    /// The first `n` bytes match (possibly none) but more input could extend
    /// or complete the match.
    Partial(usize),
    /// No match.
    Missing,
}

pub(crate) trait Pattern {
    /// Matches at the start of `input`. `complete` is `true` when no input
    /// follows, in which case the answer must not be [`Match::Partial`].
    fn match_at(&self, input: &str, complete: bool) -> Match;
}

/// A fixed piece of text such as a separator or the quote character.
#[derive(Clone, Debug)]
pub(crate) struct Literal {
    text: String,
}

impl Literal {
    pub(crate) fn new(text: &str) -> Self {
        Literal {
            text: text.to_string(),
        }
    }

    pub(crate) fn from_char(c: char) -> Self {
        Literal {
            text: c.to_string(),
        }
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.text
    }
}

impl Pattern for Literal {
    fn match_at(&self, input: &str, complete: bool) -> Match {
        if input.starts_with(self.text.as_str()) {
            Match::Found(self.text.len())
        } else if !complete && self.text.starts_with(input) {
            Match::Partial(0)
        } else {
            Match::Missing
        }
    }
}

/// The longest non-empty run of text containing none of the stop strings.
#[derive(Clone, Debug)]
pub(crate) struct Run {
    stops: Vec<String>,
    first_bytes: [bool; 256],
}

impl Run {
    pub(crate) fn excluding<I, S>(stops: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut first_bytes = [false; 256];
        let stops: Vec<String> = stops
            .into_iter()
            .map(Into::into)
            .filter(|stop: &String| !stop.is_empty())
            .collect();
        for stop in &stops {
            first_bytes[stop.as_bytes()[0] as usize] = true;
        }
        Run { stops, first_bytes }
    }

    fn finish(length: usize) -> Match {
        if length == 0 {
            Match::Missing
        } else {
            Match::Found(length)
        }
    }
}

impl Pattern for Run {
    fn match_at(&self, input: &str, complete: bool) -> Match {
        let bytes = input.as_bytes();
        // Stops are valid UTF-8, so a first byte never matches inside a
        // multi-byte character and every index checked below is a boundary.
        for (index, byte) in bytes.iter().enumerate() {
            if !self.first_bytes[*byte as usize] {
                continue;
            }
            let rest = &input[index..];
            for stop in &self.stops {
                if rest.starts_with(stop.as_str()) {
                    return Run::finish(index);
                }
                if !complete && stop.len() > rest.len() && stop.starts_with(rest) {
                    return Match::Partial(index);
                }
            }
        }
        if complete {
            Run::finish(input.len())
        } else {
            Match::Partial(input.len())
        }
    }
}

/// One raw line: everything up to and including the row separator, or up to
/// the end of the stream.
#[derive(Clone, Debug)]
pub(crate) struct LineUntil {
    separator: String,
}

impl LineUntil {
    pub(crate) fn new(separator: &str) -> Self {
        LineUntil {
            separator: separator.to_string(),
        }
    }
}

impl Pattern for LineUntil {
    fn match_at(&self, input: &str, complete: bool) -> Match {
        if let Some(index) = input.find(self.separator.as_str()) {
            return Match::Found(index + self.separator.len());
        }
        if complete {
            return if input.is_empty() {
                Match::Missing
            } else {
                Match::Found(input.len())
            };
        }
        // Everything before a possible separator prefix at the end is part of
        // the line, so a greedy scan never searches it again.
        let start = input.len().saturating_sub(self.separator.len() - 1);
        let settled = (start..input.len())
            .find(|&index| {
                input.is_char_boundary(index) && self.separator.starts_with(&input[index..])
            })
            .unwrap_or(input.len());
        Match::Partial(settled)
    }
}
