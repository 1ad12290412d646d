//! Growable, position-tracking view over a pull-based text source.
//!
//! A [`ReadBuffer`] lets codecs decode a document as soon as enough of it has
//! arrived, without ever materializing the whole input. Consumed prefixes can
//! be discarded to keep the retained text proportional to the distance
//! between the last confirmed consumption point and the parse frontier; the
//! discarded line/column counters keep error positions exact regardless.

use std::io::{self, BufRead};

use crate::{
    error::DecodeError,
    scan::{ScanOutcome, Scanner},
};

/// A pull-based text source.
///
/// Chunk boundaries are the implementor's choice (a line, a fixed span, a
/// single character); decoding behaves identically regardless, which is the
/// core guarantee of [`ReadBuffer::match_scan`].
pub trait TextSource {
    /// Appends the next chunk of text to `out`.
    ///
    /// Returns the number of bytes appended; zero signals end of input.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures from the underlying reader.
    fn pull(&mut self, out: &mut String) -> io::Result<usize>;
}

/// Line-bounded [`TextSource`] over any buffered reader.
pub struct LineSource<R> {
    reader: R,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> TextSource for LineSource<R> {
    fn pull(&mut self, out: &mut String) -> io::Result<usize> {
        self.reader.read_line(out)
    }
}

/// An incremental buffer over a text source.
///
/// # Examples
///
/// ```
/// use textcodec::{ReadBuffer, scan::Digits};
///
/// let mut buf = ReadBuffer::from_text("123,");
/// let end = buf.match_scan(&Digits, 0).unwrap();
/// assert_eq!(end, Some(3));
/// assert_eq!(&buf.retained()[..3], "123");
/// ```
pub struct ReadBuffer<'src> {
    source: Option<Box<dyn TextSource + 'src>>,
    data: String,
    discarded: usize,
    lines_discarded: usize,
    /// Characters discarded on the line the discard point sits on.
    column_discarded: usize,
}

impl core::fmt::Debug for ReadBuffer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ReadBuffer")
            .field("retained", &self.data.len())
            .field("discarded", &self.discarded)
            .field("exhausted", &self.source.is_none())
            .finish()
    }
}

impl<'src> ReadBuffer<'src> {
    /// Wraps a reader; data is pulled one line at a time as matches need it.
    pub fn from_reader(reader: impl BufRead + 'src) -> Self {
        Self::from_source(LineSource::new(reader))
    }

    /// Wraps an arbitrary [`TextSource`].
    pub fn from_source(source: impl TextSource + 'src) -> Self {
        Self {
            source: Some(Box::new(source)),
            data: String::new(),
            discarded: 0,
            lines_discarded: 0,
            column_discarded: 0,
        }
    }

    /// Builds an already-exhausted buffer over a fully materialized string.
    #[must_use]
    pub fn from_text(text: &str) -> ReadBuffer<'static> {
        ReadBuffer {
            source: None,
            data: text.to_owned(),
            discarded: 0,
            lines_discarded: 0,
            column_discarded: 0,
        }
    }

    /// The undiscarded suffix of everything read so far.
    #[must_use]
    pub fn retained(&self) -> &str {
        &self.data
    }

    /// Returns `true` once the source has reported end of input.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.source.is_none()
    }

    /// Pulls the next line from the source and appends it to retained text.
    ///
    /// Returns the number of bytes read; zero marks the source exhausted.
    ///
    /// # Errors
    ///
    /// Propagates I/O failures (including invalid UTF-8) from the source.
    pub fn fill(&mut self) -> Result<usize, DecodeError> {
        let Some(source) = self.source.as_mut() else {
            return Ok(0);
        };
        let read = source.pull(&mut self.data)?;
        if read == 0 {
            self.source = None;
        }
        Ok(read)
    }

    /// Permanently drops the retained prefix `[0, offset)`.
    ///
    /// Offsets held by the caller become stale; only the suffix from `offset`
    /// on remains addressable, starting at offset zero.
    ///
    /// # Panics
    ///
    /// Panics if `offset` is not a character boundary of the retained text.
    pub fn discard(&mut self, offset: usize) {
        if offset == 0 {
            return;
        }
        let dropped = &self.data[..offset];
        self.discarded += dropped.len();
        self.lines_discarded += dropped.matches('\n').count();
        match dropped.rfind('\n') {
            Some(last) => {
                self.column_discarded = dropped[last + 1..].chars().count();
            }
            None => {
                self.column_discarded += dropped.chars().count();
            }
        }
        self.data.drain(..offset);
    }

    /// Converts a retained-text offset to an absolute byte offset in the
    /// original input.
    #[must_use]
    pub fn abs_offset(&self, offset: usize) -> usize {
        self.discarded + offset
    }

    /// Converts a retained-text offset into a 1-based (line, column) pair,
    /// accounting for discarded lines and columns.
    #[must_use]
    pub fn position_at(&self, offset: usize) -> (usize, usize) {
        let seen = &self.data[..offset.min(self.data.len())];
        let newlines = seen.matches('\n').count();
        let line = self.lines_discarded + newlines + 1;
        let column = match seen.rfind('\n') {
            Some(last) => seen[last + 1..].chars().count() + 1,
            None => self.column_discarded + seen.chars().count() + 1,
        };
        (line, column)
    }

    /// Up to `limit` characters of retained text starting at `offset`, for
    /// error messages.
    #[must_use]
    pub fn context_at(&self, offset: usize, limit: usize) -> String {
        self.data[offset.min(self.data.len())..]
            .chars()
            .take(limit)
            .collect()
    }

    /// Applies `scanner` at `pos`, pulling more input while the outcome is
    /// inconclusive.
    ///
    /// Returns `Ok(Some(end))` for a match, `Ok(None)` when the pattern can
    /// never match here.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Incomplete`] if `pos` lies beyond the retained text
    /// with the source exhausted; I/O errors from the source.
    pub fn match_scan(
        &mut self,
        scanner: &dyn Scanner,
        pos: usize,
    ) -> Result<Option<usize>, DecodeError> {
        loop {
            if pos > self.data.len() {
                if self.fill()? == 0 {
                    return Err(DecodeError::Incomplete);
                }
                continue;
            }
            match scanner.scan(&self.data, pos) {
                ScanOutcome::NoMatch => return Ok(None),
                ScanOutcome::Match { end } => return Ok(Some(end)),
                ScanOutcome::Partial { complete } => {
                    if self.fill()? == 0 {
                        // End of input is a hard boundary: commit whatever
                        // the scanner already considered a valid match.
                        return Ok(complete);
                    }
                }
            }
        }
    }

    /// Tests whether retained text at `pos` begins with `literal`, pulling
    /// more data first if the retained text is too short to decide.
    ///
    /// # Errors
    ///
    /// [`DecodeError::Incomplete`] if `pos` lies beyond the retained text
    /// with the source exhausted; I/O errors from the source.
    pub fn match_literal(&mut self, literal: &str, pos: usize) -> Result<bool, DecodeError> {
        while pos + literal.len() > self.data.len() {
            if self.fill()? == 0 {
                break;
            }
        }
        if pos > self.data.len() {
            return Err(DecodeError::Incomplete);
        }
        Ok(self.data[pos..].starts_with(literal))
    }
}
