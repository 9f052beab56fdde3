//! Character sources feeding the tokenizer.
//!
//! The tokenizer pulls one `char` at a time and occasionally needs to look one
//! character ahead. A [`CharSource`] provides exactly that: a blocking read and
//! a single slot of pushback.

use std::io::{self, BufRead};
use std::str::Chars;

use crate::error::{Error, Result};

/// Blocking, pull-based reader of single characters with one character of pushback.
pub trait CharSource {
    /// Read the next character, or `None` at end of input.
    fn read_char(&mut self) -> Result<Option<char>>;

    /// Push a character back so the next [`read_char`](Self::read_char) returns it.
    ///
    /// Only one character may be pending at a time.
    fn unread(&mut self, c: char);
}

impl<S: CharSource + ?Sized> CharSource for &mut S {
    fn read_char(&mut self) -> Result<Option<char>> {
        (**self).read_char()
    }

    fn unread(&mut self, c: char) {
        (**self).unread(c)
    }
}

/// Character source over in-memory text.
#[derive(Debug, Clone)]
pub struct StrSource<'a> {
    chars: Chars<'a>,
    pending: Option<char>,
}

impl<'a> StrSource<'a> {
    /// Create a source reading from `text`.
    pub fn new(text: &'a str) -> Self {
        Self {
            chars: text.chars(),
            pending: None,
        }
    }
}

impl CharSource for StrSource<'_> {
    fn read_char(&mut self) -> Result<Option<char>> {
        Ok(self.pending.take().or_else(|| self.chars.next()))
    }

    fn unread(&mut self, c: char) {
        debug_assert!(self.pending.is_none(), "only one character of pushback");
        self.pending = Some(c);
    }
}

/// Character source decoding UTF-8 from a buffered byte reader.
///
/// Decoding is incremental; only the reader's own buffer is held in memory.
#[derive(Debug)]
pub struct ReaderSource<R> {
    reader: R,
    pending: Option<char>,
    offset: u64,
}

impl<R: BufRead> ReaderSource<R> {
    /// Create a source over `reader`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            pending: None,
            offset: 0,
        }
    }

    /// Number of bytes consumed from the reader so far.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Recover the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn next_byte(&mut self) -> Result<Option<u8>> {
        loop {
            let buf = match self.reader.fill_buf() {
                Ok(buf) => buf,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(Error::Io(e)),
            };
            let Some(&byte) = buf.first() else {
                return Ok(None);
            };
            self.reader.consume(1);
            self.offset += 1;
            return Ok(Some(byte));
        }
    }
}

/// Length of a UTF-8 sequence given its leading byte, or `None` if the byte
/// cannot start a sequence.
fn utf8_width(lead: u8) -> Option<usize> {
    match lead {
        0x00..=0x7F => Some(1),
        0xC2..=0xDF => Some(2),
        0xE0..=0xEF => Some(3),
        0xF0..=0xF4 => Some(4),
        _ => None,
    }
}

impl<R: BufRead> CharSource for ReaderSource<R> {
    fn read_char(&mut self) -> Result<Option<char>> {
        if let Some(c) = self.pending.take() {
            return Ok(Some(c));
        }

        let start = self.offset;
        let Some(lead) = self.next_byte()? else {
            return Ok(None);
        };
        if lead.is_ascii() {
            return Ok(Some(lead as char));
        }

        let width = utf8_width(lead).ok_or(Error::InvalidUtf8 { offset: start })?;
        let mut bytes = [lead, 0, 0, 0];
        for slot in bytes.iter_mut().take(width).skip(1) {
            *slot = self
                .next_byte()?
                .ok_or(Error::InvalidUtf8 { offset: start })?;
        }

        std::str::from_utf8(&bytes[..width])
            .ok()
            .and_then(|s| s.chars().next())
            .map(Some)
            .ok_or(Error::InvalidUtf8 { offset: start })
    }

    fn unread(&mut self, c: char) {
        debug_assert!(self.pending.is_none(), "only one character of pushback");
        self.pending = Some(c);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufReader, Cursor, Read};

    fn drain<S: CharSource>(mut source: S) -> Result<String> {
        let mut out = String::new();
        while let Some(c) = source.read_char()? {
            out.push(c);
        }
        Ok(out)
    }

    #[test]
    fn test_str_source_reads_all() {
        assert_eq!(drain(StrSource::new("héllo\n")).unwrap(), "héllo\n");
    }

    #[test]
    fn test_str_source_pushback() {
        let mut source = StrSource::new("ab");
        assert_eq!(source.read_char().unwrap(), Some('a'));
        source.unread('a');
        assert_eq!(source.read_char().unwrap(), Some('a'));
        assert_eq!(source.read_char().unwrap(), Some('b'));
        assert_eq!(source.read_char().unwrap(), None);
        // Pushback after end of input is still returned
        source.unread('b');
        assert_eq!(source.read_char().unwrap(), Some('b'));
        assert_eq!(source.read_char().unwrap(), None);
    }

    #[test]
    fn test_reader_source_decodes_multibyte() {
        let text = "temp=1 °C ✓ 𝄞";
        let source = ReaderSource::new(Cursor::new(text.as_bytes()));
        assert_eq!(drain(source).unwrap(), text);
    }

    #[test]
    fn test_reader_source_small_buffer() {
        // Multi-byte characters straddling buffer refills
        let text = "ééééé✓✓✓";
        let reader = BufReader::with_capacity(1, text.as_bytes());
        assert_eq!(drain(ReaderSource::new(reader)).unwrap(), text);
    }

    #[test]
    fn test_reader_source_pushback() {
        let mut source = ReaderSource::new(Cursor::new("é!".as_bytes()));
        let c = source.read_char().unwrap().unwrap();
        source.unread(c);
        assert_eq!(source.read_char().unwrap(), Some('é'));
        assert_eq!(source.read_char().unwrap(), Some('!'));
        assert_eq!(source.offset(), 3);
    }

    #[test]
    fn test_reader_source_invalid_utf8() {
        let bytes: &[u8] = &[b'a', 0xFF, b'b'];
        let mut source = ReaderSource::new(bytes);
        assert_eq!(source.read_char().unwrap(), Some('a'));
        assert!(matches!(
            source.read_char(),
            Err(Error::InvalidUtf8 { offset: 1 })
        ));
    }

    #[test]
    fn test_reader_source_truncated_sequence() {
        let bytes: &[u8] = &[0xE2, 0x9C];
        let mut source = ReaderSource::new(bytes);
        assert!(matches!(
            source.read_char(),
            Err(Error::InvalidUtf8 { offset: 0 })
        ));
    }

    #[test]
    fn test_reader_source_io_error() {
        struct Failing;
        impl Read for Failing {
            fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }

        let mut source = ReaderSource::new(BufReader::new(Failing));
        assert!(matches!(source.read_char(), Err(Error::Io(_))));
    }

    #[test]
    fn test_borrowed_source() {
        fn first<S: CharSource>(mut source: S) -> Option<char> {
            source.read_char().unwrap()
        }

        let mut source = StrSource::new("xy");
        assert_eq!(first(&mut source), Some('x'));
        assert_eq!(source.read_char().unwrap(), Some('y'));
    }
}
