//! Wire codec for the SANE network protocol.
//!
//! Everything on the control socket travels as 4-byte big-endian words;
//! strings carry their own length and a NUL terminator, in ISO-8859-1.

use std::io::{Read, Write};

use crate::error::{Result, SaneError};
use crate::net::types::{FrameKind, FrameParameters, Status};

/// Smallest representable fixed-precision value.
pub const FIXED_MIN: f64 = -32768.0;
/// Largest accepted fixed-precision value.
pub const FIXED_MAX: f64 = 32767.9999;

const FIXED_SCALE: f64 = 65536.0;

/// One 4-byte protocol word.
///
/// A word is opaque on the wire; callers project it to a signed integer or
/// to a Q15.16 fixed-precision number as the context demands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word(i32);

impl Word {
    pub const SIZE: usize = 4;

    pub fn new(value: i32) -> Self {
        Word(value)
    }

    pub fn as_i32(self) -> i32 {
        self.0
    }

    /// Project this word as a Q15.16 fixed-precision number.
    pub fn to_fixed(self) -> f64 {
        f64::from(self.0) / FIXED_SCALE
    }

    /// Encode a fixed-precision number.
    ///
    /// Not round-trip exact; the inverse may differ by one least significant
    /// bit (2^-16).
    pub fn from_fixed(value: f64) -> Result<Self> {
        if !value.is_finite() || value < FIXED_MIN || value > FIXED_MAX {
            return Err(SaneError::precondition(format!(
                "fixed-precision value {value} outside [{FIXED_MIN}, {FIXED_MAX}]"
            )));
        }
        Ok(Word((value * FIXED_SCALE).round() as i32))
    }

    /// Encode a protocol version triple.
    pub fn version(major: u8, minor: u8, build: u16) -> Self {
        let bits = (u32::from(major) << 24) | (u32::from(minor) << 16) | u32::from(build);
        Word(bits as i32)
    }

    pub fn to_be_bytes(self) -> [u8; 4] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 4]) -> Self {
        Word(i32::from_be_bytes(bytes))
    }
}

/// Decode ISO-8859-1 bytes; every byte maps to the code point of the same value.
pub(crate) fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

/// Encode to ISO-8859-1; characters above U+00FF become `?`.
pub(crate) fn string_to_latin1(s: &str) -> Vec<u8> {
    s.chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect()
}

/// Reads protocol primitives from a byte stream.
pub struct WireReader<R: Read> {
    inner: R,
}

impl<R: Read> WireReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn read_word(&mut self) -> Result<Word> {
        let mut bytes = [0u8; Word::SIZE];
        self.inner.read_exact(&mut bytes)?;
        Ok(Word::from_be_bytes(bytes))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_word()?.as_i32())
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; count];
        self.inner.read_exact(&mut buf)?;
        Ok(buf)
    }

    /// Read a pointer word; `true` means a value follows.
    pub fn read_pointer(&mut self) -> Result<bool> {
        Ok(self.read_word()?.as_i32() != 0)
    }

    pub fn read_status(&mut self) -> Result<Status> {
        Ok(Status::from_wire(self.read_i32()?))
    }

    /// Read a length-prefixed, NUL-terminated ISO-8859-1 string.
    ///
    /// An empty string is a single zero word with no body.
    pub fn read_string(&mut self) -> Result<String> {
        let length = self.read_i32()?;
        if length == 0 {
            return Ok(String::new());
        }
        if length < 0 {
            return Err(SaneError::protocol(format!("negative string length {length}")));
        }
        let bytes = self.read_bytes(length as usize)?;
        let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
        Ok(latin1_to_string(&bytes[..end]))
    }

    /// Read the six-word frame parameter block.
    pub fn read_parameters(&mut self) -> Result<FrameParameters> {
        let frame_word = self.read_i32()?;
        let frame = FrameKind::from_wire(frame_word)
            .ok_or_else(|| SaneError::protocol(format!("unknown frame type {frame_word}")))?;
        let last_frame = self.read_i32()? != 0;
        let bytes_per_line = self.read_i32()?;
        let pixels_per_line = self.read_i32()?;
        let lines = self.read_i32()?;
        let depth = self.read_i32()?;
        Ok(FrameParameters {
            frame,
            last_frame,
            bytes_per_line,
            pixels_per_line,
            lines,
            depth,
        })
    }
}

/// Writes protocol primitives; requests are built in memory and flushed in
/// one piece, so a half-written RPC never reaches the daemon.
pub struct WireWriter<W: Write> {
    inner: W,
}

impl WireWriter<Vec<u8>> {
    /// A writer backed by a fresh request buffer.
    pub fn buffered() -> Self {
        Self { inner: Vec::new() }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.inner
    }
}

impl<W: Write> WireWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn write_word(&mut self, word: Word) -> Result<()> {
        self.inner.write_all(&word.to_be_bytes())?;
        Ok(())
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_word(Word::new(value))
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        Ok(())
    }

    /// Write a string with `length + 1` prefix and a trailing NUL.
    pub fn write_string(&mut self, value: &str) -> Result<()> {
        let bytes = string_to_latin1(value);
        self.write_i32(bytes.len() as i32 + 1)?;
        self.inner.write_all(&bytes)?;
        self.inner.write_all(&[0])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn read_back(bytes: &[u8]) -> WireReader<Cursor<&[u8]>> {
        WireReader::new(Cursor::new(bytes))
    }

    #[test]
    fn test_word_round_trip() {
        for value in [0, 1, -1, 42, i32::MIN, i32::MAX, 0x0102_0304] {
            let word = Word::new(value);
            assert_eq!(Word::from_be_bytes(word.to_be_bytes()).as_i32(), value);
        }
    }

    #[test]
    fn test_word_is_big_endian() {
        assert_eq!(Word::new(0x0102_0304).to_be_bytes(), [1, 2, 3, 4]);
        assert_eq!(Word::new(1).to_be_bytes(), [0, 0, 0, 1]);
    }

    #[test]
    fn test_fixed_round_trip_within_one_lsb() {
        for value in [0.0, 1.0, -1.0, 0.5, 123.456, -32768.0, 32767.9999, 0.00001] {
            let word = Word::from_fixed(value).unwrap();
            assert!((word.to_fixed() - value).abs() < 1.0 / 32768.0, "value {value}");
        }
    }

    #[test]
    fn test_fixed_boundaries() {
        assert!(Word::from_fixed(32768.0).is_err());
        assert!(Word::from_fixed(-32768.5).is_err());
        assert!(Word::from_fixed(f64::NAN).is_err());
        assert!(Word::from_fixed(32767.9999).is_ok());
        assert!(Word::from_fixed(-32768.0).is_ok());
    }

    #[test]
    fn test_fixed_known_encoding() {
        assert_eq!(Word::from_fixed(1.0).unwrap().as_i32(), 65536);
        assert_eq!(Word::from_fixed(-1.0).unwrap().as_i32(), -65536);
        assert_eq!(Word::from_fixed(0.5).unwrap().as_i32(), 32768);
    }

    #[test]
    fn test_version_word() {
        assert_eq!(Word::version(1, 0, 3).as_i32(), 0x0100_0003);
        assert_eq!(Word::version(0xFF, 0xFF, 0xFFFF).as_i32(), -1);
    }

    #[test]
    fn test_write_string_layout() {
        let mut w = WireWriter::buffered();
        w.write_string("alice").unwrap();
        assert_eq!(
            w.into_bytes(),
            [0, 0, 0, 6, b'a', b'l', b'i', b'c', b'e', 0]
        );
    }

    #[test]
    fn test_write_empty_string_layout() {
        let mut w = WireWriter::buffered();
        w.write_string("").unwrap();
        assert_eq!(w.into_bytes(), [0, 0, 0, 1, 0]);
    }

    #[test]
    fn test_string_round_trip() {
        for value in ["", "alice", "Grauwertbild", "caf\u{e9}"] {
            let mut w = WireWriter::buffered();
            w.write_string(value).unwrap();
            let bytes = w.into_bytes();
            assert_eq!(read_back(&bytes).read_string().unwrap(), value);
        }
    }

    #[test]
    fn test_non_latin1_characters_encode_as_question_mark() {
        let mut w = WireWriter::buffered();
        w.write_string("a\u{1F600}b").unwrap();
        let bytes = w.into_bytes();
        assert_eq!(read_back(&bytes).read_string().unwrap(), "a?b");
    }

    #[test]
    fn test_read_empty_string_is_single_zero_word() {
        assert_eq!(read_back(&[0, 0, 0, 0]).read_string().unwrap(), "");
    }

    #[test]
    fn test_read_string_negative_length() {
        let bytes = Word::new(-4).to_be_bytes();
        assert!(matches!(
            read_back(&bytes).read_string(),
            Err(SaneError::Protocol(_))
        ));
    }

    #[test]
    fn test_truncated_read_is_io_error() {
        let err = read_back(&[0, 0]).read_word().unwrap_err();
        assert!(matches!(err, SaneError::Io(_)));

        // Length word promises more bytes than the stream holds
        let err = read_back(&[0, 0, 0, 9, b'x']).read_string().unwrap_err();
        assert!(matches!(err, SaneError::Io(_)));
    }

    #[test]
    fn test_read_pointer() {
        assert!(!read_back(&[0, 0, 0, 0]).read_pointer().unwrap());
        assert!(read_back(&[0, 0, 0, 1]).read_pointer().unwrap());
        assert!(read_back(&[0xDE, 0xAD, 0xBE, 0xEF]).read_pointer().unwrap());
    }

    #[test]
    fn test_read_parameters() {
        let mut bytes = Vec::new();
        for value in [0, 1, 100, 100, 10, 8] {
            bytes.extend_from_slice(&Word::new(value).to_be_bytes());
        }
        let params = read_back(&bytes).read_parameters().unwrap();
        assert_eq!(params.frame, FrameKind::Gray);
        assert!(params.last_frame);
        assert_eq!(params.bytes_per_line, 100);
        assert_eq!(params.pixels_per_line, 100);
        assert_eq!(params.lines, 10);
        assert_eq!(params.depth, 8);
    }

    #[test]
    fn test_read_parameters_unknown_frame() {
        let mut bytes = Vec::new();
        for value in [9, 1, 100, 100, 10, 8] {
            bytes.extend_from_slice(&Word::new(value).to_be_bytes());
        }
        assert!(matches!(
            read_back(&bytes).read_parameters(),
            Err(SaneError::Protocol(_))
        ));
    }

    #[test]
    fn test_latin1_helpers() {
        assert_eq!(latin1_to_string(&[0x61, 0xE9, 0xFF]), "a\u{e9}\u{ff}");
        assert_eq!(string_to_latin1("a\u{e9}\u{ff}"), vec![0x61, 0xE9, 0xFF]);
    }
}
