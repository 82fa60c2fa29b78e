//! UTF-8 decoding on top of byte ropes.
//!
//! A code point may straddle two leaves, so the bytes of a partially read
//! code point are carried over from one chunk to the next in a small inline
//! buffer.  Decoding is lenient: it stops at the first invalid or truncated
//! sequence, as if the data ended there, and reports where that happened.

use std::ops::ControlFlow;

use smallvec::SmallVec;

use crate::iter::Chunks;
use crate::rope::Rope;
use crate::{Error, Result};

/// Longest encoding of a code point, in bytes.
const MAX_UTF8_LEN: usize = 4;

/// Outcome of decoding the code point at the front of a byte slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Decoded {
    CodePoint(char, usize),
    /// More bytes are needed to tell.
    Incomplete,
    Invalid,
    Empty,
}

/// Width of the code point starting with `lead`, or `0` if `lead` can't start
/// one.
#[inline]
fn utf8_char_width(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC2..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF4 => 4,
        _ => 0,
    }
}

fn decode_front(bytes: &[u8]) -> Decoded {
    let width = match bytes.first() {
        Some(&lead) => utf8_char_width(lead),
        None => return Decoded::Empty,
    };

    if width == 0 {
        Decoded::Invalid
    } else if bytes.len() < width {
        Decoded::Incomplete
    } else {
        match std::str::from_utf8(&bytes[..width]).map(|s| s.chars().next()) {
            Ok(Some(ch)) => Decoded::CodePoint(ch, width),
            _ => Decoded::Invalid,
        }
    }
}

/// A lazy iterator over the code points of a byte [`Rope`], decoded as UTF-8.
///
/// Yields each code point along with the number of bytes it was encoded in.
/// Iteration ends at the end of the rope, or at the first invalid or truncated
/// sequence; [`error()`](CodePoints::error) tells the two apart.
///
/// Created with [`Rope::code_points()`] or [`Rope::code_points_at()`].
#[derive(Debug, Clone)]
pub struct CodePoints<'a> {
    chunks: Chunks<'a, u8>,
    cur_chunk: &'a [u8],
    // Leading bytes of a code point cut off by the end of a chunk.
    carry: SmallVec<[u8; MAX_UTF8_LEN]>,
    // Byte index of the next code point in the rope.
    byte_index: usize,
    error: Option<Error>,
    is_done: bool,
}

impl<'a> CodePoints<'a> {
    pub(crate) fn new(rope: &'a Rope<u8>, byte_index: usize) -> Self {
        CodePoints {
            chunks: rope.chunks_at(byte_index),
            cur_chunk: &[],
            carry: SmallVec::new(),
            byte_index,
            error: None,
            is_done: false,
        }
    }

    /// The reason iteration stopped early, if it did.
    ///
    /// Returns `Some(Error::MalformedUtf8(byte_index))` once the iterator hit
    /// an invalid or truncated sequence starting at `byte_index`, and `None`
    /// otherwise.
    #[inline]
    pub fn error(&self) -> Option<Error> {
        self.error
    }

    /// Byte index in the rope of the next code point to be decoded.
    #[inline]
    pub fn byte_index(&self) -> usize {
        self.byte_index
    }

    fn stop(&mut self, malformed: bool) -> Option<(char, usize)> {
        if malformed {
            tracing::debug!(offset = self.byte_index, "malformed utf8 in rope");
            self.error = Some(Error::MalformedUtf8(self.byte_index));
        }
        self.is_done = true;
        None
    }

    fn emit(&mut self, ch: char, width: usize) -> Option<(char, usize)> {
        self.byte_index += width;
        Some((ch, width))
    }
}

impl<'a> Iterator for CodePoints<'a> {
    type Item = (char, usize);

    fn next(&mut self) -> Option<(char, usize)> {
        if self.is_done {
            return None;
        }

        loop {
            if self.carry.is_empty() {
                match decode_front(self.cur_chunk) {
                    Decoded::CodePoint(ch, width) => {
                        self.cur_chunk = &self.cur_chunk[width..];
                        return self.emit(ch, width);
                    }
                    Decoded::Incomplete => {
                        self.carry.extend_from_slice(self.cur_chunk);
                        self.cur_chunk = &[];
                    }
                    Decoded::Invalid => return self.stop(true),
                    Decoded::Empty => match self.chunks.next() {
                        Some(chunk) => self.cur_chunk = chunk,
                        None => return self.stop(false),
                    },
                }
            } else {
                if self.cur_chunk.is_empty() {
                    match self.chunks.next() {
                        Some(chunk) => self.cur_chunk = chunk,
                        // The rope ends in the middle of a code point.
                        None => return self.stop(true),
                    }
                }

                let carried = self.carry.len();
                let take = (MAX_UTF8_LEN - carried).min(self.cur_chunk.len());
                self.carry.extend_from_slice(&self.cur_chunk[..take]);

                match decode_front(&self.carry) {
                    Decoded::CodePoint(ch, width) => {
                        self.cur_chunk = &self.cur_chunk[width - carried..];
                        self.carry.clear();
                        return self.emit(ch, width);
                    }
                    Decoded::Incomplete => {
                        self.cur_chunk = &self.cur_chunk[take..];
                    }
                    Decoded::Invalid | Decoded::Empty => return self.stop(true),
                }
            }
        }
    }
}

impl<'a> std::iter::FusedIterator for CodePoints<'a> {}

impl Rope<u8> {
    /// Creates an iterator over the UTF-8 code points of the `Rope`.
    ///
    /// See [`CodePoints`] for how invalid data is handled.
    #[inline]
    pub fn code_points(&self) -> CodePoints {
        CodePoints::new(self, 0)
    }

    /// Creates an iterator over the UTF-8 code points of the `Rope`, starting
    /// at `byte_index`.
    ///
    /// A `byte_index` in the middle of a code point stops the iterator right
    /// away, with a [`MalformedUtf8`](Error::MalformedUtf8) error.
    #[inline]
    pub fn code_points_at(&self, byte_index: usize) -> CodePoints {
        CodePoints::new(self, byte_index)
    }

    /// Calls `visitor` with each code point from `byte_index` onwards, along
    /// with its encoded length in bytes.
    ///
    /// Returning [`ControlFlow::Break`] from the visitor stops the walk.
    ///
    /// Decoding stops at the first invalid or truncated sequence.  Every code
    /// point before it has been handed to `visitor` by then, and the position
    /// of the sequence is returned as an
    /// [`Error::MalformedUtf8`](Error::MalformedUtf8).
    ///
    /// ```
    /// # use std::ops::ControlFlow;
    /// # use shared_rope::{Error, Rope};
    /// let rope = Rope::<u8>::from("añ€😀").insert(100, &[0xff]);
    /// let mut widths = Vec::new();
    /// let result = rope.for_each_code_point(0, |_, width| {
    ///     widths.push(width);
    ///     ControlFlow::Continue(())
    /// });
    ///
    /// assert_eq!(widths, [1, 2, 3, 4]);
    /// assert!(matches!(result, Err(Error::MalformedUtf8(10))));
    /// ```
    pub fn for_each_code_point<F>(&self, byte_index: usize, visitor: F) -> Result<()>
    where
        F: FnMut(char, usize) -> ControlFlow<()>,
    {
        let mut visitor = visitor;
        let mut code_points = self.code_points_at(byte_index);
        for (ch, width) in code_points.by_ref() {
            if visitor(ch, width).is_break() {
                return Ok(());
            }
        }

        match code_points.error() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

//===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RopeBuilder;

    const TEXT: &str = "Hello みんなさん! 👋🏽 Ünïcödé ok";

    /// Builds a byte rope with many tiny leaves, so that most multi-byte
    /// code points straddle a leaf boundary.
    fn fragmented(text: &[u8], step: usize) -> Rope<u8> {
        let mut rope = Rope::new();
        for chunk in text.chunks(step) {
            rope = rope.concat(&Rope::from_slice(chunk));
        }
        rope
    }

    fn decode_all(rope: &Rope<u8>, byte_index: usize) -> (String, Vec<usize>) {
        let mut text = String::new();
        let mut widths = Vec::new();
        for (ch, width) in rope.code_points_at(byte_index) {
            text.push(ch);
            widths.push(width);
        }
        (text, widths)
    }

    #[test]
    fn decode_front_01() {
        assert_eq!(decode_front(b""), Decoded::Empty);
        assert_eq!(decode_front(b"a"), Decoded::CodePoint('a', 1));
        assert_eq!(decode_front("ñx".as_bytes()), Decoded::CodePoint('ñ', 2));
        assert_eq!(decode_front(&"😀".as_bytes()[..3]), Decoded::Incomplete);
        assert_eq!(decode_front(&[0x80]), Decoded::Invalid);
        assert_eq!(decode_front(&[0xE2, 0x28, 0xA1]), Decoded::Invalid);
        assert_eq!(decode_front(&[0xC0, 0x80]), Decoded::Invalid);
    }

    #[test]
    fn code_points_01() {
        let rope: Rope<u8> = Rope::from(TEXT);
        let (text, widths) = decode_all(&rope, 0);

        assert_eq!(text, TEXT);
        assert_eq!(widths.iter().sum::<usize>(), TEXT.len());
        assert_eq!(widths.len(), TEXT.chars().count());
    }

    #[test]
    fn code_points_02() {
        // Code points split over leaf boundaries, at every possible point.
        for step in 1..=5 {
            let rope = fragmented(TEXT.as_bytes(), step);
            let mut iter = rope.code_points();
            let text: String = iter.by_ref().map(|(ch, _)| ch).collect();

            assert_eq!(text, TEXT);
            assert_eq!(iter.error(), None);
            assert_eq!(iter.byte_index(), TEXT.len());
        }
    }

    #[test]
    fn code_points_03() {
        // Single byte leaves, built by hand.
        let mut builder = RopeBuilder::new();
        for byte in "€😀".bytes() {
            builder.append(&[byte]);
        }
        let rope = fragmented(&builder.finish().to_vec(), 1);

        let decoded: Vec<(char, usize)> = rope.code_points().collect();
        assert_eq!(decoded, [('€', 3), ('😀', 4)]);
    }

    #[test]
    fn code_points_04() {
        let rope: Rope<u8> = Rope::from(TEXT);
        let start = "Hello ".len();
        let (text, _) = decode_all(&rope, start);
        assert_eq!(text, &TEXT[start..]);
    }

    #[test]
    fn code_points_05() {
        // Starting in the middle of a code point is malformed.
        let rope: Rope<u8> = Rope::from("みんな");
        let mut iter = rope.code_points_at(1);

        assert_eq!(iter.next(), None);
        assert!(matches!(iter.error(), Some(Error::MalformedUtf8(1))));
    }

    #[test]
    fn code_points_06() {
        // Invalid byte in the middle: everything before it is decoded.
        let rope = fragmented(&[b'a', 0xC3, 0xB1, 0xFF, b'b'], 2);
        let mut iter = rope.code_points();

        assert_eq!(iter.next(), Some(('a', 1)));
        assert_eq!(iter.next(), Some(('ñ', 2)));
        assert_eq!(iter.next(), None);
        assert_eq!(iter.next(), None);
        assert!(matches!(iter.error(), Some(Error::MalformedUtf8(3))));
    }

    #[test]
    fn code_points_07() {
        // Truncated sequence at the end of the rope.
        let bytes = "ab😀".as_bytes();
        let rope = fragmented(&bytes[..bytes.len() - 1], 3);
        let mut iter = rope.code_points();
        let text: String = iter.by_ref().map(|(ch, _)| ch).collect();

        assert_eq!(text, "ab");
        assert!(matches!(iter.error(), Some(Error::MalformedUtf8(2))));
    }

    #[test]
    fn code_points_08() {
        let empty: Rope<u8> = Rope::new();
        let mut iter = empty.code_points();
        assert_eq!(iter.next(), None);
        assert!(iter.error().is_none());

        let rope: Rope<u8> = Rope::from("abc");
        let mut iter = rope.code_points_at(10);
        assert_eq!(iter.next(), None);
        assert!(iter.error().is_none());
    }

    #[test]
    fn for_each_code_point_01() {
        let rope = fragmented(TEXT.as_bytes(), 3);
        let mut text = String::new();
        let result = rope.for_each_code_point(0, |ch, _| {
            text.push(ch);
            ControlFlow::Continue(())
        });

        assert!(result.is_ok());
        assert_eq!(text, TEXT);
    }

    #[test]
    fn for_each_code_point_02() {
        // Stopping early is not an error, even before bad data.
        let rope = Rope::<u8>::from("abc").insert(3, &[0xFF]);
        let mut count = 0;
        let result = rope.for_each_code_point(0, |_, _| {
            count += 1;
            if count == 2 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        assert!(result.is_ok());
        assert_eq!(count, 2);
    }

    #[test]
    fn for_each_code_point_03() {
        let rope = fragmented("añ".as_bytes(), 1).insert(1, &[0xE2, 0x82]);
        let mut text = String::new();
        let result = rope.for_each_code_point(0, |ch, _| {
            text.push(ch);
            ControlFlow::Continue(())
        });

        assert_eq!(text, "a");
        assert!(matches!(result, Err(Error::MalformedUtf8(1))));
    }
}
