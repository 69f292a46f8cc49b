//! Conversions between UTF-16 code-unit offsets and UTF-8 byte offsets.
//!
//! The engine speaks UTF-16 (what editors report); tree-sitter speaks bytes.

/// Number of UTF-16 code units in `text`
pub fn utf16_len(text: &str) -> usize {
    text.chars().map(char::len_utf16).sum()
}

/// Convert a UTF-16 offset to a byte offset.
/// Returns None if the offset is past the end or splits a surrogate pair.
pub fn utf16_to_byte(text: &str, utf16_pos: usize) -> Option<usize> {
    let mut byte_offset = 0;
    let mut utf16_offset = 0;

    for ch in text.chars() {
        if utf16_offset == utf16_pos {
            return Some(byte_offset);
        }
        if utf16_offset > utf16_pos {
            return None;
        }
        utf16_offset += ch.len_utf16();
        byte_offset += ch.len_utf8();
    }

    (utf16_offset == utf16_pos).then_some(byte_offset)
}

/// Convert a byte offset to a UTF-16 offset.
/// Returns None if the byte offset is past the end or inside a character.
pub fn byte_to_utf16(text: &str, byte_pos: usize) -> Option<usize> {
    if byte_pos > text.len() || !text.is_char_boundary(byte_pos) {
        return None;
    }
    Some(utf16_len(&text[..byte_pos]))
}

/// Precomputed offset table for repeated conversions over one text.
///
/// Stores a checkpoint after every non-ASCII character; between checkpoints
/// one byte is one code unit, so each lookup is a binary search.
#[derive(Debug, Clone)]
pub struct OffsetIndex {
    /// (byte offset, utf16 offset) pairs, ascending in both
    checkpoints: Vec<(usize, usize)>,
    /// UTF-16 offsets that fall between the halves of a surrogate pair
    pair_interiors: Vec<usize>,
    byte_len: usize,
    utf16_len: usize,
}

impl OffsetIndex {
    pub fn new(text: &str) -> Self {
        let mut checkpoints = vec![(0, 0)];
        let mut pair_interiors = Vec::new();
        let mut byte_offset = 0;
        let mut utf16_offset = 0;

        for ch in text.chars() {
            if ch.len_utf16() == 2 {
                pair_interiors.push(utf16_offset + 1);
            }
            byte_offset += ch.len_utf8();
            utf16_offset += ch.len_utf16();
            if !ch.is_ascii() {
                checkpoints.push((byte_offset, utf16_offset));
            }
        }

        Self {
            checkpoints,
            pair_interiors,
            byte_len: byte_offset,
            utf16_len: utf16_offset,
        }
    }

    pub fn utf16_len(&self) -> usize {
        self.utf16_len
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Byte offset for a UTF-16 offset, clamped to the end of the text.
    /// An offset inside a surrogate pair maps to the start of its character.
    pub fn to_byte(&self, utf16_pos: usize) -> usize {
        let mut utf16_pos = utf16_pos.min(self.utf16_len);
        if self.pair_interiors.binary_search(&utf16_pos).is_ok() {
            utf16_pos -= 1;
        }
        let idx = self
            .checkpoints
            .partition_point(|(_, utf16)| *utf16 <= utf16_pos)
            - 1;
        let (byte, utf16) = self.checkpoints[idx];
        (byte + (utf16_pos - utf16)).min(self.byte_len)
    }

    /// UTF-16 offset for a byte offset, clamped to the end of the text.
    pub fn to_utf16(&self, byte_pos: usize) -> usize {
        let byte_pos = byte_pos.min(self.byte_len);
        let idx = self
            .checkpoints
            .partition_point(|(byte, _)| *byte <= byte_pos)
            - 1;
        let (byte, utf16) = self.checkpoints[idx];
        (utf16 + (byte_pos - byte)).min(self.utf16_len)
    }
}
