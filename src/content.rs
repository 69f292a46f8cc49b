//! Versioned content: the text buffer plus the generation counter that lets
//! asynchronous results be checked for staleness.

use std::fmt;
use std::sync::Arc;

use crate::error::{IrodoriError, IrodoriResult};
use crate::text::{Edit, Span, utf16_len, utf16_to_byte};

/// Content generation. Every mutation produces a strictly greater version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version(u64);

impl Version {
    pub const INITIAL: Version = Version(0);

    pub const fn new(value: u64) -> Self {
        Version(value)
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn next(self) -> Self {
        Version(self.0 + 1)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Immutable view of the content at one version.
///
/// Cheap to clone; asynchronous computations carry one so they work against
/// the text they were asked about even if the buffer moves on.
#[derive(Debug, Clone)]
pub struct ContentSnapshot {
    pub text: Arc<str>,
    pub version: Version,
    len: usize,
}

impl ContentSnapshot {
    pub fn new(text: impl Into<Arc<str>>, version: Version) -> Self {
        let text = text.into();
        let len = utf16_len(&text);
        Self { text, version, len }
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// The whole document as a span
    pub fn extent(&self) -> Span {
        Span::new(0, self.len)
    }
}

/// In-memory text buffer whose every mutation bumps the version and reports
/// the corresponding [`Edit`].
#[derive(Debug, Clone)]
pub struct VersionedDocument {
    text: Arc<str>,
    version: Version,
    len: usize,
}

impl VersionedDocument {
    pub fn new(text: impl Into<Arc<str>>) -> Self {
        let text = text.into();
        let len = utf16_len(&text);
        Self {
            text,
            version: Version::INITIAL,
            len,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// Length in UTF-16 code units
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn snapshot(&self) -> ContentSnapshot {
        ContentSnapshot {
            text: Arc::clone(&self.text),
            version: self.version,
            len: self.len,
        }
    }

    /// Replace the text in `range` (UTF-16 units) with `replacement`.
    pub fn replace(&mut self, range: Span, replacement: &str) -> IrodoriResult<Edit> {
        let out_of_bounds = || IrodoriError::OutOfBounds {
            start: range.start,
            end: range.end(),
            length: self.len,
        };
        let start = utf16_to_byte(&self.text, range.start).ok_or_else(out_of_bounds)?;
        let end = utf16_to_byte(&self.text, range.end()).ok_or_else(out_of_bounds)?;

        let mut text = String::with_capacity(self.text.len() - (end - start) + replacement.len());
        text.push_str(&self.text[..start]);
        text.push_str(replacement);
        text.push_str(&self.text[end..]);

        let edit = Edit::replacement(range, utf16_len(replacement));
        self.text = text.into();
        self.len = self.len.saturating_add_signed(edit.delta);
        self.version = self.version.next();
        Ok(edit)
    }

    pub fn insert(&mut self, at: usize, text: &str) -> IrodoriResult<Edit> {
        self.replace(Span::point(at), text)
    }

    pub fn delete(&mut self, range: Span) -> IrodoriResult<Edit> {
        self.replace(range, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_at_end_bumps_version_by_one() {
        let mut doc = VersionedDocument::new("abc");
        let before = doc.version();

        let edit = doc.insert(3, "d").unwrap();

        assert_eq!(doc.text(), "abcd");
        assert_eq!(doc.version(), before.next());
        assert_eq!(edit, Edit::insertion(3, 1));
        assert_eq!(doc.len(), 4);
    }

    #[test]
    fn test_delete_middle() {
        let mut doc = VersionedDocument::new("abc");
        let edit = doc.delete(Span::from(1..2)).unwrap();
        assert_eq!(doc.text(), "ac");
        assert_eq!(edit.range, Span::from(1..2));
        assert_eq!(edit.delta, -1);
    }

    #[test]
    fn test_replace_counts_utf16_units() {
        let mut doc = VersionedDocument::new("a😀b");
        assert_eq!(doc.len(), 4);

        let edit = doc.replace(Span::from(1..3), "xyz").unwrap();
        assert_eq!(doc.text(), "axyzb");
        assert_eq!(edit.delta, 1);
        assert_eq!(doc.len(), 5);
    }

    #[test]
    fn test_out_of_bounds_edit_is_rejected_without_version_bump() {
        let mut doc = VersionedDocument::new("abc");
        let result = doc.insert(10, "x");
        assert!(matches!(result, Err(IrodoriError::OutOfBounds { .. })));
        assert_eq!(doc.version(), Version::INITIAL);
        assert_eq!(doc.text(), "abc");
    }

    #[test]
    fn test_snapshot_is_detached_from_later_edits() {
        let mut doc = VersionedDocument::new("abc");
        let snapshot = doc.snapshot();
        doc.insert(0, "zz").unwrap();

        assert_eq!(&*snapshot.text, "abc");
        assert_eq!(snapshot.version, Version::INITIAL);
        assert_eq!(snapshot.len(), 3);
        assert!(doc.version() > snapshot.version);
    }
}
