use percent_encoding::{AsciiSet, NON_ALPHANUMERIC};
use std::borrow::Cow;
use std::path::{Component, Path};

/// Characters left untouched when a key is used as an archive path segment.
const SEGMENT: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'_').remove(b'.');

/// Percent-encodes `segment` so it cannot introduce separators or traversal.
pub(crate) fn encode_segment(segment: &str) -> Cow<'_, str> {
    let encoded: Cow<str> = percent_encoding::utf8_percent_encode(segment, SEGMENT).into();

    // A lone `.` or `..` survives the set above
    match encoded.as_ref() {
        "." => Cow::Borrowed("%2E"),
        ".." => Cow::Borrowed("%2E%2E"),
        _ => encoded,
    }
}

/// The final segment of a slash-separated entry name.
pub(crate) fn file_name(name: &str) -> &str {
    name.rsplit(['/', '\\']).next().unwrap_or(name)
}

/// The extension of the final segment, without the dot.
pub(crate) fn extension(name: &str) -> Option<&str> {
    let file_name = file_name(name);

    file_name
        .rfind('.')
        .filter(|&index| index > 0 && index + 1 < file_name.len())
        .map(|index| &file_name[index + 1..])
}

/// Returns `true` if `name` stays within the archive root once resolved.
pub(crate) fn is_contained(name: &str) -> bool {
    !name.is_empty()
        && Path::new(name)
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_encode_segment() {
        #[rustfmt::skip]
        let expected = [
            ("intro", "intro"),
            ("chapter-1-2", "chapter-1-2"),
            ("a%2Fb", "a/b"),
            ("%2E%2E", ".."),
            ("my%20key", "my key"),
            ("%E5%B0%81%E9%9D%A2", "封面"),
        ];

        for (expected, segment) in expected {
            assert_eq!(expected, super::encode_segment(segment));
        }
    }

    #[test]
    fn test_extension() {
        #[rustfmt::skip]
        let expected = [
            (Some("png"), "resources/cover.png"),
            (Some("txt"), "text/chapter-1.txt"),
            (None, "resources/.hidden"),
            (None, "resources/cover"),
            (None, "resources/cover."),
            (Some("gz"), "a.tar.gz"),
        ];

        for (expected, name) in expected {
            assert_eq!(expected, super::extension(name));
        }
    }

    #[test]
    fn test_is_contained() {
        assert!(super::is_contained("text/chapter-1.txt"));
        assert!(super::is_contained("./book.xml"));
        assert!(!super::is_contained("../book.xml"));
        assert!(!super::is_contained("text/../../book.xml"));
        assert!(!super::is_contained("/etc/passwd"));
        assert!(!super::is_contained(""));
    }
}
