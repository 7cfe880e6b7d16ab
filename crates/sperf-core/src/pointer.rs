//! JSON Pointer (RFC 6901) helpers.
//!
//! Schema nodes are addressed by a pointer into their document; instance
//! validation failures are reported by a pointer into the validated value.
//! Both use the same escaping rules.

/// Escape a single reference token (`~` → `~0`, `/` → `~1`).
pub fn escape_segment(segment: &str) -> String {
    segment.replace('~', "~0").replace('/', "~1")
}

/// Reverse [`escape_segment`].
pub fn unescape_segment(segment: &str) -> String {
    segment.replace("~1", "/").replace("~0", "~")
}

/// Append one unescaped segment to a pointer.
pub fn push(pointer: &str, segment: &str) -> String {
    format!("{pointer}/{}", escape_segment(segment))
}

/// Append an array index to a pointer.
pub fn push_index(pointer: &str, index: usize) -> String {
    format!("{pointer}/{index}")
}

/// Split a pointer into unescaped segments. The empty pointer has none.
pub fn segments(pointer: &str) -> Vec<String> {
    if pointer.is_empty() {
        return Vec::new();
    }
    pointer
        .strip_prefix('/')
        .unwrap_or(pointer)
        .split('/')
        .map(unescape_segment)
        .collect()
}

/// Render a document pointer as a local `$ref`-style location (`#/a/b`).
pub fn to_fragment(pointer: &str) -> String {
    format!("#{pointer}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_roundtrip() {
        assert_eq!(escape_segment("a/b~c"), "a~1b~0c");
        assert_eq!(unescape_segment("a~1b~0c"), "a/b~c");
    }

    #[test]
    fn test_unescape_order() {
        // "~01" is an escaped "~1", not "/".
        assert_eq!(unescape_segment("~01"), "~1");
    }

    #[test]
    fn test_push_and_segments() {
        let p = push(&push("", "definitions"), "a/b");
        assert_eq!(p, "/definitions/a~1b");
        assert_eq!(segments(&p), vec!["definitions", "a/b"]);
        assert_eq!(push_index(&p, 3), "/definitions/a~1b/3");
        assert!(segments("").is_empty());
    }

    #[test]
    fn test_empty_key_segments() {
        assert_eq!(segments("/"), vec![""]);
        assert_eq!(segments("//a"), vec!["", "a"]);
    }

    #[test]
    fn test_to_fragment() {
        assert_eq!(to_fragment(""), "#");
        assert_eq!(to_fragment("/definitions/A"), "#/definitions/A");
    }
}
