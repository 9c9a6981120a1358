//! `file#id` reference strings.
//!
//! Scene descriptions point at nodes, materials, rigid bodies and animation
//! data with short URLs:
//!
//! - `res/box.gpb#box` - namespace or node `box` inside `res/box.gpb`
//! - `res/box.material` - the first namespace of `res/box.material`
//! - `box` - a bare identifier, local to the scene being built

use std::path::Path;

/// A split reference. Either half may be empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UrlRef<'a> {
    pub file: &'a str,
    pub id: &'a str,
}

impl<'a> UrlRef<'a> {
    pub fn parse(url: &'a str) -> Self {
        let (file, id) = split_url(url);
        Self { file, id }
    }

    /// No file: the reference is local to the scene.
    pub fn is_local(&self) -> bool {
        self.file.is_empty()
    }
}

/// Split a reference into `(file, id)`.
///
/// A string without any `.` is a bare identifier. Otherwise everything
/// before the last `#` is the file and everything after it the id; with no
/// `#` at all the whole string is the file and the id is empty.
pub fn split_url(url: &str) -> (&str, &str) {
    if !url.contains('.') {
        return ("", url);
    }
    match url.rfind('#') {
        Some(hash) => (&url[..hash], &url[hash + 1..]),
        None => (url, ""),
    }
}

/// Whether `file` names a bundle (by extension, case-insensitive).
pub fn is_bundle_file(file: &str, bundle_extension: &str) -> bool {
    Path::new(file)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(bundle_extension))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_law() {
        assert_eq!(split_url("a/b.gpb#id"), ("a/b.gpb", "id"));
        assert_eq!(split_url("a/b.gpb"), ("a/b.gpb", ""));
        assert_eq!(split_url("bareid"), ("", "bareid"));
    }

    #[test]
    fn test_split_uses_last_hash() {
        assert_eq!(split_url("dir#1/x.material#red"), ("dir#1/x.material", "red"));
        assert_eq!(split_url("x.material#"), ("x.material", ""));
    }

    #[test]
    fn test_bare_id_with_hash_is_still_bare() {
        // No '.' means no file, even when a '#' is present.
        assert_eq!(split_url("node#1"), ("", "node#1"));
    }

    #[test]
    fn test_url_ref() {
        let r = UrlRef::parse("res/box.gpb#box");
        assert_eq!(r.file, "res/box.gpb");
        assert_eq!(r.id, "box");
        assert!(!r.is_local());
        assert!(UrlRef::parse("box").is_local());
    }

    #[test]
    fn test_is_bundle_file() {
        assert!(is_bundle_file("res/box.gpb", "gpb"));
        assert!(is_bundle_file("res/BOX.GPB", "gpb"));
        assert!(!is_bundle_file("res/box.material", "gpb"));
        assert!(!is_bundle_file("gpb", "gpb"));
    }
}
