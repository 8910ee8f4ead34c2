//! Traversal-consistent path ordering.
//!
//! Children of a directory must be returned in an order such that a
//! depth-first walk emits full paths in sorted order. Raw lexicographic
//! comparison misplaces a directory `foo` relative to a sibling file
//! `foo.bar`: the directory's children (`foo/x`) would sort after the file.
//! Directory paths therefore carry a trailing separator, and the separator
//! ranks below every other character, so `foo/` (and everything under it)
//! sorts before `foo.bar`.

use std::cmp::Ordering;

/// Compares two full paths, ranking `separator` below every other character.
#[must_use]
pub fn traversal_cmp(a: &str, b: &str, separator: char) -> Ordering {
    let mut left = a.chars();
    let mut right = b.chars();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ord = rank(x, separator).cmp(&rank(y, separator));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn rank(c: char, separator: char) -> u32 {
    if c == separator { 0 } else { c as u32 + 1 }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_sorts_before_dotted_sibling() {
        // "foo/" (directory) must precede "foo.bar" (file).
        assert_eq!(traversal_cmp("/r/foo/", "/r/foo.bar", '/'), Ordering::Less);
        assert_eq!(traversal_cmp("/r/foo/x", "/r/foo.bar", '/'), Ordering::Less);
        assert_eq!(traversal_cmp("/r/abc", "/r/foo/", '/'), Ordering::Less);
    }

    #[test]
    fn emission_order_matches_depth_first() {
        let mut paths = vec!["/r/foo.bar", "/r/foo/", "/r/abc", "/r/foo/x"];
        paths.sort_by(|a, b| traversal_cmp(a, b, '/'));
        assert_eq!(paths, vec!["/r/abc", "/r/foo/", "/r/foo/x", "/r/foo.bar"]);
    }

    #[test]
    fn windows_separator() {
        assert_eq!(
            traversal_cmp("C:\\r\\foo\\", "C:\\r\\foo.bar", '\\'),
            Ordering::Less
        );
    }

    #[test]
    fn plain_ordering_is_otherwise_lexicographic() {
        assert_eq!(traversal_cmp("/a", "/b", '/'), Ordering::Less);
        assert_eq!(traversal_cmp("/b", "/a", '/'), Ordering::Greater);
        assert_eq!(traversal_cmp("/a", "/a", '/'), Ordering::Equal);
        assert_eq!(traversal_cmp("/a", "/ab", '/'), Ordering::Less);
    }
}
