//! Hierarchical key paths.
//!
//! Keys are `:`-delimited segments compared case-insensitively. Empty
//! segments are legal: `":a"` has an empty first segment and `"a:"` an empty
//! last one.

use std::cmp::Ordering;
use std::collections::HashSet;

/// Delimiter between key segments.
pub const KEY_DELIMITER: &str = ":";

/// Join path segments with the key delimiter.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::path;
///
/// assert_eq!(path::combine(["Server", "Endpoints", "0"]), "Server:Endpoints:0");
/// ```
pub fn combine<I, S>(segments: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut combined = String::new();
    for (i, segment) in segments.into_iter().enumerate() {
        if i > 0 {
            combined.push_str(KEY_DELIMITER);
        }
        combined.push_str(segment.as_ref());
    }
    combined
}

/// The last segment of a path.
pub fn section_key(path: &str) -> &str {
    match path.rfind(KEY_DELIMITER) {
        Some(index) => &path[index + KEY_DELIMITER.len()..],
        None => path,
    }
}

/// Everything before the last segment, or `None` for a top-level key.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind(KEY_DELIMITER).map(|index| &path[..index])
}

/// Normalized form used for case-insensitive key lookups.
pub fn normalize(key: &str) -> String {
    key.to_lowercase()
}

/// Case-insensitive equality of two keys.
pub fn keys_equal(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b) || normalize(a) == normalize(b)
}

/// Strip `prefix:` from `key` (case-insensitive), returning the remainder.
pub fn strip_section_prefix<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    let head_len = prefix.len() + KEY_DELIMITER.len();
    if key.len() < head_len || !key.is_char_boundary(prefix.len()) || !key.is_char_boundary(head_len) {
        return None;
    }
    let (head, rest) = key.split_at(prefix.len());
    if keys_equal(head, prefix) && rest.starts_with(KEY_DELIMITER) {
        Some(&rest[KEY_DELIMITER.len()..])
    } else {
        None
    }
}

/// Immediate child segment of `key` below `parent`, if `key` lives there.
///
/// With no parent the first segment of `key` is returned.
pub fn child_segment<'a>(key: &'a str, parent: Option<&str>) -> Option<&'a str> {
    let rest = match parent {
        None => key,
        Some(parent) => strip_section_prefix(key, parent)?,
    };
    Some(match rest.find(KEY_DELIMITER) {
        Some(index) => &rest[..index],
        None => rest,
    })
}

/// Order keys segment by segment.
///
/// Within a segment, integers compare numerically and sort before
/// non-integers; everything else compares case-insensitively.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::path;
///
/// let mut keys = vec!["b", "10", "A", "2"];
/// keys.sort_by(|a, b| path::compare_keys(a, b));
/// assert_eq!(keys, vec!["2", "10", "A", "b"]);
/// ```
pub fn compare_keys(a: &str, b: &str) -> Ordering {
    let mut left = a.split(KEY_DELIMITER);
    let mut right = b.split(KEY_DELIMITER);
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                let ordering = compare_segments(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn compare_segments(a: &str, b: &str) -> Ordering {
    match (a.parse::<u64>(), b.parse::<u64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => normalize(a).cmp(&normalize(b)),
    }
}

/// Sort keys with [`compare_keys`] and drop case-insensitive duplicates.
///
/// `"1"` and `"01"` sort as equals without being the same key, so
/// duplicates are not always adjacent; the first spelling of each key wins.
pub fn sort_and_dedup(keys: &mut Vec<String>) {
    keys.sort_by(|a, b| compare_keys(a, b));
    let mut seen = HashSet::with_capacity(keys.len());
    keys.retain(|key| seen.insert(normalize(key)));
}
