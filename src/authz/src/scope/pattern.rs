//! Wildcard comparison primitives
//!
//! A scope ending in `*` denotes every string that shares its prefix (the
//! `*` stripped). Any other scope, including the empty string, denotes only
//! itself.

/// Wildcard suffix marking a scope as a pattern
pub const WILDCARD: char = '*';

/// Returns the prefix of a pattern scope, or `None` for a literal
pub(crate) fn pattern_prefix(scope: &str) -> Option<&str> {
    scope.strip_suffix(WILDCARD)
}

/// Returns true if `scope` ends in `*`
pub fn is_pattern(scope: &str) -> bool {
    scope.ends_with(WILDCARD)
}

/// Checks whether `pattern` covers `scope`
///
/// True if the two are equal, or `pattern` ends in `*` and `scope` starts
/// with the pattern's prefix.
///
/// # Examples
///
/// ```
/// use taskauth_authz::scope::matches;
///
/// assert!(matches("queue:*", "queue:create-task"));
/// assert!(matches("queue:*", "queue:*"));
/// assert!(!matches("queue:create-task", "queue:*"));
/// ```
pub fn matches(pattern: &str, scope: &str) -> bool {
    if pattern == scope {
        return true;
    }

    match pattern_prefix(pattern) {
        Some(prefix) => scope.starts_with(prefix),
        None => false,
    }
}

/// Checks whether the string sets denoted by `p1` and `p2` intersect
///
/// This is the one primitive used everywhere two wildcard strings are
/// compared. It is symmetric.
///
/// # Examples
///
/// ```
/// use taskauth_authz::scope::overlap;
///
/// assert!(overlap("assume:*", "assume:repo:x"));
/// assert!(overlap("ab*", "a*"));
/// assert!(!overlap("assume:ab*", "assume:ac*"));
/// ```
pub fn overlap(p1: &str, p2: &str) -> bool {
    match (pattern_prefix(p1), pattern_prefix(p2)) {
        (None, None) => p1 == p2,
        (Some(prefix), None) => p2.starts_with(prefix),
        (None, Some(prefix)) => p1.starts_with(prefix),
        (Some(a), Some(b)) => a.starts_with(b) || b.starts_with(a),
    }
}

/// Picks the narrower of two overlapping scopes
///
/// A literal always wins over a pattern. Between two patterns the one with
/// the longer prefix wins, since overlap guarantees one prefix extends the
/// other.
pub(crate) fn more_specific<'a>(a: &'a str, b: &'a str) -> &'a str {
    match (pattern_prefix(a), pattern_prefix(b)) {
        (None, _) => a,
        (Some(_), None) => b,
        (Some(pa), Some(pb)) => {
            if pa.len() >= pb.len() {
                a
            } else {
                b
            }
        }
    }
}
