//! # Resource Matching
//!
//! Shell-style glob matching of database ids against stored patterns.
//!
//! - `*` matches any sequence of zero or more characters
//! - `?` matches exactly one character
//! - every other character matches itself (case-sensitive)
//!
//! There is no escaping and no special treatment of path separators.

/// Check if a database id matches a pattern.
///
/// Matching works on characters, not bytes, so `?` consumes one whole
/// multi-byte character. Runs in `O(candidate * pattern)` worst case
/// with constant extra memory beyond the decoded inputs.
///
/// # Example
///
/// ```
/// use dataware_rbac::matcher::matches;
///
/// assert!(matches("testpostfix123", "testpostfix*"));
/// assert!(matches("test1single", "test?single"));
/// assert!(!matches("testsingle", "test?single"));
/// ```
pub fn matches(candidate: &str, pattern: &str) -> bool {
    if pattern == "*" {
        return true;
    }

    let pattern: Vec<char> = pattern.chars().collect();
    let value: Vec<char> = candidate.chars().collect();

    let (mut p_idx, mut v_idx) = (0usize, 0usize);
    // Position of the last `*` seen and the value index it is currently
    // absorbing up to.
    let (mut star_idx, mut match_idx) = (None, 0usize);

    while v_idx < value.len() {
        if p_idx < pattern.len() && pattern[p_idx] == '*' {
            star_idx = Some(p_idx);
            match_idx = v_idx;
            p_idx += 1;
            continue;
        }

        if p_idx < pattern.len() && (pattern[p_idx] == '?' || pattern[p_idx] == value[v_idx]) {
            p_idx += 1;
            v_idx += 1;
            continue;
        }

        if let Some(star) = star_idx {
            // Let the last star swallow one more character and retry.
            p_idx = star + 1;
            match_idx += 1;
            v_idx = match_idx;
            continue;
        }

        return false;
    }

    while p_idx < pattern.len() && pattern[p_idx] == '*' {
        p_idx += 1;
    }

    p_idx == pattern.len()
}

/// Check if a database id matches at least one pattern.
///
/// An empty pattern list matches nothing.
pub fn any_matches<S: AsRef<str>>(candidate: &str, patterns: &[S]) -> bool {
    patterns
        .iter()
        .any(|pattern| matches(candidate, pattern.as_ref()))
}
