//! Repository and branch name validation.
//!
//! Both kinds of name become a single segment of a storage key, so the rules
//! are strict:
//! - Must be non-empty and at most [`MAX_NAME_LEN`] bytes
//! - Must not contain `/`, whitespace, control characters, or `~^:?*[\`
//! - Must not start with `.` or `-`
//! - Must not end with `.lock`

use crate::error::{IndexError, IndexResult};

/// Longest accepted name, in bytes.
pub const MAX_NAME_LEN: usize = 255;

/// Characters that are forbidden anywhere in a name.
const FORBIDDEN_CHARS: &[char] = &['/', '~', '^', ':', '?', '*', '[', '\\'];

/// Validate a branch name.
///
/// ```
/// use lake_index::names::validate_branch_name;
///
/// assert!(validate_branch_name("main").is_ok());
/// assert!(validate_branch_name("feature-1").is_ok());
/// assert!(validate_branch_name("").is_err());
/// assert!(validate_branch_name("feature/auth").is_err());
/// ```
pub fn validate_branch_name(name: &str) -> IndexResult<()> {
    validate("branch", name)
}

/// Validate a repository id. Same rules as branch names.
pub fn validate_repo_id(id: &str) -> IndexResult<()> {
    validate("repository", id)
}

fn validate(kind: &str, name: &str) -> IndexResult<()> {
    let reject = |reason: String| Err(IndexError::invalid(format!("{kind} name {name:?}: {reason}")));

    if name.is_empty() {
        return reject("must not be empty".into());
    }
    if name.len() > MAX_NAME_LEN {
        return reject(format!("longer than {MAX_NAME_LEN} bytes"));
    }
    if let Some(ch) = name
        .chars()
        .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_CHARS.contains(c))
    {
        return reject(format!("contains forbidden character {ch:?}"));
    }
    if name.starts_with('.') || name.starts_with('-') {
        return reject("must not start with '.' or '-'".into());
    }
    if name.ends_with(".lock") {
        return reject("must not end with '.lock'".into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_names() {
        for name in ["main", "master", "dev-2024", "release_1.0", "v1.2.3"] {
            assert!(validate_branch_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_key_separators_and_whitespace() {
        for name in ["a/b", "a b", "tab\there", "line\n", "nul\0"] {
            assert!(validate_branch_name(name).is_err(), "{name:?} should be invalid");
        }
    }

    #[test]
    fn rejects_leading_dot_or_dash() {
        assert!(validate_repo_id(".hidden").is_err());
        assert!(validate_repo_id("-flag").is_err());
    }

    #[test]
    fn rejects_lock_suffix() {
        assert!(validate_branch_name("main.lock").is_err());
    }

    #[test]
    fn rejects_overlong_names() {
        let long = "a".repeat(MAX_NAME_LEN + 1);
        assert!(validate_repo_id(&long).is_err());
        assert!(validate_repo_id(&"a".repeat(MAX_NAME_LEN)).is_ok());
    }

    #[test]
    fn error_mentions_kind() {
        let err = validate_repo_id("").unwrap_err();
        assert!(err.to_string().contains("repository"));
    }
}
