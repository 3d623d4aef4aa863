use subtle::ConstantTimeEq;

/// Check a supplied admin key against the configured one.
///
/// The comparison runs in constant time for equal-length inputs so the key
/// cannot be recovered byte by byte from response timing. An empty supplied
/// key is never authorized, whatever the configuration says.
pub fn is_authorized(supplied: &str, configured: &str) -> bool {
    if supplied.is_empty() || configured.is_empty() {
        return false;
    }

    supplied.as_bytes().ct_eq(configured.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_authorized_valid() {
        assert!(is_authorized("test-key", "test-key"));
    }

    #[test]
    fn test_is_authorized_invalid() {
        assert!(!is_authorized("wrong-key", "test-key"));
    }

    #[test]
    fn test_is_authorized_different_length() {
        assert!(!is_authorized("short", "much-longer-key"));
        assert!(!is_authorized("test-key-and-more", "test-key"));
    }

    #[test]
    fn test_is_authorized_empty() {
        assert!(!is_authorized("", "test-key"));
        assert!(!is_authorized("", ""));
    }

    #[test]
    fn test_is_authorized_case_sensitive() {
        assert!(!is_authorized("Test-Key", "test-key"));
    }

    #[test]
    fn test_is_authorized_special_chars() {
        assert!(is_authorized("AKATHON_ADMIN_$/&?", "AKATHON_ADMIN_$/&?"));
    }
}
