use xxhash_rust::xxh3::xxh3_128;

/// Compute the content hash used for change detection.
///
/// hash = lowercase hex of xxh3-128(bytes), always 32 characters.
///
/// The digest is not cryptographic; it only gates reindexing, so speed and a
/// stable textual form are what matter.
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:032x}", xxh3_128(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deterministic_hash() {
        let h1 = content_hash(b"fn main() {}");
        let h2 = content_hash(b"fn main() {}");
        assert_eq!(h1, h2);
    }

    #[test]
    fn test_hash_length() {
        assert_eq!(content_hash(b"").len(), 32);
        assert_eq!(content_hash(b"x").len(), 32);
    }

    #[test]
    fn test_hash_changes_with_content() {
        assert_ne!(content_hash(b"a"), content_hash(b"b"));
    }

    #[test]
    fn test_hash_is_lowercase_hex() {
        let h = content_hash(b"some file contents\n");
        assert!(h.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }
}
