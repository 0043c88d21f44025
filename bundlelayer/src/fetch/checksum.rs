//! SHA-256 checksums for payload verification.

use sha2::{Digest, Sha256};

use super::error::{FetchError, FetchResult};

/// Lowercase hexadecimal SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Verify that a fetched payload matches the expected size and checksum.
///
/// Size is compared first since it is free; the digest is only computed
/// when the size matches.
pub fn verify_payload(
    name: &str,
    data: &[u8],
    expected_checksum: &str,
    expected_size: u64,
) -> FetchResult<()> {
    let actual_size = data.len() as u64;
    if actual_size != expected_size {
        return Err(FetchError::SizeMismatch {
            name: name.to_string(),
            expected: expected_size,
            actual: actual_size,
        });
    }

    let actual = sha256_hex(data);
    if actual != expected_checksum {
        return Err(FetchError::ChecksumMismatch {
            name: name.to_string(),
            expected: expected_checksum.to_string(),
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const HELLO_WORLD_SHA256: &str =
        "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9";

    #[test]
    fn test_sha256_hex() {
        assert_eq!(sha256_hex(b"hello world"), HELLO_WORLD_SHA256);
    }

    #[test]
    fn test_sha256_empty() {
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_verify_payload_match() {
        assert!(verify_payload("hello", b"hello world", HELLO_WORLD_SHA256, 11).is_ok());
    }

    #[test]
    fn test_verify_payload_size_mismatch() {
        let result = verify_payload("hello", b"hello world", HELLO_WORLD_SHA256, 12);
        assert!(matches!(
            result,
            Err(FetchError::SizeMismatch {
                expected: 12,
                actual: 11,
                ..
            })
        ));
    }

    #[test]
    fn test_verify_payload_checksum_mismatch() {
        let result = verify_payload("hello", b"hello world", "wrong_checksum", 11);
        match result {
            Err(FetchError::ChecksumMismatch { name, actual, .. }) => {
                assert_eq!(name, "hello");
                assert_eq!(actual, HELLO_WORLD_SHA256);
            }
            other => panic!("Expected ChecksumMismatch error, got {:?}", other),
        }
    }
}
