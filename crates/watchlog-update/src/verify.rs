//! Downloaded-package verification: size first, then checksum.
//!
//! The size check gates the hash: an unreadable file or a byte-count
//! mismatch fails immediately and the content is never hashed. When the
//! descriptor carries no checksum the package is accepted on size alone.

use std::{
  fs::File,
  io::{BufReader, Read},
  path::Path,
};

use sha2::{Digest, Sha256};
use thiserror::Error;

const HASH_CHUNK: usize = 64 * 1024;

/// Why a downloaded package was rejected. Always recoverable by
/// re-downloading.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
  #[error("package unreadable: {0}")]
  Unreadable(String),

  #[error("size mismatch: file is {actual} bytes, descriptor says {expected}")]
  SizeMismatch { actual: u64, expected: u64 },

  #[error("checksum mismatch: file hashes to {actual}, descriptor says {expected}")]
  ChecksumMismatch { actual: String, expected: String },
}

/// Verify a downloaded package against the descriptor's size and optional
/// SHA-256. The checksum comparison trims whitespace and ignores hex case.
pub fn verify_package(
  path: &Path,
  expected_size: u64,
  expected_sha256: Option<&str>,
) -> Result<(), VerifyError> {
  let metadata = std::fs::metadata(path)
    .map_err(|e| VerifyError::Unreadable(e.to_string()))?;
  let actual = metadata.len();
  if actual != expected_size {
    return Err(VerifyError::SizeMismatch { actual, expected: expected_size });
  }

  let Some(expected) = expected_sha256 else {
    return Ok(());
  };

  let file =
    File::open(path).map_err(|e| VerifyError::Unreadable(e.to_string()))?;
  let mut reader = BufReader::new(file);
  let mut hasher = Sha256::new();
  let mut chunk = vec![0u8; HASH_CHUNK];
  loop {
    let n = reader
      .read(&mut chunk)
      .map_err(|e| VerifyError::Unreadable(e.to_string()))?;
    if n == 0 {
      break;
    }
    hasher.update(&chunk[..n]);
  }

  let actual_hex = hex::encode(hasher.finalize());
  let expected = expected.trim();
  if !actual_hex.eq_ignore_ascii_case(expected) {
    return Err(VerifyError::ChecksumMismatch {
      actual:   actual_hex,
      expected: expected.to_owned(),
    });
  }
  Ok(())
}

#[cfg(test)]
mod tests {
  use std::io::Write;

  use super::*;

  fn package(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(bytes).expect("write package");
    file
  }

  fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
  }

  #[test]
  fn size_mismatch_fails_before_any_hash() {
    let file = package(&[0u8; 999]);
    // An impossible checksum: if the hash were computed the error kind
    // would differ.
    let err =
      verify_package(file.path(), 1000, Some("not-a-hash")).unwrap_err();
    assert_eq!(err, VerifyError::SizeMismatch { actual: 999, expected: 1000 });
  }

  #[test]
  fn checksum_mismatch_with_matching_size() {
    let file = package(&[7u8; 1000]);
    let wrong = sha256_hex(b"something else");
    let err = verify_package(file.path(), 1000, Some(&wrong)).unwrap_err();
    assert!(matches!(err, VerifyError::ChecksumMismatch { .. }));
  }

  #[test]
  fn matching_size_and_checksum_passes() {
    let bytes = vec![42u8; 1000];
    let file = package(&bytes);
    let sum = sha256_hex(&bytes);
    verify_package(file.path(), 1000, Some(&sum)).unwrap();
  }

  #[test]
  fn checksum_comparison_trims_and_ignores_case() {
    let bytes = b"package contents";
    let file = package(bytes);
    let sum = format!("  {}  ", sha256_hex(bytes).to_uppercase());
    verify_package(file.path(), bytes.len() as u64, Some(&sum)).unwrap();
  }

  #[test]
  fn absent_checksum_accepts_on_size_alone() {
    let file = package(&[0u8; 500]);
    verify_package(file.path(), 500, None).unwrap();
  }

  #[test]
  fn missing_file_is_unreadable() {
    let err = verify_package(Path::new("/nonexistent/app.apk"), 1, None)
      .unwrap_err();
    assert!(matches!(err, VerifyError::Unreadable(_)));
  }
}
