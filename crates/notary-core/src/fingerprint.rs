//! Content fingerprinting.
//!
//! A fingerprint is SHA-256 over the complete byte content, encoded as 64
//! lowercase hex characters. It is:
//! - deterministic (no salt, no clock, no hidden state)
//! - independent of how the bytes were chunked when streamed
//!
//! The only failure mode is failing to read the input in the first place.

use std::io::Read;

use sha2::{Digest, Sha256};

use crate::errors::{NotaryError, NotaryResult};
use crate::model::Fingerprint;

const READ_CHUNK: usize = 64 * 1024;

/// Fingerprint bytes already in memory.
pub fn fingerprint(bytes: &[u8]) -> Fingerprint {
    let mut h = Sha256::new();
    h.update(bytes);
    Fingerprint::from_digest(&h.finalize())
}

/// Fingerprint a stream read to EOF.
pub fn fingerprint_reader<R: Read>(reader: R) -> NotaryResult<Fingerprint> {
    hash_stream(reader, None)
}

/// Like [`fingerprint_reader`], but fails once more than `max_bytes` are seen.
pub fn fingerprint_reader_limited<R: Read>(reader: R, max_bytes: u64) -> NotaryResult<Fingerprint> {
    hash_stream(reader, Some(max_bytes))
}

fn hash_stream<R: Read>(mut reader: R, limit: Option<u64>) -> NotaryResult<Fingerprint> {
    let mut h = Sha256::new();
    let mut buf = vec![0u8; READ_CHUNK];
    let mut total: u64 = 0;

    loop {
        let n = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(NotaryError::input_read(e.to_string())),
        };
        total += n as u64;
        if let Some(max) = limit {
            if total > max {
                return Err(NotaryError::input_read(format!(
                    "input exceeds limit of {max} bytes"
                )));
            }
        }
        h.update(&buf[..n]);
    }

    Ok(Fingerprint::from_digest(&h.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const EMPTY_SHA256: &str = "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855";

    struct FailingReader {
        served: bool,
    }

    impl Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.served {
                self.served = true;
                buf[0] = b'x';
                return Ok(1);
            }
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "truncated"))
        }
    }

    #[test]
    fn empty_input_matches_known_vector() {
        assert_eq!(fingerprint(b"").as_str(), EMPTY_SHA256);
    }

    #[test]
    fn abc_matches_known_vector() {
        assert_eq!(
            fingerprint(b"abc").as_str(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn different_content_differs() {
        assert_ne!(fingerprint(b"contract v1"), fingerprint(b"contract v2"));
    }

    #[test]
    fn truncated_stream_is_input_read_error() {
        let err = fingerprint_reader(FailingReader { served: false }).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::InputRead);
    }

    #[test]
    fn limit_is_enforced() {
        let data = vec![7u8; 1024];
        assert!(fingerprint_reader_limited(&data[..], 1024).is_ok());
        let err = fingerprint_reader_limited(&data[..], 1023).unwrap_err();
        assert_eq!(err.kind(), crate::errors::ErrorKind::InputRead);
    }

    proptest! {
        #[test]
        fn streaming_matches_in_memory(data in proptest::collection::vec(any::<u8>(), 0..70_000)) {
            let streamed = fingerprint_reader(&data[..]).unwrap();
            prop_assert_eq!(streamed, fingerprint(&data));
        }

        #[test]
        fn fingerprint_is_deterministic(data in proptest::collection::vec(any::<u8>(), 0..4096)) {
            let f = fingerprint(&data);
            prop_assert_eq!(f.as_str().len(), 64);
            prop_assert_eq!(f, fingerprint(&data));
        }
    }
}
