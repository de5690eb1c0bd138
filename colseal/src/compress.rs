//! Optional zstd compression applied to the inner plaintext before sealing.
//!
//! The compressor is an explicitly owned instance held by the cipher engine,
//! not process-wide state. Decompression is bounded to block
//! decompression-bomb inputs.

use crate::error::Error;
use std::io::Read;

/// Hard upper bound on decompressed inner-plaintext size.
pub const MAX_PLAINTEXT_LEN: usize = 16 * 1024 * 1024;

/// Compression is used only when it shrinks the input by at least this many
/// percent; otherwise the payload is sealed untransformed.
const MIN_SAVINGS_PERCENT: usize = 10;

/// Compression behavior for sealing. Opening always honors whatever flag the
/// ciphertext carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionMode {
    /// Never compress (default)
    #[default]
    Off,
    /// Compress with zstd when it meets the savings threshold
    Zstd,
}

/// Owned zstd compressor instance.
#[derive(Debug, Clone)]
pub struct Compressor {
    level: i32,
}

impl Default for Compressor {
    fn default() -> Self {
        Self { level: 3 }
    }
}

impl Compressor {
    /// Creates a compressor with the given zstd level.
    #[must_use]
    pub const fn new(level: i32) -> Self {
        Self { level }
    }

    /// Compresses `data`, returning `None` when compression is not worth it.
    ///
    /// `None` means the caller must seal the original bytes with the
    /// no-transform flag: either the codec failed (never fatal for sealing)
    /// or the output did not meet the savings threshold.
    #[must_use]
    pub fn compress(&self, data: &[u8]) -> Option<Vec<u8>> {
        let compressed = zstd::stream::encode_all(data, self.level).ok()?;

        // Worth using only if it saves at least MIN_SAVINGS_PERCENT
        let threshold = data.len().saturating_sub(data.len() * MIN_SAVINGS_PERCENT / 100);
        if compressed.len() <= threshold && !data.is_empty() {
            Some(compressed)
        } else {
            None
        }
    }

    /// Decompresses `data`, refusing to expand beyond `max_len` bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::DecompressionFailed` if the stream is malformed or
    /// the decompressed output would exceed `max_len`.
    pub fn decompress(&self, data: &[u8], max_len: usize) -> Result<Vec<u8>, Error> {
        let decoder = zstd::stream::read::Decoder::new(data)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;

        let mut output = Vec::new();
        // Read one byte past the bound so an oversized stream is detectable
        let limit = max_len as u64 + 1;
        decoder
            .take(limit)
            .read_to_end(&mut output)
            .map_err(|e| Error::DecompressionFailed(e.to_string()))?;

        if output.len() > max_len {
            return Err(Error::DecompressionFailed(format!(
                "decompressed size exceeds {max_len} bytes"
            )));
        }

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_round_trip() {
        let compressor = Compressor::default();
        let data = vec![b'a'; 4096];

        let compressed = compressor.compress(&data).expect("highly redundant data compresses");
        assert!(compressed.len() < data.len());

        let restored = compressor.decompress(&compressed, MAX_PLAINTEXT_LEN).unwrap();
        assert_eq!(restored, data);
    }

    #[test]
    fn test_incompressible_data_skipped() {
        let compressor = Compressor::default();
        // Short high-entropy-looking input: zstd framing overhead dominates
        let data: Vec<u8> = (0..=255u8).collect();

        assert!(compressor.compress(&data).is_none());
    }

    #[test]
    fn test_empty_input_skipped() {
        let compressor = Compressor::default();
        assert!(compressor.compress(&[]).is_none());
    }

    #[test]
    fn test_decompress_garbage_fails() {
        let compressor = Compressor::default();
        let result = compressor.decompress(b"not a zstd stream", MAX_PLAINTEXT_LEN);

        assert!(matches!(result, Err(Error::DecompressionFailed(_))));
    }

    #[test]
    fn test_decompress_bound_enforced() {
        let compressor = Compressor::default();
        let data = vec![0u8; 10_000];
        let compressed = compressor.compress(&data).expect("zeros compress");

        // A bound below the real size must be rejected, not truncated
        let result = compressor.decompress(&compressed, 1024);
        assert!(matches!(result, Err(Error::DecompressionFailed(_))));

        // And a sufficient bound restores the data
        let restored = compressor.decompress(&compressed, 10_000).unwrap();
        assert_eq!(restored.len(), 10_000);
    }
}
