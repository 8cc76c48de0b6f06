//! LZF decompression for `binary_compressed` PCD data

use crate::error::IoError;

/// Longest output one back reference can produce from its three input bytes
const MAX_BACKREF_LEN: usize = 7 + 255 + 2;

/// Decompress an LZF stream that is expected to expand to `expected_len` bytes
pub fn decompress(input: &[u8], expected_len: usize) -> Result<Vec<u8>, IoError> {
    let bound = input.len().saturating_mul(MAX_BACKREF_LEN);
    let mut out: Vec<u8> = Vec::with_capacity(expected_len.min(bound));
    let mut i = 0;

    while i < input.len() {
        let ctrl = input[i] as usize;
        i += 1;

        if ctrl < 32 {
            // Literal run of ctrl + 1 bytes
            let len = ctrl + 1;
            let literal = input.get(i..i + len).ok_or_else(|| IoError::Decompression {
                message: format!("literal run of {} bytes overruns input at {}", len, i),
            })?;
            out.extend_from_slice(literal);
            i += len;
        } else {
            // Back reference into the output produced so far
            let mut len = ctrl >> 5;
            if len == 7 {
                len += *input.get(i).ok_or_else(|| truncated(i))? as usize;
                i += 1;
            }
            let low = *input.get(i).ok_or_else(|| truncated(i))? as usize;
            i += 1;

            let distance = ((ctrl & 0x1f) << 8) + low + 1;
            if distance > out.len() {
                return Err(IoError::Decompression {
                    message: format!(
                        "back reference {} bytes behind an output of {} bytes",
                        distance,
                        out.len()
                    ),
                });
            }
            // Copy byte by byte: source and destination may overlap
            let start = out.len() - distance;
            for k in 0..len + 2 {
                let byte = out[start + k];
                out.push(byte);
            }
        }

        if out.len() > expected_len {
            return Err(IoError::Decompression {
                message: format!("output exceeds the declared {} bytes", expected_len),
            });
        }
    }

    if out.len() != expected_len {
        return Err(IoError::Decompression {
            message: format!("expected {} bytes, decompressed {}", expected_len, out.len()),
        });
    }
    Ok(out)
}

fn truncated(at: usize) -> IoError {
    IoError::Decompression {
        message: format!("back reference truncated at {}", at),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_run() {
        let out = decompress(&[2, b'a', b'b', b'c'], 3).unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_overlapping_back_reference() {
        // "abc" followed by a 6 byte copy starting 3 bytes back
        let out = decompress(&[2, b'a', b'b', b'c', 4 << 5, 2], 9).unwrap();
        assert_eq!(out, b"abcabcabc");
    }

    #[test]
    fn test_long_back_reference() {
        // len field 7 plus an extension byte of 1: copies 7 + 1 + 2 = 10 bytes
        let out = decompress(&[0, b'z', 7 << 5, 1, 0], 11).unwrap();
        assert_eq!(out, vec![b'z'; 11]);
    }

    #[test]
    fn test_reference_before_start_is_rejected() {
        let result = decompress(&[0, b'a', 1 << 5, 5], 4);
        assert!(matches!(result, Err(IoError::Decompression { .. })));
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        assert!(decompress(&[2, b'a', b'b', b'c'], 4).is_err());
        assert!(decompress(&[2, b'a', b'b'], 3).is_err());
    }

    #[test]
    fn test_oversized_declared_length_is_rejected() {
        let result = decompress(&[2, b'a', b'b', b'c'], u32::MAX as usize);
        assert!(matches!(result, Err(IoError::Decompression { .. })));
    }
}
