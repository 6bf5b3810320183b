//! Fixed little-endian wire types for collective exchanges.
//!
//! Every integer that crosses a rank boundary is widened to `u64` and stored
//! pre-LE, so heterogeneous builds agree on the byte layout.

use crate::mesh_error::MeshError;
use bytemuck::{Pod, Zeroable};
use static_assertions::const_assert_eq;
use std::mem::size_of;

pub fn cast_slice<T: Pod>(v: &[T]) -> &[u8] {
    bytemuck::cast_slice(v)
}

pub fn expect_exact_len(actual: usize, expected: usize) -> Result<(), String> {
    if actual == expected {
        Ok(())
    } else {
        Err(format!("expected {expected} bytes, got {actual}"))
    }
}

/// Number of bytes (or records) that follow in the next message.
#[repr(C)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireCount {
    pub n_le: u64,
}

impl WireCount {
    pub fn new(n: usize) -> Self {
        Self {
            n_le: (n as u64).to_le(),
        }
    }
    pub fn get(&self) -> usize {
        u64::from_le(self.n_le) as usize
    }
}

/// Decode a [`WireCount`] header from a possibly unaligned buffer.
pub fn read_count(bytes: &[u8]) -> Result<usize, String> {
    expect_exact_len(bytes.len(), size_of::<WireCount>())?;
    Ok(bytemuck::pod_read_unaligned::<WireCount>(bytes).get())
}

/// One index-sized word.
#[repr(transparent)]
#[derive(Copy, Clone, Pod, Zeroable)]
pub struct WireWord(pub u64);

impl WireWord {
    pub fn of(v: usize) -> Self {
        WireWord((v as u64).to_le())
    }
    pub fn get(self) -> usize {
        u64::from_le(self.0) as usize
    }
}

const_assert_eq!(size_of::<WireCount>(), 8);
const_assert_eq!(size_of::<WireWord>(), 8);

/// Encode a slice of indices as wire bytes.
pub fn encode_words(values: &[usize]) -> Vec<u8> {
    let words: Vec<WireWord> = values.iter().map(|&v| WireWord::of(v)).collect();
    cast_slice(&words).to_vec()
}

/// Decode wire bytes produced by [`encode_words`].
pub fn decode_words(bytes: &[u8]) -> Result<Vec<usize>, MeshError> {
    if bytes.len() % size_of::<WireWord>() != 0 {
        return Err(MeshError::CommError {
            neighbor: usize::MAX,
            detail: format!(
                "payload of {} bytes is not a whole number of {}-byte words",
                bytes.len(),
                size_of::<WireWord>()
            ),
        });
    }
    // `bytes` may not be 8-aligned
    Ok(bytes
        .chunks_exact(size_of::<WireWord>())
        .map(|chunk| bytemuck::pod_read_unaligned::<WireWord>(chunk).get())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn words_survive_unaligned_buffers() {
        let bytes = encode_words(&[0, 1, 42, usize::MAX >> 1]);
        let mut shifted = vec![0u8];
        shifted.extend_from_slice(&bytes);
        assert_eq!(
            decode_words(&shifted[1..]).unwrap(),
            vec![0, 1, 42, usize::MAX >> 1]
        );
    }

    #[test]
    fn count_header_reads_back_from_bytes() {
        let header = WireCount::new(1234);
        let bytes = cast_slice(std::slice::from_ref(&header)).to_vec();
        assert_eq!(read_count(&bytes).unwrap(), 1234);
        assert!(read_count(&bytes[..4]).is_err());
    }

    #[test]
    fn ragged_payload_is_rejected() {
        assert!(decode_words(&[1, 2, 3]).is_err());
        assert!(expect_exact_len(3, 8).is_err());
    }
}
