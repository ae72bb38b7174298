// Copyright 2025-present BlackLab core contributors
// SPDX-License-Identifier: Apache-2.0

//! The writer's `.termvec.tmp` scratch (spec §4.1 step 2, §9 open question 2).
//!
//! Per `(field, doc)`, staging needs a map from term id to the file offset
//! where this doc's positions for that term are stored. A single flat
//! `Vec<u8>` would need to grow past 2 GB for a large enough segment — the
//! exact overflow the source's commented-out FIXME warned about (§9). We
//! address scratch bytes as `(array_index, index_in_array)` instead of one
//! flat offset, so no single allocation is ever asked to hold the whole
//! staged postings.

/// Addressable byte offset into a [`ChunkedBuffer`]: which chunk, and the
/// byte offset within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkAddr {
    pub array_index: u32,
    pub index_in_array: u32,
}

/// Append-only byte buffer split into fixed-size chunks, addressed by
/// [`ChunkAddr`] rather than one growing `Vec<u8>`.
#[derive(Debug, Clone)]
pub struct ChunkedBuffer {
    chunk_size: usize,
    chunks: Vec<Vec<u8>>,
}

impl ChunkedBuffer {
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0);
        Self { chunk_size, chunks: vec![Vec::with_capacity(chunk_size)] }
    }

    /// Append `bytes` as one contiguous run, returning the address its
    /// first byte lands at. A run larger than `chunk_size` gets its own
    /// oversized chunk rather than splitting across two (staged runs are
    /// read back as one contiguous slice by [`Self::read`]).
    pub fn append(&mut self, bytes: &[u8]) -> ChunkAddr {
        let last = self.chunks.last_mut().unwrap();
        if !last.is_empty() && last.len() + bytes.len() > self.chunk_size {
            self.chunks.push(Vec::with_capacity(self.chunk_size.max(bytes.len())));
        }
        let chunk = self.chunks.last_mut().unwrap();
        let addr = ChunkAddr { array_index: (self.chunks.len() - 1) as u32, index_in_array: chunk.len() as u32 };
        chunk.extend_from_slice(bytes);
        addr
    }

    /// Read `len` bytes starting at `addr`. Panics if the run was not
    /// staged contiguously within one chunk (callers only ever read back
    /// exactly what [`Self::append`] wrote).
    pub fn read(&self, addr: ChunkAddr, len: usize) -> &[u8] {
        let chunk = &self.chunks[addr.array_index as usize];
        let start = addr.index_in_array as usize;
        &chunk[start..start + len]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn appends_round_trip_within_one_chunk() {
        let mut buf = ChunkedBuffer::new(1024);
        let a1 = buf.append(b"hello");
        let a2 = buf.append(b"world!");
        assert_eq!(buf.read(a1, 5), b"hello");
        assert_eq!(buf.read(a2, 6), b"world!");
    }

    #[test]
    fn overflow_spills_into_a_new_chunk() {
        let mut buf = ChunkedBuffer::new(8);
        let a1 = buf.append(b"1234567"); // 7 bytes, fits
        let a2 = buf.append(b"89"); // would overflow chunk 0 (7+2>8), new chunk
        assert_eq!(a1.array_index, 0);
        assert_eq!(a2.array_index, 1);
        assert_eq!(buf.read(a1, 7), b"1234567");
        assert_eq!(buf.read(a2, 2), b"89");
    }

    #[test]
    fn oversized_run_gets_its_own_chunk() {
        let mut buf = ChunkedBuffer::new(4);
        let big = vec![7u8; 100];
        let addr = buf.append(&big);
        assert_eq!(buf.read(addr, 100), big.as_slice());
    }
}
