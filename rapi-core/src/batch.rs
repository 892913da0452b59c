//! Fragment-major read batches.
//!
//! Reads are stored in a rectangle of `n_frags * n_reads_frag` slots; the
//! read at `(f, r)` lives at index `f * n_reads_frag + r`.  Each populated
//! read packs its id, sequence, and quality into a single backing buffer for
//! locality, exposed through offset views.

use crate::error::{RapiError, Result};
use crate::types::Alignment;

/// One read slot.  Unset slots have no payload: `id()` returns `None` and
/// `len()` is zero.
#[derive(Debug, Default, Clone)]
pub struct Read<'r> {
    /// `id + seq + qual`, packed.
    payload: Option<Box<[u8]>>,
    id_len: u32,
    seq_len: u32,
    has_qual: bool,
    /// Alignments produced for this read, best first.
    pub alignments: Vec<Alignment<'r>>,
}

impl<'r> Read<'r> {
    /// Read name, or `None` when the slot has not been populated.
    pub fn id(&self) -> Option<&str> {
        self.payload
            .as_deref()
            .and_then(|p| std::str::from_utf8(&p[..self.id_len as usize]).ok())
    }

    /// Base sequence; empty when the slot has not been populated.
    pub fn seq(&self) -> &[u8] {
        match self.payload.as_deref() {
            Some(p) => {
                let start = self.id_len as usize;
                &p[start..start + self.seq_len as usize]
            }
            None => &[],
        }
    }

    /// Sanger-encoded base qualities, if provided.
    pub fn qual(&self) -> Option<&[u8]> {
        if !self.has_qual {
            return None;
        }
        self.payload.as_deref().map(|p| {
            let start = (self.id_len + self.seq_len) as usize;
            &p[start..start + self.seq_len as usize]
        })
    }

    /// Sequence length in bases.
    pub fn len(&self) -> usize {
        self.seq_len as usize
    }

    pub fn is_empty(&self) -> bool {
        self.seq_len == 0
    }
}

/// A batch of reads grouped by fragment.
#[derive(Debug, Default, Clone)]
pub struct Batch<'r> {
    n_frags: i64,
    n_reads_frag: i32,
    reads: Vec<Read<'r>>,
}

impl<'r> Batch<'r> {
    /// Allocate a zeroed rectangle of `n_frags * n_reads_frag` read slots.
    pub fn new(n_reads_frag: i32, n_frags: i64) -> Result<Self> {
        if n_reads_frag < 0 || n_frags < 0 {
            return Err(RapiError::Param(format!(
                "negative batch dimensions ({} reads/fragment, {} fragments)",
                n_reads_frag, n_frags
            )));
        }
        let capacity = n_frags as usize * n_reads_frag as usize;
        let mut reads = Vec::new();
        reads.resize_with(capacity, Read::default);
        Ok(Self { n_frags, n_reads_frag, reads })
    }

    pub fn n_frags(&self) -> i64 {
        self.n_frags
    }

    pub fn n_reads_frag(&self) -> i32 {
        self.n_reads_frag
    }

    /// Number of reads that fit in the currently allocated space.
    pub fn read_capacity(&self) -> i64 {
        self.n_frags * self.n_reads_frag as i64
    }

    /// Grow the batch to hold at least `n_frags` fragments.  Existing reads
    /// are preserved and the new tail is zero-initialized; shrinking is a
    /// no-op.
    pub fn reserve(&mut self, n_frags: i64) -> Result<()> {
        if n_frags < 0 {
            return Err(RapiError::Param(format!("negative fragment count {}", n_frags)));
        }
        if n_frags > self.n_frags {
            let capacity = n_frags as usize * self.n_reads_frag as usize;
            self.reads.resize_with(capacity, Read::default);
            self.n_frags = n_frags;
        }
        Ok(())
    }

    /// Reset every slot to its unset state without releasing the rectangle.
    pub fn clear(&mut self) {
        for read in &mut self.reads {
            *read = Read::default();
        }
    }

    fn slot(&self, n_frag: i64, n_read: i32) -> Option<usize> {
        if n_frag < 0 || n_frag >= self.n_frags || n_read < 0 || n_read >= self.n_reads_frag {
            return None;
        }
        Some(n_frag as usize * self.n_reads_frag as usize + n_read as usize)
    }

    pub fn get_read(&self, n_frag: i64, n_read: i32) -> Option<&Read<'r>> {
        self.slot(n_frag, n_read).map(|i| &self.reads[i])
    }

    pub fn get_read_mut(&mut self, n_frag: i64, n_read: i32) -> Option<&mut Read<'r>> {
        self.slot(n_frag, n_read).map(move |i| &mut self.reads[i])
    }

    /// Store read data in the slot at `(n_frag, n_read)`.
    ///
    /// Strings are copied into a single backing buffer.  The quality string,
    /// if given, is recoded from `q_offset` to Sanger (offset 33); any
    /// recoded value outside `[33, 126]` rejects the whole call and leaves
    /// the slot untouched.  A trailing `/1` or `/2` pair suffix is stripped
    /// from the id.
    pub fn set_read(
        &mut self,
        n_frag: i64,
        n_read: i32,
        id: &str,
        seq: &str,
        qual: Option<&str>,
        q_offset: i32,
    ) -> Result<()> {
        let slot = self.slot(n_frag, n_read).ok_or_else(|| {
            RapiError::Param(format!(
                "read coordinates ({}, {}) outside batch of {}x{} reads",
                n_frag, n_read, self.n_frags, self.n_reads_frag
            ))
        })?;
        if seq.is_empty() {
            return Err(RapiError::Param("empty read sequence".to_string()));
        }
        if let Some(q) = qual {
            if q.len() != seq.len() {
                return Err(RapiError::Param(format!(
                    "quality length {} does not match sequence length {}",
                    q.len(),
                    seq.len()
                )));
            }
        }

        let id = id
            .strip_suffix("/1")
            .or_else(|| id.strip_suffix("/2"))
            .unwrap_or(id);

        let mut payload =
            Vec::with_capacity(id.len() + seq.len() + qual.map_or(0, |q| q.len()));
        payload.extend_from_slice(id.as_bytes());
        payload.extend_from_slice(seq.as_bytes());
        if let Some(q) = qual {
            for &byte in q.as_bytes() {
                // Sanger base qualities have an allowed range of [0, 93],
                // and 93 + 33 = 126
                let recoded = byte as i32 - q_offset + 33;
                if !(33..=126).contains(&recoded) {
                    log::warn!("invalid base quality score {}", recoded);
                    return Err(RapiError::Param(format!(
                        "base quality {} out of range after recoding",
                        recoded
                    )));
                }
                payload.push(recoded as u8);
            }
        }

        self.reads[slot] = Read {
            payload: Some(payload.into_boxed_slice()),
            id_len: id.len() as u32,
            seq_len: seq.len() as u32,
            has_qual: qual.is_some(),
            alignments: Vec::new(),
        };
        Ok(())
    }
}
