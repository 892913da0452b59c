//! Core alignment data types.

use crate::error::{RapiError, Result};
use crate::reference::Contig;
use crate::tags::Tag;
use crate::utils;

/// Maximum CIGAR operation length (the length field is 28 bits wide).
pub const MAX_CIGAR_OP_LEN: u32 = (1 << 28) - 1;

/// CIGAR operation kinds.  The discriminants match the codes used on the
/// engine boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CigarKind {
    Match = 0,
    Insertion = 1,
    Deletion = 2,
    SoftClip = 3,
    HardClip = 4,
    Skip = 5,
    Pad = 6,
}

impl CigarKind {
    /// Numeric operation code.
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(CigarKind::Match),
            1 => Ok(CigarKind::Insertion),
            2 => Ok(CigarKind::Deletion),
            3 => Ok(CigarKind::SoftClip),
            4 => Ok(CigarKind::HardClip),
            5 => Ok(CigarKind::Skip),
            6 => Ok(CigarKind::Pad),
            other => Err(RapiError::Param(format!("unknown cigar op code {}", other))),
        }
    }

    /// SAM letter for this operation.  Skip and pad operations are not
    /// rendered.
    pub fn letter(self) -> Option<char> {
        match self {
            CigarKind::Match => Some('M'),
            CigarKind::Insertion => Some('I'),
            CigarKind::Deletion => Some('D'),
            CigarKind::SoftClip => Some('S'),
            CigarKind::HardClip => Some('H'),
            CigarKind::Skip | CigarKind::Pad => None,
        }
    }

    /// Whether the operation consumes reference bases.
    pub fn consumes_reference(self) -> bool {
        matches!(self, CigarKind::Match | CigarKind::Deletion)
    }

    pub fn is_clip(self) -> bool {
        matches!(self, CigarKind::SoftClip | CigarKind::HardClip)
    }
}

/// One (operation, length) CIGAR pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CigarOp {
    pub kind: CigarKind,
    pub len: u32,
}

impl CigarOp {
    pub fn new(kind: CigarKind, len: u32) -> Result<Self> {
        if len > MAX_CIGAR_OP_LEN {
            return Err(RapiError::Param(format!(
                "cigar op length {} exceeds the {}-base maximum",
                len, MAX_CIGAR_OP_LEN
            )));
        }
        Ok(Self { kind, len })
    }
}

/// A single alignment of a read against the reference.
///
/// The contig is borrowed from the [`crate::reference::Reference`] the
/// alignment was produced against, so alignments cannot outlive it.
#[derive(Debug, Clone)]
pub struct Alignment<'r> {
    pub contig: Option<&'r Contig>,
    /// 1-based position on the contig.
    pub pos: i64,
    pub mapq: u8,
    /// Aligner-specific score; negative means no score was assigned.
    pub score: i32,

    pub paired: bool,
    pub prop_paired: bool,
    pub mapped: bool,
    pub reverse_strand: bool,
    pub secondary: bool,

    pub n_mismatches: u32,
    pub n_gap_opens: u32,
    pub n_gap_extensions: u32,

    pub cigar: Vec<CigarOp>,
    pub tags: Vec<Tag>,
}

impl Default for Alignment<'_> {
    fn default() -> Self {
        Self {
            contig: None,
            pos: 0,
            mapq: 0,
            score: -1,
            paired: false,
            prop_paired: false,
            mapped: false,
            reverse_strand: false,
            secondary: false,
            n_mismatches: 0,
            n_gap_opens: 0,
            n_gap_extensions: 0,
            cigar: Vec::new(),
            tags: Vec::new(),
        }
    }
}

impl Alignment<'_> {
    /// Number of reference bases consumed by the alignment.
    pub fn reference_len(&self) -> i64 {
        utils::reference_len(&self.cigar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cigar_op_rejects_oversized_length() {
        assert!(CigarOp::new(CigarKind::Match, MAX_CIGAR_OP_LEN).is_ok());
        let err = CigarOp::new(CigarKind::Match, MAX_CIGAR_OP_LEN + 1).unwrap_err();
        assert!(matches!(err, RapiError::Param(_)));
    }

    #[test]
    fn cigar_codes_round_trip() {
        for code in 0..=6u8 {
            assert_eq!(CigarKind::from_code(code).unwrap().code(), code);
        }
        assert!(CigarKind::from_code(7).is_err());
    }

    #[test]
    fn reference_len_counts_match_and_deletion() {
        let aln = Alignment {
            mapped: true,
            cigar: vec![
                CigarOp::new(CigarKind::SoftClip, 5).unwrap(),
                CigarOp::new(CigarKind::Match, 20).unwrap(),
                CigarOp::new(CigarKind::Insertion, 2).unwrap(),
                CigarOp::new(CigarKind::Deletion, 3).unwrap(),
            ],
            ..Default::default()
        };
        assert_eq!(aln.reference_len(), 23);
    }
}
