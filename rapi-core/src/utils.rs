//! Sequence and CIGAR helpers shared across the library.

use std::fmt::Write;

use crate::error::{RapiError, Result};
use crate::types::{Alignment, CigarKind, CigarOp};

/// Complement letters indexed by nucleotide code, unknown bases map to `N`.
const COMPLEMENT: &[u8; 5] = b"TGCAN";

/// Encode a base letter to an index in `[0, 4]`; anything outside
/// `{A, C, G, T}` maps to 4.
pub fn nt4(base: u8) -> usize {
    match base.to_ascii_uppercase() {
        b'A' => 0,
        b'C' => 1,
        b'G' => 2,
        b'T' => 3,
        _ => 4,
    }
}

/// Complement of a single uppercase base in `{A, C, G, T, N}`.
pub fn complement(base: u8) -> Result<u8> {
    let idx = nt4(base);
    if idx == 4 && base != b'N' {
        return Err(RapiError::Param(format!(
            "cannot complement byte {:#04x}: not in [ACGTN]",
            base
        )));
    }
    Ok(COMPLEMENT[idx])
}

/// Reverse-complement `seq` in place.
///
/// On error the sequence may be left partially transformed.
pub fn reverse_complement_in_place(seq: &mut [u8]) -> Result<()> {
    let len = seq.len();
    for i in 0..len / 2 {
        let head = complement(seq[i])?;
        let tail = complement(seq[len - 1 - i])?;
        seq[i] = tail;
        seq[len - 1 - i] = head;
    }
    if len % 2 == 1 {
        let mid = len / 2;
        seq[mid] = complement(seq[mid])?;
    }
    Ok(())
}

/// Number of reference bases consumed by a CIGAR.
pub fn reference_len(ops: &[CigarOp]) -> i64 {
    ops.iter()
        .filter(|op| op.kind.consumes_reference())
        .map(|op| op.len as i64)
        .sum()
}

/// Signed insert size between two mates, computed from their outermost
/// mapped positions.  Zero when either end is unmapped or the ends sit on
/// different contigs.
pub fn insert_size(read: &Alignment<'_>, mate: &Alignment<'_>) -> i64 {
    if !read.mapped || !mate.mapped {
        return 0;
    }
    let same_contig = match (read.contig, mate.contig) {
        (Some(a), Some(b)) => std::ptr::eq(a, b),
        _ => false,
    };
    if !same_contig {
        return 0;
    }
    let p0 = read.pos + if read.reverse_strand { reference_len(&read.cigar) - 1 } else { 0 };
    let p1 = mate.pos + if mate.reverse_strand { reference_len(&mate.cigar) - 1 } else { 0 };
    -((p0 - p1) + (p0 - p1).signum())
}

/// Append the text rendering of a CIGAR to `out`.
///
/// Soft clips become hard clips when `force_hard_clip` is set; skip and pad
/// operations are not rendered; an empty op list renders as `*`.
pub fn put_cigar(out: &mut String, ops: &[CigarOp], force_hard_clip: bool) {
    if ops.is_empty() {
        out.push('*');
        return;
    }
    for op in ops {
        let kind = if force_hard_clip && op.kind == CigarKind::SoftClip {
            CigarKind::HardClip
        } else {
            op.kind
        };
        if let Some(letter) = kind.letter() {
            let _ = write!(out, "{}{}", op.len, letter);
        }
    }
}

/// Compact debug rendering of a SAM flag, one letter per set bit.
pub fn flag_string(flag: u32) -> String {
    const NAMES: [(u32, char); 11] = [
        (0x1, 'p'),
        (0x2, 'P'),
        (0x4, 'u'),
        (0x8, 'U'),
        (0x10, 'r'),
        (0x20, 'R'),
        (0x40, '1'),
        (0x80, '2'),
        (0x100, 's'),
        (0x200, 'f'),
        (0x400, 'd'),
    ];
    NAMES
        .iter()
        .filter(|(bit, _)| flag & bit != 0)
        .map(|(_, letter)| letter)
        .collect()
}
