//! SAM text rendering.
//!
//! Renders one line per alignment for every read of a fragment, plus the
//! reference header.  Flag computation, mate-coordinate copying, and
//! insert-size tie-breaking follow the classic short-read aligner behavior;
//! supplementary alignments hard-clip their CIGAR and emit only the
//! non-clipped span of the sequence.

use std::fmt::Write;

use crate::batch::{Batch, Read};
use crate::error::{RapiError, Result};
use crate::reference::{Contig, Reference};
use crate::tags::{Tag, Value};
use crate::types::Alignment;
use crate::utils;

/// Append the SAM header for `reference` to `out`: one `@SQ` line per
/// contig, a `@PG` line identifying the engine, and a `@CO` comment.
pub fn format_header(reference: &Reference, out: &mut String) -> Result<()> {
    for contig in reference.contigs() {
        writeln!(out, "@SQ\tSN:{}\tLN:{}", contig.name, contig.len)?;
    }
    writeln!(
        out,
        "@PG\tID:rapi ({name})\tPN:rapi ({name})\tVN:{plugin} ({engine})",
        name = reference.aligner_name(),
        plugin = crate::VERSION,
        engine = reference.aligner_version(),
    )?;
    writeln!(out, "@CO\talignments produced through the rapi interface")?;
    Ok(())
}

/// Append the SAM lines for all reads of fragment `n_frag` to `out`, one
/// line per alignment (or one unmapped line for a read with none), separated
/// by newlines.
pub fn format_fragment(batch: &Batch<'_>, n_frag: i64, out: &mut String) -> Result<()> {
    let n_reads_frag = batch.n_reads_frag();
    if !(1..=2).contains(&n_reads_frag) {
        return Err(RapiError::Param(format!(
            "only single and paired reads are supported (got {})",
            n_reads_frag
        )));
    }
    let read = batch
        .get_read(n_frag, 0)
        .ok_or_else(|| RapiError::Param(format!("fragment {} outside the batch", n_frag)))?;
    let mate = if n_reads_frag == 2 {
        Some(batch.get_read(n_frag, 1).ok_or_else(|| {
            RapiError::Param(format!("fragment {} is missing its second read", n_frag))
        })?)
    } else {
        None
    };

    let mut first_line = true;
    let ends: [(&Read<'_>, Option<&Read<'_>>); 2] = [(read, mate), (mate.unwrap_or(read), Some(read))];
    let n_ends = if mate.is_some() { 2 } else { 1 };
    for (end, &(r, m)) in ends.iter().take(n_ends).enumerate() {
        let n_lines = r.alignments.len().max(1);
        for which in 0..n_lines {
            if !first_line {
                out.push('\n');
            }
            put_alignment_line(r, m, end as i32 + 1, which, out)?;
            first_line = false;
        }
    }
    Ok(())
}

fn same_contig(a: Option<&Contig>, b: Option<&Contig>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::ptr::eq(a, b),
        _ => false,
    }
}

/// Render one SAM line for alignment `which` of `read`.
fn put_alignment_line(
    read: &Read<'_>,
    mate: Option<&Read<'_>>,
    read_num: i32,
    which: usize,
    out: &mut String,
) -> Result<()> {
    // Working copies: an unmapped end borrows its coordinates from a mapped
    // mate, and vice versa.
    let mut aln: Alignment<'_> = read.alignments.get(which).cloned().unwrap_or_default();
    let mut mate_aln: Alignment<'_> = mate
        .and_then(|m| m.alignments.first())
        .cloned()
        .unwrap_or_default();
    if mate.is_some() {
        aln.paired = true;
        mate_aln.paired = true;
    }
    if !aln.mapped && mate.is_some() && mate_aln.mapped {
        aln.contig = mate_aln.contig;
        aln.pos = mate_aln.pos;
        aln.reverse_strand = mate_aln.reverse_strand;
    } else if aln.mapped && mate.is_some() && !mate_aln.mapped {
        mate_aln.contig = aln.contig;
        mate_aln.pos = aln.pos;
        mate_aln.reverse_strand = aln.reverse_strand;
    }

    let supplementary = which > 0 && !aln.secondary;

    let mut flag = 0u32;
    if mate.is_some() {
        flag |= if read_num == 2 { 0x80 } else { 0x40 };
        if !mate_aln.mapped {
            flag |= 0x8;
        }
        if mate_aln.mapped && mate_aln.reverse_strand {
            flag |= 0x20;
        }
    }
    if aln.paired {
        flag |= 0x1;
    }
    if !aln.mapped {
        flag |= 0x4;
    }
    if aln.mapped {
        if aln.prop_paired {
            flag |= 0x2;
        }
        if aln.reverse_strand {
            flag |= 0x10;
        }
        if aln.secondary {
            flag |= 0x100;
        }
        if supplementary {
            flag |= 0x800;
        }
    }

    write!(out, "{}\t{}", read.id().unwrap_or(""), flag & 0xffff)?;

    // RNAME, POS, MAPQ, CIGAR
    match aln.contig {
        Some(contig) => {
            write!(out, "\t{}\t{}\t{}\t", contig.name, aln.pos, aln.mapq)?;
            utils::put_cigar(out, &aln.cigar, supplementary);
        }
        None => out.push_str("\t*\t0\t0\t*"),
    }

    // RNEXT, PNEXT, TLEN
    match mate_aln.contig {
        Some(mate_contig) => {
            out.push('\t');
            if same_contig(aln.contig, mate_aln.contig) {
                out.push('=');
            } else {
                out.push_str(&mate_contig.name);
            }
            write!(out, "\t{}\t", mate_aln.pos)?;
            if aln.mapped && same_contig(aln.contig, mate_aln.contig) {
                write!(out, "{}", utils::insert_size(&aln, &mate_aln))?;
            } else {
                out.push('0');
            }
        }
        None => out.push_str("\t*\t0\t0"),
    }
    out.push('\t');

    put_seq_and_qual(read, &aln, supplementary, out)?;

    // optional tags
    if !aln.cigar.is_empty() {
        write!(out, "\tNM:i:{}", aln.n_mismatches)?;
    }
    if aln.score >= 0 {
        write!(out, "\tAS:i:{}", aln.score)?;
    }
    for tag in &aln.tags {
        out.push('\t');
        put_tag(tag, out)?;
    }
    Ok(())
}

/// Emit the SEQ and QUAL columns.
///
/// Secondary alignments emit `*\t*`; supplementary alignments emit only the
/// span not removed by clipping; reverse-strand alignments emit the reverse
/// complement with reversed qualities.
fn put_seq_and_qual(
    read: &Read<'_>,
    aln: &Alignment<'_>,
    supplementary: bool,
    out: &mut String,
) -> Result<()> {
    if aln.secondary {
        out.push_str("*\t*");
        return Ok(());
    }

    let seq = read.seq();
    let mut begin = 0usize;
    let mut end = seq.len();
    if supplementary && !aln.cigar.is_empty() {
        if let Some(first) = aln.cigar.first() {
            if first.kind.is_clip() {
                begin += first.len as usize;
            }
        }
        if aln.cigar.len() > 1 {
            if let Some(last) = aln.cigar.last() {
                if last.kind.is_clip() {
                    end = end.saturating_sub(last.len as usize);
                }
            }
        }
    }
    let begin = begin.min(end);

    if !aln.reverse_strand {
        for &base in &seq[begin..end] {
            out.push(base as char);
        }
        out.push('\t');
        match read.qual() {
            Some(qual) => {
                for &q in &qual[begin..end] {
                    out.push(q as char);
                }
            }
            None => out.push('*'),
        }
    } else {
        for &base in seq[begin..end].iter().rev() {
            out.push(b"TGCAN"[utils::nt4(base)] as char);
        }
        out.push('\t');
        match read.qual() {
            Some(qual) => {
                for &q in qual[begin..end].iter().rev() {
                    out.push(q as char);
                }
            }
            None => out.push('*'),
        }
    }
    Ok(())
}

/// Append a `KEY:T:VALUE` optional field.
fn put_tag(tag: &Tag, out: &mut String) -> Result<()> {
    write!(out, "{}:{}:", tag.key(), tag.value().sam_type_char())?;
    match tag.value() {
        Value::Char(c) => out.push(*c),
        Value::Text(s) => out.push_str(s),
        Value::Int(v) => write!(out, "{}", v)?,
        Value::Real(v) => write!(out, "{:.6}", v)?,
    }
    Ok(())
}
