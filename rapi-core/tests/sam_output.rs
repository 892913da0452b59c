//! SAM rendering contract: header layout, supplementary trimming, secondary
//! suppression, and the mandatory-column count.

mod common;

use common::*;
use rapi_core::types::{Alignment, CigarKind};
use rapi_core::{format_fragment, format_header, Batch, Reference};

const SANGER: i32 = 33;

fn scripted_reference() -> Reference {
    let mut index = ScriptedIndex::default();
    index.contigs = vec![contig_meta("c1", 10_000), contig_meta("c2", 5_000)];
    index.l_pac = 15_000;
    Reference::load(&ScriptedBackend { index }, "scripted.idx").unwrap()
}

#[test]
fn header_lists_contigs_program_and_comment() {
    let reference = scripted_reference();
    let mut out = String::new();
    format_header(&reference, &mut out).unwrap();
    let expected = format!(
        "@SQ\tSN:c1\tLN:10000\n\
         @SQ\tSN:c2\tLN:5000\n\
         @PG\tID:rapi (scripted)\tPN:rapi (scripted)\tVN:{} (0.0-test)\n\
         @CO\talignments produced through the rapi interface\n",
        rapi_core::VERSION
    );
    assert_eq!(out, expected);
}

#[test]
fn supplementary_alignment_hard_clips_and_trims_the_sequence() {
    let reference = scripted_reference();
    let contig = &reference.contigs()[0];
    let mut batch = Batch::new(1, 1).unwrap();
    batch
        .set_read(0, 0, "s4", "ACGTACGTACGTACGTACGT", None, SANGER)
        .unwrap();
    {
        let read = batch.get_read_mut(0, 0).unwrap();
        read.alignments.push(Alignment {
            contig: Some(contig),
            pos: 100,
            mapq: 60,
            score: 40,
            mapped: true,
            cigar: cigar_ops(&[(20, CigarKind::Match)]),
            ..Default::default()
        });
        read.alignments.push(Alignment {
            contig: Some(contig),
            pos: 500,
            mapq: 30,
            score: 20,
            mapped: true,
            n_mismatches: 1,
            cigar: cigar_ops(&[(10, CigarKind::SoftClip), (10, CigarKind::Match)]),
            ..Default::default()
        });
    }

    let mut sam = String::new();
    format_fragment(&batch, 0, &mut sam).unwrap();
    let lines: Vec<&str> = sam.lines().collect();
    assert_eq!(lines.len(), 2);

    let primary: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(primary[1], "0");
    assert_eq!(primary[5], "20M");
    assert_eq!(primary[9], "ACGTACGTACGTACGTACGT");

    let supp: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(supp[1], "2048");
    assert_eq!(supp[3], "500");
    assert_eq!(supp[5], "10H10M");
    // only the span that survived clipping
    assert_eq!(supp[9], "GTACGTACGT");
    assert!(lines[1].contains("NM:i:1"));
}

#[test]
fn reverse_strand_supplementary_emits_the_clipped_span_complemented() {
    let reference = scripted_reference();
    let contig = &reference.contigs()[0];
    let mut batch = Batch::new(1, 1).unwrap();
    batch
        .set_read(0, 0, "rev", "AACCGGTTAA", Some("ABCDEFGHIJ"), SANGER)
        .unwrap();
    {
        let read = batch.get_read_mut(0, 0).unwrap();
        read.alignments.push(Alignment {
            contig: Some(contig),
            pos: 100,
            mapq: 60,
            score: 20,
            mapped: true,
            reverse_strand: true,
            cigar: cigar_ops(&[(10, CigarKind::Match)]),
            ..Default::default()
        });
        read.alignments.push(Alignment {
            contig: Some(contig),
            pos: 900,
            mapq: 30,
            score: 10,
            mapped: true,
            reverse_strand: true,
            cigar: cigar_ops(&[(4, CigarKind::SoftClip), (6, CigarKind::Match)]),
            ..Default::default()
        });
    }

    let mut sam = String::new();
    format_fragment(&batch, 0, &mut sam).unwrap();
    let lines: Vec<&str> = sam.lines().collect();

    // primary: full-length reverse complement, reversed qualities
    let primary: Vec<&str> = lines[0].split('\t').collect();
    assert_eq!(primary[1], "16");
    assert_eq!(primary[9], "TTAACCGGTT");
    assert_eq!(primary[10], "JIHGFEDCBA");

    // supplementary: bases 4..10 reverse-complemented, qualities reversed
    let supp: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(supp[5], "4H6M");
    assert_eq!(supp[9], "TTAACC");
    assert_eq!(supp[10], "JIHGFE");
}

#[test]
fn secondary_alignment_suppresses_seq_and_qual() {
    let reference = scripted_reference();
    let contig = &reference.contigs()[0];
    let mut batch = Batch::new(1, 1).unwrap();
    batch.set_read(0, 0, "sec", "ACGTACGT", Some("IIIIIIII"), SANGER).unwrap();
    {
        let read = batch.get_read_mut(0, 0).unwrap();
        read.alignments.push(Alignment {
            contig: Some(contig),
            pos: 100,
            mapq: 60,
            score: 16,
            mapped: true,
            cigar: cigar_ops(&[(8, CigarKind::Match)]),
            ..Default::default()
        });
        read.alignments.push(Alignment {
            contig: Some(contig),
            pos: 700,
            mapq: 0,
            score: 15,
            mapped: true,
            secondary: true,
            cigar: cigar_ops(&[(8, CigarKind::Match)]),
            ..Default::default()
        });
    }

    let mut sam = String::new();
    format_fragment(&batch, 0, &mut sam).unwrap();
    let lines: Vec<&str> = sam.lines().collect();

    let secondary: Vec<&str> = lines[1].split('\t').collect();
    assert_eq!(secondary[1], "256");
    assert_eq!(secondary[5], "8M"); // secondary keeps soft clips, no rewrite
    assert_eq!(secondary[9], "*");
    assert_eq!(secondary[10], "*");
}

#[test]
fn every_line_has_eleven_mandatory_columns() {
    let reference = scripted_reference();
    let contig = &reference.contigs()[0];
    let mut batch = Batch::new(2, 1).unwrap();
    batch.set_read(0, 0, "pair", "ACGTACGT", Some("IIIIIIII"), SANGER).unwrap();
    batch.set_read(0, 1, "pair", "ACGTACGT", None, SANGER).unwrap();
    {
        let read = batch.get_read_mut(0, 0).unwrap();
        read.alignments.push(Alignment {
            contig: Some(contig),
            pos: 10,
            mapq: 60,
            score: 16,
            mapped: true,
            paired: true,
            cigar: cigar_ops(&[(8, CigarKind::Match)]),
            ..Default::default()
        });
    }

    let mut sam = String::new();
    format_fragment(&batch, 0, &mut sam).unwrap();
    for line in sam.lines() {
        let columns: Vec<&str> = line.split('\t').collect();
        assert!(columns.len() >= 11, "short line: {}", line);
        for optional in &columns[11..] {
            let mut parts = optional.splitn(3, ':');
            assert!(parts.next().is_some());
            let type_letter = parts.next().unwrap();
            assert!(matches!(type_letter, "A" | "Z" | "i" | "f"));
            assert!(parts.next().is_some());
        }
    }
}

#[test]
fn rendered_sam_survives_a_file_round_trip() -> anyhow::Result<()> {
    use std::io::{Read as _, Seek, SeekFrom, Write as _};

    let reference = scripted_reference();
    let contig = &reference.contigs()[0];
    let mut batch = Batch::new(1, 1)?;
    batch.set_read(0, 0, "rt", "ACGT", Some("IIII"), SANGER)?;
    batch.get_read_mut(0, 0).unwrap().alignments.push(Alignment {
        contig: Some(contig),
        pos: 42,
        mapq: 60,
        score: 8,
        mapped: true,
        cigar: cigar_ops(&[(4, CigarKind::Match)]),
        ..Default::default()
    });

    let mut text = String::new();
    format_header(&reference, &mut text)?;
    format_fragment(&batch, 0, &mut text)?;
    text.push('\n');

    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(text.as_bytes())?;
    file.as_file_mut().seek(SeekFrom::Start(0))?;
    let mut back = String::new();
    file.as_file_mut().read_to_string(&mut back)?;

    assert_eq!(back, text);
    let body: Vec<&str> = back.lines().filter(|l| !l.starts_with('@')).collect();
    assert_eq!(body, vec!["rt\t0\tc1\t42\t60\t4M\t*\t0\t0\tACGT\tIIII\tNM:i:0\tAS:i:8"]);
    Ok(())
}

#[test]
fn rendering_rejects_fragments_outside_the_batch() {
    let mut batch = Batch::new(1, 1).unwrap();
    batch.set_read(0, 0, "r", "ACGT", None, SANGER).unwrap();
    let mut out = String::new();
    assert!(format_fragment(&batch, 1, &mut out).is_err());
    assert!(format_fragment(&batch, -1, &mut out).is_err());
    assert!(out.is_empty());
}
