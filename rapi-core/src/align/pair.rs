//! Fragment finalization: mate rescue, pairing, mapping-quality
//! recomputation, and conversion of engine candidates into alignment
//! records.

use crate::engine::{infer_pair_orientation, Candidate, PairStats, RawAlignment};
use crate::error::{RapiError, Result};
use crate::opts::Opts;
use crate::reference::Reference;
use crate::tags::Tag;
use crate::types::Alignment;
use crate::utils;

use super::EngineRead;

/// Shared read-only state for pass-2 workers.
pub(crate) struct FinalizeContext<'a, 'r> {
    pub reference: &'r Reference,
    pub opts: &'a Opts,
    pub pes: &'a [PairStats; 4],
    pub mapq_coef: i32,
}

/// Phred-scale a score difference with the engine's match coefficient.
fn raw_mapq(diff: i32, a: i32) -> i32 {
    (6.02 * diff as f64 / a as f64 + 0.499) as i32
}

/// Finalize a single-end fragment: order the candidates and convert the
/// survivors.
pub(crate) fn finalize_single<'r>(
    ctx: &FinalizeContext<'_, 'r>,
    id: u64,
    read: &EngineRead<'_>,
    regions: &mut Vec<Candidate>,
) -> Result<Vec<Alignment<'r>>> {
    ctx.reference.index().mark_primary(ctx.opts, regions, id);
    regions_to_alignments(ctx, read, regions, false, false)
}

/// Finalize a paired-end fragment.
///
/// Runs mate rescue, marks primaries on both ends, asks the engine to score
/// the pairing, and either emits the winning pair with recomputed mapping
/// qualities or falls back to finalizing each end independently.
pub(crate) fn finalize_pair<'r>(
    ctx: &FinalizeContext<'_, 'r>,
    id: u64,
    reads: &[EngineRead<'_>],
    regions: &mut [Vec<Candidate>],
) -> Result<[Vec<Alignment<'r>>; 2]> {
    debug_assert_eq!(reads.len(), 2);
    debug_assert_eq!(regions.len(), 2);
    if reads[0].id != reads[1].id {
        log::warn!(
            "paired reads have different names: \"{}\", \"{}\"",
            reads[0].id,
            reads[1].id
        );
    }

    let engine_opts = &ctx.opts.engine;
    let index = ctx.reference.index();

    // mate rescue for every candidate close to its end's best score
    if !engine_opts.skip_mate_rescue {
        let mut anchors: [Vec<Candidate>; 2] = [Vec::new(), Vec::new()];
        for (end, regs) in regions.iter().enumerate() {
            if let Some(best) = regs.first().map(|c| c.score) {
                anchors[end] = regs
                    .iter()
                    .filter(|c| c.score >= best - engine_opts.pen_unpaired)
                    .cloned()
                    .collect();
            }
        }
        let mut n_rescued = 0;
        for end in 0..2 {
            let (first, second) = regions.split_at_mut(1);
            let mate_regions = if end == 0 { &mut second[0] } else { &mut first[0] };
            let mate_seq = &reads[1 - end].seq;
            for anchor in anchors[end].iter().take(engine_opts.max_matesw.max(0) as usize) {
                n_rescued += index.mate_rescue(ctx.opts, ctx.pes, anchor, mate_seq, mate_regions);
            }
        }
        if n_rescued > 0 {
            log::debug!("mate rescue added {} candidate regions", n_rescued);
        }
    }

    index.mark_primary(ctx.opts, &mut regions[0], id << 1);
    index.mark_primary(ctx.opts, &mut regions[1], id << 1 | 1);

    if !engine_opts.skip_pairing && !regions[0].is_empty() && !regions[1].is_empty() {
        if let Some(pairing) = index.pair(ctx.opts, ctx.pes, &regions[0], &regions[1], id) {
            // pair semantics apply only when neither end keeps multiple
            // strong primary hits
            let multi = |regs: &[Candidate]| {
                regs.iter()
                    .skip(1)
                    .any(|c| c.secondary < 0 && c.score >= engine_opts.score_threshold)
            };
            if pairing.score > 0 && !multi(&regions[0]) && !multi(&regions[1]) {
                let score_unpaired =
                    regions[0][0].score + regions[1][0].score - engine_opts.pen_unpaired;
                if pairing.score > score_unpaired {
                    return emit_winning_pair(ctx, reads, regions, &pairing, score_unpaired);
                }
            }
        }
    }

    finalize_unpaired(ctx, reads, regions)
}

/// Emit exactly the winning candidate of each end as a proper pair.
fn emit_winning_pair<'r>(
    ctx: &FinalizeContext<'_, 'r>,
    reads: &[EngineRead<'_>],
    regions: &mut [Vec<Candidate>],
    pairing: &crate::engine::Pairing,
    score_unpaired: i32,
) -> Result<[Vec<Alignment<'r>>; 2]> {
    let engine_opts = &ctx.opts.engine;
    let index = ctx.reference.index();

    let sub = pairing.sub_score.max(score_unpaired);
    let mut q_pe = raw_mapq(pairing.score - sub, ctx.mapq_coef);
    if pairing.n_sub > 0 {
        q_pe -= (4.343 * ((pairing.n_sub + 1) as f64).ln() + 0.499) as i32;
    }
    q_pe = q_pe.clamp(0, 60);

    let mut out: [Vec<Alignment<'r>>; 2] = [Vec::new(), Vec::new()];
    for end in 0..2 {
        let z = pairing.best[end];
        if z >= regions[end].len() {
            return Err(RapiError::Generic(format!(
                "engine pairing index {} out of bounds ({} candidates)",
                z,
                regions[end].len()
            )));
        }
        if regions[end][z].secondary >= 0 {
            let dominating = regions[end][z].secondary as usize;
            let dominating_score = regions[end].get(dominating).map(|c| c.score).unwrap_or(0);
            let winner = &mut regions[end][z];
            winner.sub = dominating_score;
            winner.secondary = -2;
        }
        let winner = &regions[end][z];
        let mut q_se = index.approx_mapq_se(ctx.opts, winner);
        q_se = q_se.max(q_pe.min(q_se + 40));
        q_se = q_se.min(raw_mapq(winner.score - winner.csub, ctx.mapq_coef));

        let mut raw = index.extend(ctx.opts, &reads[end].seq, Some(winner));
        raw.mapq = q_se.clamp(0, 255) as u8;
        raw.flag |= (if end == 0 { 0x40 } else { 0x80 }) | 0x1 | 0x2;
        let mut alignments = raw_to_alignments(ctx, &[raw], true)?;
        synthesize_sa_tags(&mut alignments);
        out[end] = alignments;
    }
    Ok(out)
}

/// Finalize both ends independently.  If the top candidates of the two ends
/// nonetheless fall within the inferred insert-size window for their
/// orientation, the pair is still flagged as proper.
fn finalize_unpaired<'r>(
    ctx: &FinalizeContext<'_, 'r>,
    reads: &[EngineRead<'_>],
    regions: &mut [Vec<Candidate>],
) -> Result<[Vec<Alignment<'r>>; 2]> {
    let engine_opts = &ctx.opts.engine;
    let index = ctx.reference.index();

    let mut prop_paired = false;
    if !engine_opts.skip_pairing && !regions[0].is_empty() && !regions[1].is_empty() {
        let top: Vec<RawAlignment> = (0..2)
            .map(|end| {
                let best = regions[end]
                    .first()
                    .filter(|c| c.score >= engine_opts.score_threshold);
                index.extend(ctx.opts, &reads[end].seq, best)
            })
            .collect();
        if top[0].contig_id >= 0 && top[0].contig_id == top[1].contig_id {
            let (orientation, dist) = infer_pair_orientation(
                index.packed_len(),
                regions[0][0].ref_begin,
                regions[1][0].ref_begin,
            );
            let stats = &ctx.pes[orientation];
            if !stats.failed && dist >= stats.low as i64 && dist <= stats.high as i64 {
                prop_paired = true;
            }
        }
    }

    let first = regions_to_alignments(ctx, &reads[0], &regions[0], true, prop_paired)?;
    let second = regions_to_alignments(ctx, &reads[1], &regions[1], true, prop_paired)?;
    Ok([first, second])
}

/// Convert a candidate list into alignment records: filter by score and
/// secondary status, extend the survivors, cap supplementary mapping
/// qualities, and fall back to the unmapped record when nothing survives.
fn regions_to_alignments<'r>(
    ctx: &FinalizeContext<'_, 'r>,
    read: &EngineRead<'_>,
    regions: &[Candidate],
    is_paired: bool,
    prop_paired: bool,
) -> Result<Vec<Alignment<'r>>> {
    let engine_opts = &ctx.opts.engine;
    let index = ctx.reference.index();

    let mut raws: Vec<RawAlignment> = Vec::new();
    for (k, candidate) in regions.iter().enumerate() {
        if candidate.score < engine_opts.score_threshold {
            continue;
        }
        if candidate.secondary >= 0 {
            if !engine_opts.report_all {
                continue;
            }
            let dominating = regions
                .get(candidate.secondary as usize)
                .map(|c| c.score)
                .unwrap_or(0);
            if (candidate.score as f64) < dominating as f64 * 0.5 {
                continue;
            }
        }
        let mut raw = index.extend(ctx.opts, &read.seq, Some(candidate));
        if prop_paired {
            raw.flag |= 0x2;
        }
        if candidate.secondary >= 0 {
            // don't report a sub-optimal score for secondary hits
            raw.sub = -1;
        }
        if k > 0 && candidate.secondary < 0 {
            raw.flag |= 0x800; // supplementary
        }
        if let Some(primary) = raws.first() {
            if raw.mapq > primary.mapq {
                raw.mapq = primary.mapq;
            }
        }
        raws.push(raw);
    }
    if raws.is_empty() {
        let mut raw = index.extend(ctx.opts, &read.seq, None);
        if prop_paired {
            raw.flag |= 0x2;
        }
        raws.push(raw);
    }

    let mut alignments = raw_to_alignments(ctx, &raws, is_paired)?;
    synthesize_sa_tags(&mut alignments);
    Ok(alignments)
}

/// Convert concrete engine alignments into [`Alignment`] records against the
/// reference catalog.
fn raw_to_alignments<'r>(
    ctx: &FinalizeContext<'_, 'r>,
    raws: &[RawAlignment],
    is_paired: bool,
) -> Result<Vec<Alignment<'r>>> {
    let contigs = ctx.reference.contigs();
    let mut out = Vec::with_capacity(raws.len());
    for raw in raws {
        if raw.contig_id >= 0 && raw.contig_id as usize >= contigs.len() {
            log::error!(
                "engine reference id {} is out of bounds (n_contigs: {})",
                raw.contig_id,
                contigs.len()
            );
            return Err(RapiError::Generic(format!(
                "engine reference id {} out of bounds",
                raw.contig_id
            )));
        }

        let mut aln = Alignment {
            paired: is_paired,
            prop_paired: raw.flag & 0x2 != 0,
            mapped: raw.contig_id >= 0,
            secondary: raw.flag & (0x100 | 0x10000) != 0,
            score: raw.score,
            mapq: raw.mapq,
            ..Default::default()
        };
        if raw.contig_id >= 0 {
            aln.reverse_strand = raw.is_rev;
            aln.contig = Some(&contigs[raw.contig_id as usize]);
            aln.pos = raw.pos + 1;
            aln.n_mismatches = raw.n_mismatches;
            if !raw.cigar.is_empty() {
                aln.cigar = raw.cigar.clone();
                if let Some(md) = &raw.md {
                    aln.tags.push(Tag::text("MD", md));
                }
            }
        }
        if raw.sub >= 0 {
            aln.tags.push(Tag::int("XS", raw.sub as i64));
        }
        out.push(aln);
    }
    Ok(out)
}

/// Attach an `SA` tag to every non-secondary alignment of a chimeric read,
/// listing the other non-secondary hits.
fn synthesize_sa_tags(alignments: &mut [Alignment<'_>]) {
    let chimeric: Vec<usize> = alignments
        .iter()
        .enumerate()
        .filter(|(_, a)| a.mapped && !a.secondary)
        .map(|(i, _)| i)
        .collect();
    if chimeric.len() < 2 {
        return;
    }

    let entries: Vec<(usize, String)> = chimeric
        .iter()
        .map(|&i| {
            let a = &alignments[i];
            let mut entry = String::new();
            if let Some(contig) = a.contig {
                entry.push_str(&contig.name);
            }
            entry.push(',');
            entry.push_str(&a.pos.to_string());
            entry.push(',');
            entry.push(if a.reverse_strand { '-' } else { '+' });
            entry.push(',');
            utils::put_cigar(&mut entry, &a.cigar, false);
            entry.push(',');
            entry.push_str(&a.mapq.to_string());
            entry.push(',');
            entry.push_str(&a.n_mismatches.to_string());
            entry.push(';');
            (i, entry)
        })
        .collect();

    for &i in &chimeric {
        let mut text = String::new();
        for (j, entry) in &entries {
            if *j != i {
                text.push_str(entry);
            }
        }
        alignments[i].tags.push(Tag::text("SA", &text));
    }
}
