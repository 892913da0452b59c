//! Batch alignment: the engine-read adapter and the two-pass parallel
//! driver.
//!
//! Alignment is a fork-join computation: pass 1 runs the engine's
//! seed-and-chain kernel over every read, insert-size statistics are inferred
//! sequentially between passes, and pass 2 extends, pairs, and finalizes each
//! fragment.  Workers operate on disjoint fragments; results are installed
//! into the batch after the join.

mod pair;

use rayon::prelude::*;

use crate::batch::Batch;
use crate::engine::Candidate;
use crate::error::{RapiError, Result};
use crate::opts::AlignerState;
use crate::reference::Reference;
use crate::types::Alignment;

use pair::FinalizeContext;

/// A read copied into the engine's layout: private, mutable sequence and
/// quality buffers (engines recode bases in place) and a view of the id.
pub(crate) struct EngineRead<'a> {
    pub id: &'a str,
    pub seq: Vec<u8>,
    #[allow(dead_code)]
    pub qual: Option<Vec<u8>>,
}

/// Copy the half-open fragment range `[start, end)` out of `batch` into the
/// engine layout.  Fails without side effects if any slot in the range is
/// unpopulated.
fn convert_batch<'a>(
    batch: &'a Batch<'_>,
    start_frag: i64,
    end_frag: i64,
) -> Result<Vec<EngineRead<'a>>> {
    let n_reads = (end_frag - start_frag) as usize * batch.n_reads_frag() as usize;
    let mut reads = Vec::with_capacity(n_reads);
    let mut n_bases = 0u64;
    for f in start_frag..end_frag {
        for r in 0..batch.n_reads_frag() {
            let read = batch.get_read(f, r).ok_or_else(|| {
                RapiError::Param(format!("fragment {} outside the batch", f))
            })?;
            let id = read.id().ok_or_else(|| {
                RapiError::Param(format!("read ({}, {}) has not been set", f, r))
            })?;
            reads.push(EngineRead {
                id,
                seq: read.seq().to_vec(),
                qual: read.qual().map(|q| q.to_vec()),
            });
            n_bases += read.len() as u64;
        }
    }
    log::debug!("converted {} reads ({} bases) to the engine layout", reads.len(), n_bases);
    Ok(reads)
}

/// Align the fragments `[start_frag, end_frag)` of `batch` against `reference`,
/// writing the finalized alignments into the batch's read slots.
///
/// Fragments may hold one read (single-end) or two (paired-end); larger
/// fragments are not supported.
pub fn align_reads<'r>(
    reference: &'r Reference,
    batch: &mut Batch<'r>,
    start_frag: i64,
    end_frag: i64,
    state: &mut AlignerState,
) -> Result<()> {
    let n_reads_frag = batch.n_reads_frag();
    if n_reads_frag > 2 {
        return Err(RapiError::OpNotSupported(format!(
            "fragments with {} reads",
            n_reads_frag
        )));
    }
    if n_reads_frag <= 0 {
        return Err(RapiError::Param("batch holds no reads per fragment".to_string()));
    }
    if start_frag < 0 || end_frag < start_frag || end_frag > batch.n_frags() {
        return Err(RapiError::Param(format!(
            "fragment range [{}, {}) outside batch of {} fragments",
            start_frag,
            end_frag,
            batch.n_frags()
        )));
    }
    if start_frag == end_frag {
        return Ok(());
    }

    let paired = n_reads_frag == 2;
    let nrf = n_reads_frag as usize;
    let opts = state.opts.clone();
    let index = reference.index();

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.n_threads.max(1))
        .build()
        .map_err(|e| RapiError::Generic(format!("failed to build worker pool: {}", e)))?;

    let mut engine_reads = convert_batch(batch, start_frag, end_frag)?;

    // pass 1: find candidate regions for every read
    let mut regions: Vec<Vec<Candidate>> = pool.install(|| {
        engine_reads
            .par_chunks_mut(nrf)
            .flat_map_iter(|frag| {
                frag.iter_mut()
                    .map(|read| index.align_core(&opts, &mut read.seq))
                    .collect::<Vec<_>>()
            })
            .collect()
    });

    // between passes: infer the insert-size distribution from the data
    if paired {
        state.pair_stats = index.infer_pair_stats(&opts, &regions);
        log::debug!(
            "inferred insert-size stats: {:?}",
            state.pair_stats.iter().map(|s| (s.low, s.high, s.failed)).collect::<Vec<_>>()
        );
    }
    let pair_stats = state.pair_stats;

    let ctx = FinalizeContext {
        reference,
        opts: &opts,
        pes: &pair_stats,
        mapq_coef: reference.mapq_coef(),
    };
    let frag_id_base = if paired {
        state.n_reads_processed / 2
    } else {
        state.n_reads_processed
    };

    // pass 2: extend, pair, and finalize each fragment
    let finalized: Vec<Vec<Alignment<'r>>> = pool
        .install(|| {
            regions
                .par_chunks_mut(nrf)
                .zip(engine_reads.par_chunks(nrf))
                .enumerate()
                .map(|(i, (frag_regions, frag_reads))| {
                    let id = frag_id_base + i as u64;
                    if paired {
                        pair::finalize_pair(&ctx, id, frag_reads, frag_regions)
                            .map(|[first, second]| vec![first, second])
                    } else {
                        pair::finalize_single(&ctx, id, &frag_reads[0], &mut frag_regions[0])
                            .map(|alignments| vec![alignments])
                    }
                })
                .collect::<Result<Vec<_>>>()
        })?
        .into_iter()
        .flatten()
        .collect();

    let n_reads = engine_reads.len() as u64;
    drop(engine_reads);

    for (offset, alignments) in finalized.into_iter().enumerate() {
        let f = start_frag + (offset / nrf) as i64;
        let r = (offset % nrf) as i32;
        if let Some(read) = batch.get_read_mut(f, r) {
            read.alignments = alignments;
        }
    }

    state.n_reads_processed += n_reads;
    log::debug!("processed {} reads in total", state.n_reads_processed);
    Ok(())
}
