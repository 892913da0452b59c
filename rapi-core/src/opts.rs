//! Library options and aligner state.
//!
//! [`Opts`] carries the interface-level knobs plus an engine parameter block
//! ([`EngineOpts`]) whose defaults mirror BWA-MEM.  A process-wide options
//! cell can be installed with [`init`] and torn down with [`shutdown`];
//! [`AlignerState`] clones its options at construction so per-call overrides
//! never leak into the library-wide configuration.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::engine::PairStats;
use crate::error::Result;
use crate::tags::Param;

/// Quality scores encoded with an offset of 33 (Sanger).
pub const QUALITY_ENCODING_SANGER: i32 = 33;
/// Quality scores encoded with an offset of 64 (Illumina 1.3+).
pub const QUALITY_ENCODING_ILLUMINA: i32 = 64;

/// Engine scoring and chaining parameters.
///
/// Defaults are the BWA-MEM values; engines that honor only a subset may
/// ignore the rest when `Opts::ignore_unsupported` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOpts {
    pub match_score: i32,
    pub mismatch_penalty: i32,
    pub gap_open: i32,
    pub gap_extend: i32,
    pub band_width: i32,
    /// Minimum score for a candidate to be reported.
    pub score_threshold: i32,
    pub zdrop: i32,
    /// Penalty subtracted when scoring two ends as unpaired.
    pub pen_unpaired: i32,
    pub pen_clip: i32,
    pub min_seed_len: i32,
    pub split_width: i32,
    pub max_occ: i32,
    pub max_chain_gap: i32,
    pub max_ins: i32,
    pub mask_level: f32,
    pub chain_drop_ratio: f32,
    pub split_factor: f32,
    pub chunk_size: i64,
    /// Cap on mate-rescue attempts per end.
    pub max_matesw: i32,
    pub mask_level_redun: f32,
    pub mapq_coef_len: i32,

    /// Disable Smith-Waterman mate rescue.
    pub skip_mate_rescue: bool,
    /// Disable pairing; each end is finalized independently.
    pub skip_pairing: bool,
    /// Also report candidates demoted to secondary.
    pub report_all: bool,
}

impl Default for EngineOpts {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_penalty: 4,
            gap_open: 6,
            gap_extend: 1,
            band_width: 100,
            score_threshold: 30,
            zdrop: 100,
            pen_unpaired: 17,
            pen_clip: 5,
            min_seed_len: 19,
            split_width: 10,
            max_occ: 10_000,
            max_chain_gap: 10_000,
            max_ins: 10_000,
            mask_level: 0.50,
            chain_drop_ratio: 0.50,
            split_factor: 1.5,
            chunk_size: 10_000_000,
            max_matesw: 100,
            mask_level_redun: 0.95,
            mapq_coef_len: 50,
            skip_mate_rescue: false,
            skip_pairing: false,
            report_all: false,
        }
    }
}

/// Interface-level options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Opts {
    /// Silently ignore options the engine does not support instead of
    /// failing.
    pub ignore_unsupported: bool,
    /// Minimum mapping quality for reported alignments.
    pub mapq_min: i32,
    pub isize_min: i32,
    pub isize_max: i32,
    /// Worker threads used by the alignment passes.
    pub n_threads: usize,
    /// Share reference memory with other processes when the engine supports
    /// it.
    pub share_ref_mem: bool,
    /// Engine-specific parameters passed through verbatim.
    pub parameters: Vec<Param>,
    pub engine: EngineOpts,
}

impl Default for Opts {
    fn default() -> Self {
        let engine = EngineOpts::default();
        Self {
            ignore_unsupported: true,
            mapq_min: 0,
            isize_min: 0,
            isize_max: engine.max_ins,
            n_threads: 1,
            share_ref_mem: false,
            parameters: Vec::new(),
            engine,
        }
    }
}

static LIBRARY_OPTS: Mutex<Option<Opts>> = Mutex::new(None);

/// Install the process-wide options, replacing any previous configuration.
/// Passing `None` installs the defaults.
pub fn init(opts: Option<&Opts>) -> Result<()> {
    let mut cell = LIBRARY_OPTS.lock().unwrap_or_else(|e| e.into_inner());
    *cell = Some(opts.cloned().unwrap_or_default());
    Ok(())
}

/// Release the process-wide options.
pub fn shutdown() -> Result<()> {
    let mut cell = LIBRARY_OPTS.lock().unwrap_or_else(|e| e.into_inner());
    *cell = None;
    Ok(())
}

fn library_opts() -> Opts {
    let cell = LIBRARY_OPTS.lock().unwrap_or_else(|e| e.into_inner());
    cell.clone().unwrap_or_default()
}

/// Per-call aligner state: a private options copy, the running processed-read
/// counter, and the inferred insert-size statistics of the last paired batch.
#[derive(Debug, Clone)]
pub struct AlignerState {
    pub(crate) opts: Opts,
    pub(crate) n_reads_processed: u64,
    pub(crate) pair_stats: [PairStats; 4],
}

impl AlignerState {
    /// Create a state from the given options, falling back to the
    /// library-wide configuration (or the defaults) when `opts` is `None`.
    pub fn new(opts: Option<&Opts>) -> Self {
        Self {
            opts: opts.cloned().unwrap_or_else(library_opts),
            n_reads_processed: 0,
            pair_stats: [PairStats::default(); 4],
        }
    }

    pub fn opts(&self) -> &Opts {
        &self.opts
    }

    /// Total reads aligned through this state.
    pub fn reads_processed(&self) -> u64 {
        self.n_reads_processed
    }

    /// Insert-size statistics inferred during the most recent paired
    /// alignment call, indexed by orientation.
    pub fn pair_stats(&self) -> &[PairStats; 4] {
        &self.pair_stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_defaults_mirror_bwa_mem() {
        let eng = EngineOpts::default();
        assert_eq!(eng.match_score, 1);
        assert_eq!(eng.mismatch_penalty, 4);
        assert_eq!(eng.gap_open, 6);
        assert_eq!(eng.gap_extend, 1);
        assert_eq!(eng.band_width, 100);
        assert_eq!(eng.score_threshold, 30);
        assert_eq!(eng.zdrop, 100);
        assert_eq!(eng.pen_unpaired, 17);
        assert_eq!(eng.pen_clip, 5);
        assert_eq!(eng.min_seed_len, 19);
        assert_eq!(eng.split_width, 10);
        assert_eq!(eng.max_occ, 10_000);
        assert_eq!(eng.max_chain_gap, 10_000);
        assert_eq!(eng.max_ins, 10_000);
        assert_eq!(eng.mask_level, 0.50);
        assert_eq!(eng.chain_drop_ratio, 0.50);
        assert_eq!(eng.split_factor, 1.5);
        assert_eq!(eng.chunk_size, 10_000_000);
        assert_eq!(eng.max_matesw, 100);
        assert_eq!(eng.mask_level_redun, 0.95);
        assert_eq!(eng.mapq_coef_len, 50);
    }

    #[test]
    fn isize_window_follows_engine_default() {
        let opts = Opts::default();
        assert_eq!(opts.isize_min, 0);
        assert_eq!(opts.isize_max, opts.engine.max_ins);
        assert!(opts.ignore_unsupported);
        assert_eq!(opts.n_threads, 1);
    }

    #[test]
    fn state_clones_do_not_leak_into_library_config() {
        let mut custom = Opts::default();
        custom.n_threads = 7;
        init(Some(&custom)).unwrap();

        let mut state = AlignerState::new(None);
        assert_eq!(state.opts().n_threads, 7);

        // mutating the state copy must not touch the installed options
        state.opts.n_threads = 1;
        let fresh = AlignerState::new(None);
        assert_eq!(fresh.opts().n_threads, 7);

        shutdown().unwrap();
        let after = AlignerState::new(None);
        assert_eq!(after.opts().n_threads, 1);
    }

    #[test]
    fn explicit_opts_override_library_config() {
        let mut custom = Opts::default();
        custom.engine.score_threshold = 5;
        let state = AlignerState::new(Some(&custom));
        assert_eq!(state.opts().engine.score_threshold, 5);
        assert_eq!(state.reads_processed(), 0);
        assert!(state.pair_stats().iter().all(|s| s.failed));
    }
}
