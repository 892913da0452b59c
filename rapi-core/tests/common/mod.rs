//! A scripted engine for exercising the alignment pipeline: candidate
//! regions, pairings, and concrete alignments are all canned.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use rapi_core::engine::{
    Backend, Candidate, ContigMeta, PairStats, Pairing, RawAlignment, ReferenceIndex,
};
use rapi_core::error::Result;
use rapi_core::opts::Opts;
use rapi_core::types::{CigarKind, CigarOp};

#[derive(Clone, Default)]
pub struct ScriptedIndex {
    pub contigs: Vec<ContigMeta>,
    pub l_pac: i64,
    /// Candidate regions keyed by read sequence.
    pub candidates: HashMap<Vec<u8>, Vec<Candidate>>,
    /// Concrete alignments keyed by a candidate's `ref_begin`.
    pub concrete: HashMap<i64, RawAlignment>,
    /// Pairing returned whenever both ends have candidates.
    pub pairing: Option<Pairing>,
    pub stats: [PairStats; 4],
}

impl ReferenceIndex for ScriptedIndex {
    fn contigs(&self) -> &[ContigMeta] {
        &self.contigs
    }

    fn packed_len(&self) -> i64 {
        self.l_pac
    }

    fn align_core(&self, _opts: &Opts, seq: &mut [u8]) -> Vec<Candidate> {
        self.candidates.get(&seq[..]).cloned().unwrap_or_default()
    }

    fn mark_primary(&self, _opts: &Opts, regions: &mut Vec<Candidate>, _id: u64) {
        regions.sort_by(|a, b| b.score.cmp(&a.score));
    }

    fn mate_rescue(
        &self,
        _opts: &Opts,
        _pes: &[PairStats; 4],
        _anchor: &Candidate,
        _mate_seq: &[u8],
        _mate_regions: &mut Vec<Candidate>,
    ) -> usize {
        0
    }

    fn pair(
        &self,
        _opts: &Opts,
        _pes: &[PairStats; 4],
        first: &[Candidate],
        second: &[Candidate],
        _id: u64,
    ) -> Option<Pairing> {
        if first.is_empty() || second.is_empty() {
            return None;
        }
        self.pairing.clone()
    }

    fn extend(&self, _opts: &Opts, _seq: &[u8], region: Option<&Candidate>) -> RawAlignment {
        match region {
            Some(candidate) => self
                .concrete
                .get(&candidate.ref_begin)
                .cloned()
                .unwrap_or_default(),
            None => RawAlignment::default(),
        }
    }

    fn approx_mapq_se(&self, _opts: &Opts, region: &Candidate) -> i32 {
        region.score.min(60)
    }

    fn infer_pair_stats(&self, _opts: &Opts, _regions: &[Vec<Candidate>]) -> [PairStats; 4] {
        self.stats
    }
}

pub struct ScriptedBackend {
    pub index: ScriptedIndex,
}

impl Backend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn version(&self) -> String {
        "0.0-test".to_string()
    }

    fn load_index(&self, _path: &Path) -> Result<Box<dyn ReferenceIndex>> {
        Ok(Box::new(self.index.clone()))
    }
}

pub fn contig_meta(name: &str, len: i64) -> ContigMeta {
    ContigMeta { name: Arc::from(name), len }
}

pub fn candidate(score: i32, ref_begin: i64, ref_end: i64) -> Candidate {
    Candidate { score, ref_begin, ref_end, ..Default::default() }
}

pub fn cigar_ops(ops: &[(u32, CigarKind)]) -> Vec<CigarOp> {
    ops.iter()
        .map(|&(len, kind)| CigarOp::new(kind, len).unwrap())
        .collect()
}

pub fn mapped_raw(
    contig_id: i32,
    pos: i64,
    is_rev: bool,
    mapq: u8,
    cigar: Vec<CigarOp>,
    score: i32,
) -> RawAlignment {
    RawAlignment {
        flag: 0,
        contig_id,
        pos,
        is_rev,
        mapq,
        cigar,
        n_mismatches: 0,
        md: None,
        score,
        sub: -1,
    }
}
