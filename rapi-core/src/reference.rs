//! The reference catalog.
//!
//! A [`Reference`] owns a loaded engine index plus the decoded contig
//! metadata.  The catalog is immutable after load; alignments borrow their
//! contig entries from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::engine::{Backend, ReferenceIndex};
use crate::error::Result;

/// One named reference sequence.
#[derive(Debug, Clone)]
pub struct Contig {
    /// Contig name, shared with the engine's string table.
    pub name: Arc<str>,
    pub len: i64,
    pub assembly_identifier: Option<String>,
    pub species: Option<String>,
    pub uri: Option<String>,
    pub md5: Option<String>,
}

impl Contig {
    pub fn new(name: Arc<str>, len: i64) -> Self {
        Self {
            name,
            len,
            assembly_identifier: None,
            species: None,
            uri: None,
            md5: None,
        }
    }
}

/// A loaded reference: the engine index handle plus the contig catalog.
pub struct Reference {
    path: PathBuf,
    contigs: Vec<Contig>,
    index: Box<dyn ReferenceIndex>,
    aligner_name: String,
    aligner_version: String,
    mapq_coef: i32,
}

impl Reference {
    /// Load the reference index at `path` through `backend`.
    ///
    /// Either the whole catalog is built or nothing is: on failure no
    /// partially-initialized reference escapes.
    pub fn load(backend: &dyn Backend, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let index = backend.load_index(path)?;
        let contigs = index
            .contigs()
            .iter()
            .map(|meta| Contig::new(meta.name.clone(), meta.len))
            .collect::<Vec<_>>();
        log::info!(
            "loaded reference {} with {} contigs via {}",
            path.display(),
            contigs.len(),
            backend.name()
        );
        Ok(Self {
            path: path.to_path_buf(),
            contigs,
            index,
            aligner_name: backend.name().to_string(),
            aligner_version: backend.version(),
            mapq_coef: backend.mapq_coef(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn n_contigs(&self) -> usize {
        self.contigs.len()
    }

    pub fn contigs(&self) -> &[Contig] {
        &self.contigs
    }

    pub fn contig(&self, i: usize) -> Option<&Contig> {
        self.contigs.get(i)
    }

    /// Name of the engine this reference was loaded with.
    pub fn aligner_name(&self) -> &str {
        &self.aligner_name
    }

    /// Version of the engine this reference was loaded with.
    pub fn aligner_version(&self) -> &str {
        &self.aligner_version
    }

    pub(crate) fn index(&self) -> &dyn ReferenceIndex {
        self.index.as_ref()
    }

    pub(crate) fn mapq_coef(&self) -> i32 {
        self.mapq_coef
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Candidate, ContigMeta, PairStats, Pairing, RawAlignment};
    use crate::opts::Opts;

    #[derive(Clone)]
    struct FixedIndex {
        contigs: Vec<ContigMeta>,
    }

    impl ReferenceIndex for FixedIndex {
        fn contigs(&self) -> &[ContigMeta] {
            &self.contigs
        }

        fn packed_len(&self) -> i64 {
            self.contigs.iter().map(|c| c.len).sum()
        }

        fn align_core(&self, _opts: &Opts, _seq: &mut [u8]) -> Vec<Candidate> {
            Vec::new()
        }

        fn mark_primary(&self, _opts: &Opts, _regions: &mut Vec<Candidate>, _id: u64) {}

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
            _first: &[Candidate],
            _second: &[Candidate],
            _id: u64,
        ) -> Option<Pairing> {
            None
        }

        fn extend(&self, _opts: &Opts, _seq: &[u8], _region: Option<&Candidate>) -> RawAlignment {
            RawAlignment::default()
        }

        fn approx_mapq_se(&self, _opts: &Opts, _region: &Candidate) -> i32 {
            0
        }

        fn infer_pair_stats(&self, _opts: &Opts, _regions: &[Vec<Candidate>]) -> [PairStats; 4] {
            [PairStats::default(); 4]
        }
    }

    struct FixedBackend;

    impl Backend for FixedBackend {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn version(&self) -> String {
            "1.0".to_string()
        }

        fn load_index(&self, _path: &Path) -> Result<Box<dyn ReferenceIndex>> {
            Ok(Box::new(FixedIndex {
                contigs: vec![
                    ContigMeta { name: Arc::from("chr1"), len: 1000 },
                    ContigMeta { name: Arc::from("chr2"), len: 500 },
                ],
            }))
        }
    }

    #[test]
    fn load_copies_the_contig_catalog() {
        let reference = Reference::load(&FixedBackend, "some/index").unwrap();
        assert_eq!(reference.n_contigs(), 2);
        assert_eq!(&*reference.contigs()[0].name, "chr1");
        assert_eq!(reference.contigs()[0].len, 1000);
        assert_eq!(&*reference.contig(1).unwrap().name, "chr2");
        assert!(reference.contig(2).is_none());
        assert_eq!(reference.aligner_name(), "fixed");
        assert_eq!(reference.aligner_version(), "1.0");
        assert_eq!(reference.path(), Path::new("some/index"));
    }
}
