//! RAPI core library
//!
//! An engine-agnostic read aligner interface: typed read batches, a
//! pluggable backend contract for seed-and-extend engines, paired-end
//! finalization, and a SAM renderer for the results.

pub mod error;
pub mod tags;
pub mod opts;
pub mod engine;
pub mod reference;
pub mod types;
pub mod batch;
pub mod align;
pub mod io;
pub mod utils;

// Re-export commonly used types and functions
pub use align::align_reads;
pub use batch::{Batch, Read};
pub use engine::{Backend, Candidate, ContigMeta, PairStats, Pairing, RawAlignment, ReferenceIndex};
pub use error::{RapiError, Result};
pub use io::{format_fragment, format_header};
pub use opts::{init, shutdown, AlignerState, EngineOpts, Opts};
pub use reference::{Contig, Reference};
pub use tags::{Param, Tag, Value};
pub use types::{Alignment, CigarKind, CigarOp};

/// Version information for the rapi core library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the aligner interface plug-in layer.
pub fn plugin_version() -> &'static str {
    VERSION
}
