//! Output rendering for alignment results.

pub mod sam;

pub use sam::{format_fragment, format_header};
