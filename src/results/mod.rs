//! Response classification and merging.
//!
//! Turns raw per-endpoint outcomes into typed responses and one merged,
//! origin-tagged row set.

pub mod normalizer;

pub use normalizer::*;
