//! Deterministic dental "findings" for X-ray samples.
//!
//! The pipeline is `load -> degrade -> enhance -> analyse`. Findings are not
//! detected: they are drawn from a MT19937 stream seeded by a fingerprint of
//! the enhanced image's coarse statistics, so the same image always yields the
//! same report.

pub mod analysis;
pub mod api;
pub mod config;
pub mod dentition;
pub mod error;
pub mod evidence;
pub mod filters;
pub mod findings;
pub mod fingerprint;
pub mod legacy_rng;
pub mod quality;
pub mod report;
pub mod sample;
pub mod session;
