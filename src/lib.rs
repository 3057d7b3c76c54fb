//! Claim-or-defer decisions for simulated retirement benefit claims.
//!
//! `core` holds the decision logic and reference collaborators; `api` exposes
//! it through a CLI and a small HTTP service.

pub mod api;
pub mod core;
