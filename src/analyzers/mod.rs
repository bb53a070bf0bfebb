//! Offline analysis of a finished recording.
//!
//! This module derives per-vehicle speeds between consecutive samples,
//! summarizes how many vehicles fall into a speed band, and groups
//! speeding samples into spatial hotspots.

pub mod analyzer;
pub mod hotspot;
pub mod speed;
pub mod types;
pub mod utility;
