//! # Pipeline Models
//!
//! The records handed from one pipeline stage to the next:
//!
//! `Candidate` → `ResolvedHost` / `ProbeResult` → `LiveSubdomain` → `RiskRecord` → `ScanResult`

pub mod candidate;
pub mod host;
pub mod risk;
pub mod scan;

pub use candidate::Candidate;
pub use host::{LiveSubdomain, ProbeResult, ProbeStatus, RecordType, Resolution, ResolvedHost, Scheme};
pub use risk::{RiskRecord, RiskScore, RiskTier, TierBoundaries};
pub use scan::{ScanResult, ScanStats, SubdomainEntry};
