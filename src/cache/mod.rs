//! Short-lived response caching for outbound catalog requests.
//!
//! This module provides:
//! - Deterministic cache keys derived from an endpoint and its parameters
//! - A concurrent in-memory store with per-entry TTL and lazy expiry
//! - A transport decorator that serves repeated reads from that store

mod clock;
mod gateway;
mod key;
mod memory;

pub use clock::{Clock, ManualClock, SystemClock};
pub use gateway::CachingGateway;
pub use key::{canonical_key, hash, sanitize, KeyDigest};
pub use memory::{CacheEntry, CacheStats, ResponseCache, CLEANUP_BATCH};
