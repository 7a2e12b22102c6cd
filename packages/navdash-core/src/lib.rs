//! Ordering and reconciliation engine for a bookmark dashboard.
//!
//! Groups own ordered sites. The pieces, leaves first:
//! - [`storage`]: the persistence capability and an in-memory backend
//! - [`ordering`]: drag gesture -> new sequence -> contiguous order indices
//! - [`edit_mode`]: Viewing / ReorderingGroups / ReorderingSites(group)
//! - [`sync`]: mutate-then-reload controller owning the [`replica`]
//! - [`merge`]: import reconciliation against current state
pub mod config;
pub mod document;
pub mod edit_mode;
pub mod icon;
pub mod merge;
pub mod ordering;
pub mod replica;
pub mod storage;
pub mod sync;
pub mod types;
