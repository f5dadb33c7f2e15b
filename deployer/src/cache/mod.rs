//! Caches

pub mod artifacts;
