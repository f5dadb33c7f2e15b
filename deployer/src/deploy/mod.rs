//! Deployment module

pub mod build;
pub mod executor;
pub mod style;
pub mod toolchain;
