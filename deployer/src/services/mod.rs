//! Supervision of the container and its auxiliary services

pub mod process;
