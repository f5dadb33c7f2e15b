//! Storage and configuration

pub mod layout;
pub mod settings;
