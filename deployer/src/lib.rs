//! Wardeploy Library
//!
//! Builds a Maven project and redeploys its web archives into a local Tomcat.

pub mod app;
pub mod cache;
pub mod deploy;
pub mod errors;
pub mod filesys;
pub mod http;
pub mod logs;
pub mod services;
pub mod storage;
pub mod terminal;
pub mod utils;
