//! Unit test suite

mod test_build;
mod test_cache;
mod test_pipeline;
mod test_supervisor;
