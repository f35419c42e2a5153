// Library for tests to access modules

pub mod analysis;
pub mod checkpoint_store;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod result_writer;
pub mod sampler;
pub mod sizing;
pub mod source;
pub mod version;
