pub mod archive;
pub mod cli;
pub mod client;
pub mod error;
pub mod models;
pub mod pipelines;
pub mod processors;
pub mod readers;
pub mod settings;
pub mod storage;
pub mod utils;
pub mod writers;

pub use error::{ProcessingError, Result};
pub use settings::Settings;
