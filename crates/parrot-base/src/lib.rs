//! Shared building blocks for the parrot streaming speech workspace.

pub mod logging;
pub mod pcm;

pub use logging::{FileLogger, StdoutLogger, init_file_logger, init_stdout_logger, level_from_env};
pub use pcm::PcmChunk;

// Re-export log crate so downstream crates can use parrot_base::log::*
pub use log;
