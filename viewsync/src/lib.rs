pub mod cli;
pub mod conversion;
pub mod elastic;
pub mod http;
pub mod load_config;
pub mod storage;

pub use cli::{run, Cli, Commands};
