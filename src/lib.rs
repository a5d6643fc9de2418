pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod speedrun;
pub mod storage;
pub mod utils;
