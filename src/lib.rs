pub mod config;
pub mod fetch;
pub mod input;
pub mod process;
