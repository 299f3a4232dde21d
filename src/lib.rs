pub mod browser;
pub mod config;
pub mod fetch;
pub mod output;
pub mod scoring;
pub mod service;
pub mod session;
pub mod stderr_buffer;
