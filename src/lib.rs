pub mod app;
pub mod bridge;
pub mod config;
pub mod engine;
pub mod jobs;
pub mod shared;
pub mod translate;
