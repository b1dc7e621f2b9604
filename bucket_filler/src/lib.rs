pub mod config;
pub mod coordinator;
pub mod generator;
pub mod handler;
pub mod memory;
pub mod task;
