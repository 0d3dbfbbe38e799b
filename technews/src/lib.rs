// Library interface for the technews pipeline
// This allows tests and the smoke-test binaries to import modules

pub mod agent;
pub mod collector;
pub mod error;
pub mod llm;
pub mod models;
pub mod notifier;
pub mod schedule;
pub mod worker;
