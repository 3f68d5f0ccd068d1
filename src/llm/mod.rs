//! Generative model integration module

pub mod client;
pub mod retry;
pub mod prompts;
pub mod parser;
