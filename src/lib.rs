pub mod app;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod engine;
pub mod normalize;
pub mod output;
pub mod priors;
pub mod query;
pub mod search;
