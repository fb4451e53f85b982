#![recursion_limit = "256"]

//! Hierarchical (layer-graph) and self-critical transformer encoders
//! with training-time activation noising, built on Burn.

pub mod application;
pub mod cli;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
