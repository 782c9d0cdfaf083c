#![recursion_limit = "256"]

//! x-vector speaker embeddings on VoxCeleb1 with Burn.
//!
//! `application::train_use_case` runs the whole recipe;
//! `application::extract_use_case` reuses its checkpoints.

pub mod application;
pub mod cli;
pub mod config;
pub mod data;
pub mod domain;
pub mod infra;
pub mod ml;
