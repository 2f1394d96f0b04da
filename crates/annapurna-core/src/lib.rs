//! Core library for Annapurna: profile and macro goals, the daily meal log,
//! water tracking, and AI-backed meal analysis and recipe suggestions.

pub mod ai;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod prompts;
pub mod state;
pub mod storage;

pub use error::{AnnapurnaError, Result};
