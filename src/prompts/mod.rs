//! Prompt module for LLM-based operations.
//!
//! This module provides the fixed prompt templates used by the summarizer.

pub mod map_reduce;

pub use map_reduce::*;
