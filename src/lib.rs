//! # trainkit
//!
//! Helpers for neural-network training loops: a checkpoint manager with retention
//! and best-metric tracking, and a multi-model evaluation driver.
//!
//! ## Modules
//!
//! - [`checkpoint`] — State dicts, checkpoint files, and the checkpoint manager
//! - [`evaluation`] — Evaluator, model mode switching, and metric helpers
//! - [`registry`] — Named collections of borrowed models and checkpointables
//! - [`config`] — TOML configuration loading and validation
//! - [`error`] — Structured error types

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod evaluation;
pub mod registry;
