//! Food-image analysis service
//!
//! Turns a photo of food into a structured nutrition estimate (label,
//! calories, weight, macros) with explicit uncertainty and provenance,
//! falling back across inference backends down to an offline stub.

pub mod ai;
pub mod analysis;
pub mod app;
pub mod backend;
pub mod error;
pub mod models;
pub mod priors;
pub mod prompts;
pub mod server;
pub mod source;

pub use error::{Error, Result};
