//! quizmark-core: quiz attempt lifecycle and automatic grading.
//!
//! This crate defines the data model, the storage collaborator traits, the
//! answer grading engine, and the attempt orchestrator that the rest of
//! quizmark builds on.

pub mod config;
pub mod engine;
pub mod error;
pub mod grading;
pub mod model;
pub mod orchestrator;
pub mod parser;
pub mod report;
pub mod statistics;
pub mod traits;

pub use error::{GradingError, QuizError};
pub use orchestrator::{AttemptOrchestrator, OrchestratorConfig, SubmitOutcome};
