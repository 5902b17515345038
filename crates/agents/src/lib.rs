//! Interaction orchestration — drives the select → generate → evaluate →
//! update cycle against external message generation and evaluation services.

pub mod collaborators;
pub mod error;
pub mod manager;
pub mod processor;
pub mod retry;

pub use collaborators::{GenerationRequest, MessageEvaluator, MessageGenerator};
pub use error::{AgentError, Stage};
pub use manager::{InteractionFailure, InteractionLoop, IterationReport};
pub use processor::InteractionProcessor;
pub use retry::RetryPolicy;
