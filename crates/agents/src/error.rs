use decision_core::DecisionError;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generation,
    Evaluation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Generation => f.write_str("generation"),
            Stage::Evaluation => f.write_str("evaluation"),
        }
    }
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("{stage} failed for customer {customer_id}: {source:#}")]
    Collaborator {
        stage: Stage,
        customer_id: String,
        #[source]
        source: anyhow::Error,
    },

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error("Interaction task failed: {0}")]
    Task(String),
}
