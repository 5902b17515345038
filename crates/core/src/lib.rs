pub mod config;
pub mod error;
pub mod types;

pub use config::{
    BanditAlgorithm, EngineConfig, OrchestratorConfig, PolicyConfig, RankingConfig, RewardConfig,
};
pub use error::{DecisionError, DecisionResult};
pub use types::{
    Arm, ContextKey, Customer, Evaluation, InteractionLog, InteractionType, IssueCategory,
    Segment,
};
