use crate::error::{DecisionError, DecisionResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root engine configuration. Loaded from environment variables with the
/// prefix `DECISION_ENGINE__` and an optional config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub reward: RewardConfig,
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BanditAlgorithm {
    #[default]
    ThompsonSampling,
    EpsilonGreedy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    #[serde(default)]
    pub algorithm: BanditAlgorithm,
    #[serde(default = "default_arms")]
    pub arms: Vec<String>,
    #[serde(default = "default_prior")]
    pub alpha_prior: f64,
    #[serde(default = "default_prior")]
    pub beta_prior: f64,
    /// Exploration probability, only read by epsilon-greedy.
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    /// Fixes the policy's random stream when set.
    #[serde(default)]
    pub seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default = "default_issue_weight")]
    pub issue_weight: f64,
    #[serde(default = "default_price_weight")]
    pub price_weight: f64,
    #[serde(default = "default_recency_weight")]
    pub recency_weight: f64,
}

/// Weights of the evaluation sub-scores in the shaped reward.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_satisfaction_weight")]
    pub satisfaction_weight: f64,
    #[serde(default = "default_engagement_weight")]
    pub engagement_weight: f64,
    #[serde(default = "default_churn_weight")]
    pub churn_weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Group policy state by segment x issue category. When false every
    /// interaction updates the global state.
    #[serde(default = "default_contextual")]
    pub contextual: bool,
    /// How many non-vocal customers are contacted per iteration.
    #[serde(default = "default_outreach_capacity")]
    pub outreach_capacity: usize,
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,
    /// Attempts per collaborator call, including the first.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Retry `n` sleeps `backoff_factor^n` seconds.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

fn default_arms() -> Vec<String> {
    ["empathetic", "technical", "coupon", "escalate", "follow_up"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}
fn default_prior() -> f64 {
    1.0
}
fn default_epsilon() -> f64 {
    0.1
}
fn default_issue_weight() -> f64 {
    0.5
}
fn default_price_weight() -> f64 {
    0.3
}
fn default_recency_weight() -> f64 {
    0.2
}
fn default_satisfaction_weight() -> f64 {
    0.6
}
fn default_engagement_weight() -> f64 {
    0.3
}
fn default_churn_weight() -> f64 {
    0.3
}
fn default_contextual() -> bool {
    true
}
fn default_outreach_capacity() -> usize {
    10
}
fn default_max_concurrency() -> usize {
    8
}
fn default_max_retries() -> u32 {
    3
}
fn default_backoff_factor() -> f64 {
    1.5
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            algorithm: BanditAlgorithm::default(),
            arms: default_arms(),
            alpha_prior: default_prior(),
            beta_prior: default_prior(),
            epsilon: default_epsilon(),
            seed: None,
        }
    }
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            issue_weight: default_issue_weight(),
            price_weight: default_price_weight(),
            recency_weight: default_recency_weight(),
        }
    }
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            satisfaction_weight: default_satisfaction_weight(),
            engagement_weight: default_engagement_weight(),
            churn_weight: default_churn_weight(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            contextual: default_contextual(),
            outreach_capacity: default_outreach_capacity(),
            max_concurrency: default_max_concurrency(),
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    pub fn load() -> DecisionResult<Self> {
        Self::load_from(None)
    }

    /// Load configuration from an optional file, with environment variables
    /// layered on top.
    pub fn load_from(path: Option<&Path>) -> DecisionResult<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("DECISION_ENGINE")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("policy.arms"),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> DecisionResult<()> {
        self.policy.validate()?;
        self.ranking.validate()?;
        self.reward.validate()?;
        self.orchestrator.validate()
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> DecisionResult<()> {
        if self.arms.is_empty() {
            return Err(DecisionError::EmptyArmSet);
        }
        for (name, prior) in [("alpha_prior", self.alpha_prior), ("beta_prior", self.beta_prior)] {
            if !prior.is_finite() || prior <= 0.0 {
                return Err(DecisionError::InvalidInput(format!(
                    "{name} must be positive and finite, got {prior}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(DecisionError::InvalidInput(format!(
                "epsilon must be in [0, 1], got {}",
                self.epsilon
            )));
        }
        Ok(())
    }
}

impl RankingConfig {
    pub fn validate(&self) -> DecisionResult<()> {
        for (name, weight) in [
            ("issue_weight", self.issue_weight),
            ("price_weight", self.price_weight),
            ("recency_weight", self.recency_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(DecisionError::InvalidInput(format!(
                    "{name} must be non-negative and finite, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

impl RewardConfig {
    pub fn validate(&self) -> DecisionResult<()> {
        for (name, weight) in [
            ("satisfaction_weight", self.satisfaction_weight),
            ("engagement_weight", self.engagement_weight),
            ("churn_weight", self.churn_weight),
        ] {
            if !weight.is_finite() || weight < 0.0 {
                return Err(DecisionError::InvalidInput(format!(
                    "{name} must be non-negative and finite, got {weight}"
                )));
            }
        }
        Ok(())
    }
}

impl OrchestratorConfig {
    pub fn validate(&self) -> DecisionResult<()> {
        if self.max_concurrency == 0 {
            return Err(DecisionError::Config(
                "max_concurrency must be at least 1".into(),
            ));
        }
        if self.max_retries == 0 {
            return Err(DecisionError::Config("max_retries must be at least 1".into()));
        }
        if !self.backoff_factor.is_finite() || self.backoff_factor < 0.0 {
            return Err(DecisionError::Config(format!(
                "backoff_factor must be non-negative, got {}",
                self.backoff_factor
            )));
        }
        Ok(())
    }
}
