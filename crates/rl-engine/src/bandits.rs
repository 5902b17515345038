//! Multi-Armed Bandit policies — Thompson Sampling and Epsilon-Greedy over a
//! fixed template arm set, with optional per-context state.

use crate::contextual::ContextTable;
use decision_core::{Arm, BanditAlgorithm, ContextKey, DecisionError, DecisionResult, PolicyConfig};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Snapshot of one arm's raw statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArmState {
    Beta { alpha: f64, beta: f64 },
    SampleAverage { total_reward: f64, pulls: u64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArmStatistics {
    pub arm: Arm,
    pub mean: f64,
    /// Evidence behind the estimate: pull count for sample averages,
    /// posterior pseudo-counts beyond the prior for Beta state.
    pub weight: f64,
    pub variance: Option<f64>,
    pub std_dev: Option<f64>,
    pub state: ArmState,
}

/// Selection and learning rule for one kind of arm state.
pub trait BanditStrategy: Send + Sync + 'static {
    type State: Clone + fmt::Debug + Send;

    fn algorithm(&self) -> BanditAlgorithm;

    fn initial_state(&self) -> Self::State;

    /// Index of the arm to play given the states of every arm.
    fn choose(&self, states: &[Self::State], rng: &mut StdRng) -> usize;

    /// Fold an already clamped reward into an arm's state.
    fn observe(&self, state: &mut Self::State, reward: f64);

    fn summarize(&self, arm: &Arm, state: &Self::State) -> ArmStatistics;
}

// ---------------------------------------------------------------------------
// Thompson Sampling
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BetaState {
    pub alpha: f64,
    pub beta: f64,
}

impl BetaState {
    pub fn mean(&self) -> f64 {
        self.alpha / (self.alpha + self.beta)
    }

    pub fn variance(&self) -> f64 {
        let total = self.alpha + self.beta;
        (self.alpha * self.beta) / (total.powi(2) * (total + 1.0))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ThompsonSampling {
    alpha_prior: f64,
    beta_prior: f64,
}

impl ThompsonSampling {
    pub fn new(alpha_prior: f64, beta_prior: f64) -> DecisionResult<Self> {
        for (name, prior) in [("alpha_prior", alpha_prior), ("beta_prior", beta_prior)] {
            if !prior.is_finite() || prior <= 0.0 {
                return Err(DecisionError::InvalidInput(format!(
                    "{name} must be positive and finite, got {prior}"
                )));
            }
        }
        Ok(Self {
            alpha_prior,
            beta_prior,
        })
    }

    fn sample(state: &BetaState, rng: &mut StdRng) -> f64 {
        match Beta::new(state.alpha, state.beta) {
            Ok(dist) => dist.sample(rng),
            Err(_) => state.mean(),
        }
    }
}

impl Default for ThompsonSampling {
    fn default() -> Self {
        Self {
            alpha_prior: 1.0,
            beta_prior: 1.0,
        }
    }
}

impl BanditStrategy for ThompsonSampling {
    type State = BetaState;

    fn algorithm(&self) -> BanditAlgorithm {
        BanditAlgorithm::ThompsonSampling
    }

    fn initial_state(&self) -> BetaState {
        BetaState {
            alpha: self.alpha_prior,
            beta: self.beta_prior,
        }
    }

    fn choose(&self, states: &[BetaState], rng: &mut StdRng) -> usize {
        let mut best_sample = f64::NEG_INFINITY;
        let mut best_idx = 0;

        for (idx, state) in states.iter().enumerate() {
            let sample = Self::sample(state, rng);
            if sample > best_sample {
                best_sample = sample;
                best_idx = idx;
            }
        }

        best_idx
    }

    fn observe(&self, state: &mut BetaState, reward: f64) {
        state.alpha += reward;
        state.beta += 1.0 - reward;
    }

    fn summarize(&self, arm: &Arm, state: &BetaState) -> ArmStatistics {
        let variance = state.variance();
        ArmStatistics {
            arm: arm.clone(),
            mean: state.mean(),
            weight: state.alpha + state.beta - self.alpha_prior - self.beta_prior,
            variance: Some(variance),
            std_dev: Some(variance.sqrt()),
            state: ArmState::Beta {
                alpha: state.alpha,
                beta: state.beta,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Epsilon-Greedy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SampleAverage {
    pub total_reward: f64,
    pub pulls: u64,
}

impl SampleAverage {
    /// Arms that were never pulled report 0.0.
    pub fn mean(&self) -> f64 {
        if self.pulls > 0 {
            self.total_reward / self.pulls as f64
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EpsilonGreedy {
    epsilon: f64,
}

impl EpsilonGreedy {
    pub fn new(epsilon: f64) -> DecisionResult<Self> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(DecisionError::InvalidInput(format!(
                "epsilon must be in [0, 1], got {epsilon}"
            )));
        }
        Ok(Self { epsilon })
    }
}

impl Default for EpsilonGreedy {
    fn default() -> Self {
        Self { epsilon: 0.1 }
    }
}

impl BanditStrategy for EpsilonGreedy {
    type State = SampleAverage;

    fn algorithm(&self) -> BanditAlgorithm {
        BanditAlgorithm::EpsilonGreedy
    }

    fn initial_state(&self) -> SampleAverage {
        SampleAverage::default()
    }

    fn choose(&self, states: &[SampleAverage], rng: &mut StdRng) -> usize {
        if rng.gen::<f64>() < self.epsilon {
            return rng.gen_range(0..states.len());
        }

        let mut best_mean = f64::NEG_INFINITY;
        let mut best_idx = 0;

        for (idx, state) in states.iter().enumerate() {
            let mean = state.mean();
            if mean > best_mean {
                best_mean = mean;
                best_idx = idx;
            }
        }

        best_idx
    }

    fn observe(&self, state: &mut SampleAverage, reward: f64) {
        state.total_reward += reward;
        state.pulls += 1;
    }

    fn summarize(&self, arm: &Arm, state: &SampleAverage) -> ArmStatistics {
        ArmStatistics {
            arm: arm.clone(),
            mean: state.mean(),
            weight: state.pulls as f64,
            variance: None,
            std_dev: None,
            state: ArmState::SampleAverage {
                total_reward: state.total_reward,
                pulls: state.pulls,
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Policy
// ---------------------------------------------------------------------------

/// Arm selection contract shared by every bandit strategy.
pub trait DecisionPolicy: Send + Sync {
    fn algorithm(&self) -> BanditAlgorithm;

    fn arms(&self) -> &[Arm];

    /// Pick an arm for `context` (`None` = global state).
    fn select(&self, context: Option<ContextKey>) -> Arm;

    /// Fold `reward`, clamped to [0, 1], into the state of `arm` under `context`.
    fn update(&self, context: Option<ContextKey>, arm: &Arm, reward: f64) -> DecisionResult<()>;

    /// Per-arm statistics in configured arm order.
    fn get_statistics(&self, context: Option<ContextKey>) -> Vec<ArmStatistics>;

    /// Contexts that have seen a `select` or `update`, global excluded.
    fn list_contexts(&self) -> Vec<ContextKey>;

    fn reset(&self);
}

struct PolicyState<T> {
    table: ContextTable<T>,
    rng: StdRng,
}

/// Bandit over a fixed arm set. All mutable state sits behind one lock that
/// is held for a single select, update or snapshot.
pub struct BanditPolicy<S: BanditStrategy> {
    strategy: S,
    arms: Vec<Arm>,
    index: HashMap<Arm, usize>,
    inner: Mutex<PolicyState<S::State>>,
}

impl<S: BanditStrategy> BanditPolicy<S> {
    pub fn new(arms: Vec<Arm>, strategy: S, seed: Option<u64>) -> DecisionResult<Self> {
        if arms.is_empty() {
            return Err(DecisionError::EmptyArmSet);
        }

        let mut index = HashMap::with_capacity(arms.len());
        for (idx, arm) in arms.iter().enumerate() {
            if index.insert(arm.clone(), idx).is_some() {
                return Err(DecisionError::InvalidInput(format!("duplicate arm: {arm}")));
            }
        }

        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let prior = vec![strategy.initial_state(); arms.len()];

        tracing::info!(
            algorithm = ?strategy.algorithm(),
            arms = arms.len(),
            seeded = seed.is_some(),
            "bandit policy initialized"
        );

        Ok(Self {
            strategy,
            arms,
            index,
            inner: Mutex::new(PolicyState {
                table: ContextTable::new(prior),
                rng,
            }),
        })
    }
}

impl BanditPolicy<ThompsonSampling> {
    pub fn thompson(
        arms: Vec<Arm>,
        alpha_prior: f64,
        beta_prior: f64,
        seed: Option<u64>,
    ) -> DecisionResult<Self> {
        Self::new(arms, ThompsonSampling::new(alpha_prior, beta_prior)?, seed)
    }
}

impl BanditPolicy<EpsilonGreedy> {
    pub fn epsilon_greedy(arms: Vec<Arm>, epsilon: f64, seed: Option<u64>) -> DecisionResult<Self> {
        Self::new(arms, EpsilonGreedy::new(epsilon)?, seed)
    }
}

impl<S: BanditStrategy> DecisionPolicy for BanditPolicy<S> {
    fn algorithm(&self) -> BanditAlgorithm {
        self.strategy.algorithm()
    }

    fn arms(&self) -> &[Arm] {
        &self.arms
    }

    fn select(&self, context: Option<ContextKey>) -> Arm {
        let idx = {
            let mut guard = self.inner.lock();
            let PolicyState { table, rng } = &mut *guard;
            let states = table.states_mut(context);
            self.strategy.choose(states, rng)
        };

        let arm = &self.arms[idx];
        tracing::debug!(
            context = ?context,
            arm = %arm,
            "arm selected"
        );
        arm.clone()
    }

    fn update(&self, context: Option<ContextKey>, arm: &Arm, reward: f64) -> DecisionResult<()> {
        let idx = *self
            .index
            .get(arm)
            .ok_or_else(|| DecisionError::UnknownArm(arm.to_string()))?;
        if reward.is_nan() {
            return Err(DecisionError::InvalidInput("reward must not be NaN".into()));
        }
        let reward = reward.clamp(0.0, 1.0);

        {
            let mut guard = self.inner.lock();
            let states = guard.table.states_mut(context);
            self.strategy.observe(&mut states[idx], reward);
        }

        tracing::debug!(context = ?context, arm = %arm, reward, "policy updated");
        Ok(())
    }

    fn get_statistics(&self, context: Option<ContextKey>) -> Vec<ArmStatistics> {
        let snapshot = self.inner.lock().table.states(context).to_vec();
        self.arms
            .iter()
            .zip(snapshot.iter())
            .map(|(arm, state)| self.strategy.summarize(arm, state))
            .collect()
    }

    fn list_contexts(&self) -> Vec<ContextKey> {
        self.inner.lock().table.contexts()
    }

    fn reset(&self) {
        self.inner.lock().table.reset();
        tracing::info!(algorithm = ?self.strategy.algorithm(), "bandit policy reset");
    }
}

/// Build the policy described by `config`.
pub fn build_policy(config: &PolicyConfig) -> DecisionResult<Arc<dyn DecisionPolicy>> {
    let arms: Vec<Arm> = config.arms.iter().map(|a| Arm::new(a.as_str())).collect();

    let policy: Arc<dyn DecisionPolicy> = match config.algorithm {
        BanditAlgorithm::ThompsonSampling => Arc::new(BanditPolicy::thompson(
            arms,
            config.alpha_prior,
            config.beta_prior,
            config.seed,
        )?),
        BanditAlgorithm::EpsilonGreedy => Arc::new(BanditPolicy::epsilon_greedy(
            arms,
            config.epsilon,
            config.seed,
        )?),
    };
    Ok(policy)
}
