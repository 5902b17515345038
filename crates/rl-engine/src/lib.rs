//! Reinforcement Learning engine — multi-armed bandits (Thompson Sampling,
//! Epsilon-Greedy) with context-keyed state, and reward shaping for
//! evaluator feedback.

pub mod bandits;
pub mod contextual;
pub mod reward;

pub use bandits::{
    build_policy, ArmState, ArmStatistics, BanditPolicy, BanditStrategy, DecisionPolicy,
    EpsilonGreedy, ThompsonSampling,
};
pub use contextual::ContextTable;
pub use reward::{reward, RewardTransform};
