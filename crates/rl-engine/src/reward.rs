//! Reward shaping — turns an evaluator verdict into a bounded [0, 1] reward.

use decision_core::{DecisionResult, Evaluation, RewardConfig};
use serde::{Deserialize, Serialize};

/// Weighted blend of the evaluation sub-scores. Satisfaction dominates,
/// engagement is rewarded and churn risk is penalised at the same weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RewardTransform {
    pub satisfaction_weight: f64,
    pub engagement_weight: f64,
    pub churn_weight: f64,
}

impl Default for RewardTransform {
    fn default() -> Self {
        Self {
            satisfaction_weight: 0.6,
            engagement_weight: 0.3,
            churn_weight: 0.3,
        }
    }
}

impl RewardTransform {
    pub fn from_config(config: &RewardConfig) -> DecisionResult<Self> {
        config.validate()?;
        Ok(Self {
            satisfaction_weight: config.satisfaction_weight,
            engagement_weight: config.engagement_weight,
            churn_weight: config.churn_weight,
        })
    }

    /// Unbounded weighted score on the satisfaction (0-10) scale.
    pub fn raw_score(&self, evaluation: &Evaluation) -> DecisionResult<f64> {
        evaluation.validate()?;
        Ok(self.satisfaction_weight * evaluation.satisfaction
            + self.engagement_weight * (evaluation.engagement * 10.0)
            - self.churn_weight * (evaluation.churn * 10.0))
    }

    pub fn reward(&self, evaluation: &Evaluation) -> DecisionResult<f64> {
        let raw = self.raw_score(evaluation)?;
        Ok((raw / 10.0).clamp(0.0, 1.0))
    }
}

/// Reward under the default weights.
pub fn reward(evaluation: &Evaluation) -> DecisionResult<f64> {
    RewardTransform::default().reward(evaluation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use decision_core::DecisionError;
    use proptest::prelude::*;

    #[test]
    fn test_reward_formula() {
        // 0.6*8 + 0.3*7 - 0.3*2 = 6.3
        let r = reward(&Evaluation::new(8.0, 0.7, 0.2)).unwrap();
        assert!((r - 0.63).abs() < 1e-12);
    }

    #[test]
    fn test_reward_clamped_to_unit_interval() {
        // 0.6*10 + 3 - 0 = 9 -> 0.9, still inside
        assert!((reward(&Evaluation::new(10.0, 1.0, 0.0)).unwrap() - 0.9).abs() < 1e-12);
        // 0 + 0 - 3 = -3 -> clamped to 0
        assert_eq!(reward(&Evaluation::new(0.0, 0.0, 1.0)).unwrap(), 0.0);

        let generous = RewardTransform {
            satisfaction_weight: 2.0,
            ..Default::default()
        };
        assert_eq!(generous.reward(&Evaluation::new(10.0, 1.0, 0.0)).unwrap(), 1.0);
    }

    #[test]
    fn test_from_config() {
        assert_eq!(
            RewardTransform::from_config(&RewardConfig::default()).unwrap(),
            RewardTransform::default()
        );

        let churn_averse = RewardConfig {
            churn_weight: 0.6,
            ..Default::default()
        };
        let transform = RewardTransform::from_config(&churn_averse).unwrap();
        // 0.6*8 + 0.3*7 - 0.6*2 = 5.7
        let r = transform.reward(&Evaluation::new(8.0, 0.7, 0.2)).unwrap();
        assert!((r - 0.57).abs() < 1e-12);

        let negative = RewardConfig {
            satisfaction_weight: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            RewardTransform::from_config(&negative),
            Err(DecisionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_reward_rejects_out_of_domain() {
        for eval in [
            Evaluation::new(11.0, 0.5, 0.5),
            Evaluation::new(-1.0, 0.5, 0.5),
            Evaluation::new(5.0, 1.2, 0.5),
            Evaluation::new(5.0, 0.5, -0.01),
            Evaluation::new(f64::NAN, 0.5, 0.5),
        ] {
            assert!(matches!(reward(&eval), Err(DecisionError::InvalidInput(_))));
        }
    }

    proptest! {
        #[test]
        fn reward_is_bounded(s in 0.0f64..=10.0, e in 0.0f64..=1.0, c in 0.0f64..=1.0) {
            let r = reward(&Evaluation::new(s, e, c)).unwrap();
            prop_assert!((0.0..=1.0).contains(&r));
        }

        #[test]
        fn reward_is_monotone(
            s in 0.0f64..=10.0,
            e in 0.0f64..=1.0,
            c in 0.0f64..=1.0,
            ds in 0.0f64..=10.0,
            de in 0.0f64..=1.0,
            dc in 0.0f64..=1.0,
        ) {
            let base = reward(&Evaluation::new(s, e, c)).unwrap();
            let more_satisfied = reward(&Evaluation::new((s + ds).min(10.0), e, c)).unwrap();
            let more_engaged = reward(&Evaluation::new(s, (e + de).min(1.0), c)).unwrap();
            let more_churn = reward(&Evaluation::new(s, e, (c + dc).min(1.0))).unwrap();
            prop_assert!(more_satisfied >= base);
            prop_assert!(more_engaged >= base);
            prop_assert!(more_churn <= base);
        }
    }
}
