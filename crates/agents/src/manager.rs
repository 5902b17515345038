//! Interaction loop — fans one decision cycle per customer out over tokio
//! tasks: every vocal customer, plus the top-ranked non-vocal customers up
//! to the outreach capacity.

use crate::collaborators::{MessageEvaluator, MessageGenerator};
use crate::error::AgentError;
use crate::processor::InteractionProcessor;
use crate::retry::RetryPolicy;
use decision_core::{Customer, DecisionError, InteractionLog, InteractionType, OrchestratorConfig};
use decision_outreach::OutreachRanker;
use decision_rl_engine::DecisionPolicy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::{self, JoinSet};
use tracing::{info, warn, Instrument};

/// An interaction that did not reach the policy update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionFailure {
    pub customer_id: String,
    pub interaction_type: InteractionType,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IterationReport {
    pub iteration: u32,
    /// Completed interactions, vocal customers first, outreach in rank order.
    pub logs: Vec<InteractionLog>,
    pub failures: Vec<InteractionFailure>,
}

impl IterationReport {
    pub fn mean_reward(&self) -> f64 {
        if self.logs.is_empty() {
            return 0.0;
        }
        self.logs.iter().map(|l| l.reward).sum::<f64>() / self.logs.len() as f64
    }

    pub fn count(&self, interaction_type: InteractionType) -> usize {
        self.logs
            .iter()
            .filter(|l| l.interaction_type == interaction_type)
            .count()
    }
}

/// Drives iterations of the decision cycle over a customer base.
pub struct InteractionLoop<G, E> {
    processor: Arc<InteractionProcessor<G, E>>,
    ranker: OutreachRanker,
    config: OrchestratorConfig,
}

impl<G: MessageGenerator, E: MessageEvaluator> InteractionLoop<G, E> {
    pub fn new(
        policy: Arc<dyn DecisionPolicy>,
        generator: G,
        evaluator: E,
        ranker: OutreachRanker,
        config: OrchestratorConfig,
    ) -> Result<Self, AgentError> {
        let processor = InteractionProcessor::new(
            policy,
            generator,
            evaluator,
            RetryPolicy::from_config(&config),
            config.contextual,
        );
        Self::from_processor(processor, ranker, config)
    }

    /// Drive a preassembled processor, e.g. one with custom reward weights.
    /// Retry and context settings are the processor's own; `config` supplies
    /// the outreach capacity and concurrency bound.
    pub fn from_processor(
        processor: InteractionProcessor<G, E>,
        ranker: OutreachRanker,
        config: OrchestratorConfig,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        if config.max_concurrency > Semaphore::MAX_PERMITS {
            return Err(DecisionError::Config(format!(
                "max_concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                config.max_concurrency
            ))
            .into());
        }

        Ok(Self {
            processor: Arc::new(processor),
            ranker,
            config,
        })
    }

    /// Run one iteration over `customers`. Per-customer failures, including
    /// a panicked interaction task, are collected in the report; only a
    /// malformed candidate pool fails the whole iteration.
    pub async fn run_iteration(
        &self,
        customers: &[Customer],
        iteration: u32,
    ) -> Result<IterationReport, AgentError> {
        let non_vocal: Vec<Customer> = customers.iter().filter(|c| !c.is_vocal).cloned().collect();
        let outreach = self
            .ranker
            .rank(&non_vocal, Some(self.config.outreach_capacity))?;

        let jobs: Vec<(Customer, InteractionType)> = customers
            .iter()
            .filter(|c| c.is_vocal)
            .map(|c| (c.clone(), InteractionType::Vocal))
            .chain(
                outreach
                    .into_iter()
                    .map(|c| (c.clone(), InteractionType::Outreach)),
            )
            .collect();

        info!(
            iteration,
            vocal = jobs.iter().filter(|(_, t)| *t == InteractionType::Vocal).count(),
            outreach = jobs.iter().filter(|(_, t)| *t == InteractionType::Outreach).count(),
            "starting iteration"
        );

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency));
        let mut tasks = JoinSet::new();
        let mut pending: HashMap<task::Id, (usize, String, InteractionType)> = HashMap::new();
        let total = jobs.len();

        for (idx, (customer, interaction_type)) in jobs.into_iter().enumerate() {
            // acquired before spawning so jobs start in order
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| AgentError::Task(e.to_string()))?;
            let processor = Arc::clone(&self.processor);
            let customer_id = customer.customer_id.clone();
            let span = tracing::info_span!(
                "interaction",
                customer_id = %customer_id,
                kind = ?interaction_type
            );

            let handle = tasks.spawn(
                async move {
                    let result = processor
                        .process(&customer, interaction_type, iteration)
                        .await;
                    drop(permit);
                    result
                }
                .instrument(span),
            );
            pending.insert(handle.id(), (idx, customer_id, interaction_type));
        }

        let mut slots: Vec<Option<InteractionLog>> = (0..total).map(|_| None).collect();
        let mut failures = Vec::new();

        while let Some(joined) = tasks.join_next_with_id().await {
            // a panicked task is charged to its own job, the rest of the batch is kept
            let (id, result) = match joined {
                Ok((id, result)) => (id, result),
                Err(err) => (err.id(), Err(AgentError::Task(err.to_string()))),
            };
            let (idx, customer_id, interaction_type) = pending
                .remove(&id)
                .ok_or_else(|| AgentError::Task(format!("unknown interaction task {id}")))?;
            let kind = match interaction_type {
                InteractionType::Vocal => "vocal",
                InteractionType::Outreach => "outreach",
            };
            match result {
                Ok(log) => {
                    metrics::counter!("interactions.completed", "type" => kind).increment(1);
                    slots[idx] = Some(log);
                }
                Err(err) => {
                    metrics::counter!("interactions.failed", "type" => kind).increment(1);
                    warn!(customer_id = %customer_id, error = %err, "interaction failed");
                    failures.push((
                        idx,
                        InteractionFailure {
                            customer_id,
                            interaction_type,
                            reason: err.to_string(),
                        },
                    ));
                }
            }
        }

        failures.sort_by_key(|(idx, _)| *idx);
        let report = IterationReport {
            iteration,
            logs: slots.into_iter().flatten().collect(),
            failures: failures.into_iter().map(|(_, f)| f).collect(),
        };

        info!(
            iteration,
            completed = report.logs.len(),
            failed = report.failures.len(),
            mean_reward = report.mean_reward(),
            "iteration finished"
        );

        Ok(report)
    }

    /// Run iterations `1..=iterations` back to back, sharing the policy.
    pub async fn run(
        &self,
        customers: &[Customer],
        iterations: u32,
    ) -> Result<Vec<IterationReport>, AgentError> {
        let mut reports = Vec::with_capacity(iterations as usize);
        for iteration in 1..=iterations {
            reports.push(self.run_iteration(customers, iteration).await?);
        }
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::GenerationRequest;
    use decision_core::{Arm, Evaluation, Segment};
    use decision_rl_engine::{BanditPolicy, RewardTransform};

    struct TemplateEcho;

    impl MessageGenerator for TemplateEcho {
        async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
            Ok(request.arm.to_string())
        }
    }

    /// Rewards "good" highly and everything else poorly; refuses to judge
    /// customers whose id starts with "broken" and crashes on "crash".
    struct ArmJudge;

    impl MessageEvaluator for ArmJudge {
        async fn evaluate(&self, customer: &Customer, message: &str) -> anyhow::Result<Evaluation> {
            if customer.customer_id.starts_with("broken") {
                anyhow::bail!("judge refused");
            }
            if customer.customer_id.starts_with("crash") {
                panic!("judge crashed");
            }
            Ok(if message == "good" {
                Evaluation::new(10.0, 1.0, 0.0)
            } else {
                Evaluation::new(2.0, 0.1, 0.8)
            })
        }
    }

    fn customer(id: &str, vocal: bool, price: f64, days: u32, issue: bool) -> Customer {
        Customer {
            customer_id: id.to_string(),
            segment: if vocal { Segment::Vf } else { Segment::Nvf },
            is_vocal: vocal,
            last_purchase_days: days,
            price,
            has_open_issue: issue,
            issue_category: None,
            churn_risk_estimate: None,
        }
    }

    fn config(capacity: usize) -> OrchestratorConfig {
        OrchestratorConfig {
            outreach_capacity: capacity,
            max_concurrency: 4,
            max_retries: 2,
            backoff_factor: 0.0,
            ..Default::default()
        }
    }

    fn greedy_policy() -> Arc<dyn DecisionPolicy> {
        Arc::new(
            BanditPolicy::epsilon_greedy(vec![Arm::from("bad"), Arm::from("good")], 0.0, None)
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_iteration_covers_vocal_and_top_outreach() {
        let customers = vec![
            customer("v1", true, 10.0, 5, false),
            customer("n-low", false, 5.0, 60, false),
            customer("v2", true, 10.0, 5, true),
            customer("n-high", false, 100.0, 1, true),
            customer("n-mid", false, 50.0, 10, false),
        ];
        let lp = InteractionLoop::new(
            greedy_policy(),
            TemplateEcho,
            ArmJudge,
            OutreachRanker::default(),
            config(2),
        )
        .unwrap();

        let report = lp.run_iteration(&customers, 1).await.unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.count(InteractionType::Vocal), 2);
        assert_eq!(report.count(InteractionType::Outreach), 2);

        let ids: Vec<&str> = report.logs.iter().map(|l| l.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["v1", "v2", "n-high", "n-mid"]);
        assert!(report.logs.iter().all(|l| l.iteration == 1));
    }

    #[tokio::test]
    async fn test_failures_are_reported_without_updating_policy() {
        let policy = greedy_policy();
        let customers = vec![
            customer("broken-1", true, 10.0, 5, false),
            customer("ok-1", true, 10.0, 5, false),
        ];
        let lp = InteractionLoop::new(
            policy.clone(),
            TemplateEcho,
            ArmJudge,
            OutreachRanker::default(),
            config(0),
        )
        .unwrap();

        let report = lp.run_iteration(&customers, 1).await.unwrap();
        assert_eq!(report.logs.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].customer_id, "broken-1");
        assert!(report.failures[0].reason.contains("judge refused"));

        let key = customers[1].context_key();
        let pulls: f64 = policy
            .get_statistics(Some(key))
            .iter()
            .map(|s| s.weight)
            .sum();
        assert_eq!(pulls, 1.0);
    }

    #[tokio::test]
    async fn test_malformed_pool_fails_iteration() {
        let customers = vec![customer("n-bad", false, f64::NAN, 5, false)];
        let lp = InteractionLoop::new(
            greedy_policy(),
            TemplateEcho,
            ArmJudge,
            OutreachRanker::default(),
            config(3),
        )
        .unwrap();

        assert!(matches!(
            lp.run_iteration(&customers, 1).await,
            Err(AgentError::Decision(_))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut cfg = config(1);
        cfg.max_concurrency = 0;
        assert!(InteractionLoop::new(
            greedy_policy(),
            TemplateEcho,
            ArmJudge,
            OutreachRanker::default(),
            cfg,
        )
        .is_err());
    }

    #[tokio::test]
    async fn test_panicked_task_is_reported_and_batch_kept() {
        let policy = greedy_policy();
        let customers = vec![
            customer("ok-1", true, 10.0, 5, false),
            customer("crash-1", true, 10.0, 5, false),
            customer("ok-2", true, 10.0, 5, false),
        ];
        let lp = InteractionLoop::new(
            policy.clone(),
            TemplateEcho,
            ArmJudge,
            OutreachRanker::default(),
            config(0),
        )
        .unwrap();

        let report = lp.run_iteration(&customers, 1).await.unwrap();
        let ids: Vec<&str> = report.logs.iter().map(|l| l.customer_id.as_str()).collect();
        assert_eq!(ids, vec!["ok-1", "ok-2"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].customer_id, "crash-1");
        assert_eq!(report.failures[0].interaction_type, InteractionType::Vocal);
        assert!(report.failures[0].reason.contains("panicked"));

        let pulls: f64 = policy
            .get_statistics(Some(customers[0].context_key()))
            .iter()
            .map(|s| s.weight)
            .sum();
        assert_eq!(pulls, 2.0);
    }

    #[test]
    fn test_concurrency_above_semaphore_limit_rejected() {
        let mut cfg = config(1);
        cfg.max_concurrency = usize::MAX;
        assert!(cfg.validate().is_ok());

        let result = InteractionLoop::new(
            greedy_policy(),
            TemplateEcho,
            ArmJudge,
            OutreachRanker::default(),
            cfg,
        );
        assert!(matches!(
            result,
            Err(AgentError::Decision(DecisionError::Config(_)))
        ));

        let mut cfg = config(1);
        cfg.max_concurrency = Semaphore::MAX_PERMITS;
        assert!(InteractionLoop::new(
            greedy_policy(),
            TemplateEcho,
            ArmJudge,
            OutreachRanker::default(),
            cfg,
        )
        .is_ok());
    }

    #[tokio::test]
    async fn test_from_processor_uses_processor_reward() {
        let policy = greedy_policy();
        let processor = InteractionProcessor::new(
            policy.clone(),
            TemplateEcho,
            ArmJudge,
            RetryPolicy {
                max_attempts: 1,
                backoff_factor: 0.0,
            },
            true,
        )
        .with_reward(RewardTransform {
            satisfaction_weight: 0.0,
            engagement_weight: 0.0,
            churn_weight: 0.0,
        });
        let lp = InteractionLoop::from_processor(processor, OutreachRanker::default(), config(0))
            .unwrap();

        let report = lp
            .run_iteration(&[customer("v1", true, 10.0, 5, false)], 1)
            .await
            .unwrap();
        assert_eq!(report.logs.len(), 1);
        assert_eq!(report.logs[0].reward, 0.0);
    }

    #[test]
    fn test_report_mean_reward() {
        let empty = IterationReport {
            iteration: 1,
            logs: Vec::new(),
            failures: Vec::new(),
        };
        assert_eq!(empty.mean_reward(), 0.0);
    }
}
