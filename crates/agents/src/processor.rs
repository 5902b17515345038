//! Interaction pipeline: builds the decision context for a customer, selects
//! a template arm, drives generation and evaluation, shapes the reward and
//! feeds it back into the policy.

use crate::collaborators::{GenerationRequest, MessageEvaluator, MessageGenerator};
use crate::error::{AgentError, Stage};
use crate::retry::RetryPolicy;
use chrono::Utc;
use decision_core::{Customer, InteractionLog, InteractionType};
use decision_rl_engine::{DecisionPolicy, RewardTransform};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Processes a single customer through the full decision cycle.
pub struct InteractionProcessor<G, E> {
    policy: Arc<dyn DecisionPolicy>,
    generator: G,
    evaluator: E,
    reward: RewardTransform,
    retry: RetryPolicy,
    contextual: bool,
}

impl<G: MessageGenerator, E: MessageEvaluator> InteractionProcessor<G, E> {
    pub fn new(
        policy: Arc<dyn DecisionPolicy>,
        generator: G,
        evaluator: E,
        retry: RetryPolicy,
        contextual: bool,
    ) -> Self {
        Self {
            policy,
            generator,
            evaluator,
            reward: RewardTransform::default(),
            retry,
            contextual,
        }
    }

    pub fn with_reward(mut self, reward: RewardTransform) -> Self {
        self.reward = reward;
        self
    }

    /// Run select → generate → evaluate → reward → update for one customer.
    /// The policy is only locked inside `select` and `update`, never while a
    /// collaborator call is in flight.
    pub async fn process(
        &self,
        customer: &Customer,
        interaction_type: InteractionType,
        iteration: u32,
    ) -> Result<InteractionLog, AgentError> {
        let start = std::time::Instant::now();
        let context = self.contextual.then(|| customer.context_key());
        let arm = self.policy.select(context);

        let request = GenerationRequest {
            customer: customer.clone(),
            arm: arm.clone(),
            context,
            interaction_type,
        };

        let message = self
            .retry
            .run("generate", || self.generator.generate(&request))
            .await
            .map_err(|source| AgentError::Collaborator {
                stage: Stage::Generation,
                customer_id: customer.customer_id.clone(),
                source,
            })?;

        let evaluation = self
            .retry
            .run("evaluate", || self.evaluator.evaluate(customer, &message))
            .await
            .map_err(|source| AgentError::Collaborator {
                stage: Stage::Evaluation,
                customer_id: customer.customer_id.clone(),
                source,
            })?;

        let reward = self.reward.reward(&evaluation)?;
        self.policy.update(context, &arm, reward)?;

        metrics::histogram!("interactions.reward").record(reward);
        metrics::histogram!("interactions.latency_ms").record(start.elapsed().as_millis() as f64);

        debug!(
            customer_id = %customer.customer_id,
            arm = %arm,
            reward,
            "interaction completed"
        );

        Ok(InteractionLog {
            id: Uuid::new_v4(),
            customer_id: customer.customer_id.clone(),
            context,
            arm,
            message,
            evaluation,
            reward,
            iteration,
            interaction_type,
            timestamp: Utc::now(),
        })
    }
}
