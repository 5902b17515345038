//! Boundary traits for the external services the interaction loop drives:
//! the message generator and the judge that scores its output.

use decision_core::{Arm, ContextKey, Customer, Evaluation, InteractionType};
use std::future::Future;

/// Everything a generator needs to draft one message.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub customer: Customer,
    pub arm: Arm,
    pub context: Option<ContextKey>,
    pub interaction_type: InteractionType,
}

/// Drafts a message for a customer from the selected template.
pub trait MessageGenerator: Send + Sync + 'static {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = anyhow::Result<String>> + Send;
}

/// Scores a generated message from the customer's point of view.
pub trait MessageEvaluator: Send + Sync + 'static {
    fn evaluate(
        &self,
        customer: &Customer,
        message: &str,
    ) -> impl Future<Output = anyhow::Result<Evaluation>> + Send;
}
