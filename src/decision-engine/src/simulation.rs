//! Synthetic customer base and stand-in collaborators for offline runs.
//!
//! The judge knows a hidden affinity between issue categories and templates,
//! so a policy that learns per context should visibly beat a global one.

use decision_agents::{GenerationRequest, MessageEvaluator, MessageGenerator};
use decision_core::{Customer, Evaluation, IssueCategory, Segment};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub fn synthetic_customers(count: usize, rng: &mut StdRng) -> Vec<Customer> {
    (0..count)
        .map(|i| {
            let segment = Segment::all()[rng.gen_range(0..Segment::all().len())];
            let has_open_issue = rng.gen_bool(0.4);
            let issue_category = has_open_issue
                .then(|| IssueCategory::all()[rng.gen_range(0..IssueCategory::all().len())]);

            Customer {
                customer_id: format!("cust-{i:05}"),
                segment,
                is_vocal: matches!(segment, Segment::Vf | Segment::Ve),
                last_purchase_days: rng.gen_range(0..=365),
                price: rng.gen_range(500.0..40_000.0),
                has_open_issue,
                issue_category,
                churn_risk_estimate: Some(rng.gen_range(0.0..1.0)),
            }
        })
        .collect()
}

/// Renders a tagged template; the tag is what the judge keys on.
pub struct TemplateGenerator;

impl MessageGenerator for TemplateGenerator {
    async fn generate(&self, request: &GenerationRequest) -> anyhow::Result<String> {
        let customer = &request.customer;
        let topic = customer
            .issue_category
            .map(|c| c.as_str())
            .unwrap_or("your recent purchase");
        Ok(format!(
            "[{}] Hello {}, following up about {}.",
            request.arm, customer.customer_id, topic
        ))
    }
}

pub struct SimulatedJudge {
    rng: Mutex<StdRng>,
    noise: f64,
}

impl SimulatedJudge {
    pub fn new(seed: Option<u64>, noise: f64) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            rng: Mutex::new(rng),
            noise: if noise.is_finite() { noise.abs() } else { 0.0 },
        }
    }

    /// Expected satisfaction on the 0-10 scale for a template under an issue.
    fn affinity(issue: IssueCategory, template: &str) -> f64 {
        match (issue, template) {
            (IssueCategory::Mechanical, "technical") => 8.5,
            (IssueCategory::Financing, "coupon") => 8.0,
            (IssueCategory::Logistics, "follow_up") => 7.5,
            (IssueCategory::Service, "empathetic") => 7.5,
            (_, "escalate") => 5.5,
            _ => 4.0,
        }
    }
}

fn template_tag(message: &str) -> Option<&str> {
    let rest = message.strip_prefix('[')?;
    rest.split_once(']').map(|(tag, _)| tag)
}

impl MessageEvaluator for SimulatedJudge {
    async fn evaluate(&self, customer: &Customer, message: &str) -> anyhow::Result<Evaluation> {
        let template = template_tag(message)
            .ok_or_else(|| anyhow::anyhow!("message carries no template tag"))?;
        let base = Self::affinity(customer.context_key().issue, template);

        let (jitter, engagement_jitter) = {
            let mut rng = self.rng.lock();
            (
                rng.gen_range(-self.noise..=self.noise),
                rng.gen_range(-0.1..=0.1),
            )
        };

        let satisfaction = (base + jitter).clamp(0.0, 10.0);
        let engagement = (satisfaction / 10.0 + engagement_jitter).clamp(0.0, 1.0);
        let prior_churn = customer.churn_risk_estimate.unwrap_or(0.5);
        let churn = (prior_churn * (1.0 - satisfaction / 10.0)).clamp(0.0, 1.0);

        Ok(Evaluation {
            satisfaction,
            engagement,
            churn,
            rationale: Some(format!("template {template} for {}", customer.context_key())),
        })
    }
}
