use crate::error::{DecisionError, DecisionResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Identifier of a selectable message template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arm(String);

impl Arm {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Arm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Arm {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for Arm {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for Arm {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Customer segment. The `V`/`NV` prefix separates vocal customers (who
/// reach out on their own) from non-vocal ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Segment {
    Vf,
    Ve,
    Nvf,
    Nve,
}

impl Segment {
    pub fn all() -> &'static [Segment] {
        &[Segment::Vf, Segment::Ve, Segment::Nvf, Segment::Nve]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Segment::Vf => "VF",
            Segment::Ve => "VE",
            Segment::Nvf => "NVF",
            Segment::Nve => "NVE",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IssueCategory {
    Mechanical,
    Financing,
    Logistics,
    #[default]
    Service,
}

impl IssueCategory {
    pub fn all() -> &'static [IssueCategory] {
        &[
            IssueCategory::Mechanical,
            IssueCategory::Financing,
            IssueCategory::Logistics,
            IssueCategory::Service,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IssueCategory::Mechanical => "mechanical",
            IssueCategory::Financing => "financing",
            IssueCategory::Logistics => "logistics",
            IssueCategory::Service => "service",
        }
    }
}

impl fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decision context under which a separate bandit state is kept.
///
/// Policies take `Option<ContextKey>`; `None` addresses the global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContextKey {
    pub segment: Segment,
    pub issue: IssueCategory,
}

impl ContextKey {
    pub fn new(segment: Segment, issue: IssueCategory) -> Self {
        Self { segment, issue }
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.segment, self.issue)
    }
}

/// Customer record as seen by the decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub segment: Segment,
    pub is_vocal: bool,
    /// Days since the last purchase.
    pub last_purchase_days: u32,
    pub price: f64,
    #[serde(default)]
    pub has_open_issue: bool,
    #[serde(default)]
    pub issue_category: Option<IssueCategory>,
    #[serde(default)]
    pub churn_risk_estimate: Option<f64>,
}

impl Customer {
    /// Context this customer's interactions are grouped under. Customers
    /// without a recorded issue fall into the general service bucket.
    pub fn context_key(&self) -> ContextKey {
        ContextKey::new(self.segment, self.issue_category.unwrap_or_default())
    }

    pub fn validate(&self) -> DecisionResult<()> {
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DecisionError::InvalidInput(format!(
                "customer {}: price must be a non-negative finite number, got {}",
                self.customer_id, self.price
            )));
        }
        if let Some(churn) = self.churn_risk_estimate {
            if !(0.0..=1.0).contains(&churn) {
                return Err(DecisionError::InvalidInput(format!(
                    "customer {}: churn risk estimate must be in [0, 1], got {}",
                    self.customer_id, churn
                )));
            }
        }
        Ok(())
    }
}

/// Evaluator verdict on one generated message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    /// Expected satisfaction on a 0-10 scale.
    pub satisfaction: f64,
    /// Probability the customer engages, in [0, 1].
    pub engagement: f64,
    /// Probability the customer churns, in [0, 1].
    pub churn: f64,
    #[serde(default)]
    pub rationale: Option<String>,
}

impl Evaluation {
    pub fn new(satisfaction: f64, engagement: f64, churn: f64) -> Self {
        Self {
            satisfaction,
            engagement,
            churn,
            rationale: None,
        }
    }

    pub fn validate(&self) -> DecisionResult<()> {
        check_range("satisfaction", self.satisfaction, 10.0)?;
        check_range("engagement", self.engagement, 1.0)?;
        check_range("churn", self.churn, 1.0)
    }
}

fn check_range(name: &str, value: f64, max: f64) -> DecisionResult<()> {
    // NaN fails the containment check as well
    if (0.0..=max).contains(&value) {
        Ok(())
    } else {
        Err(DecisionError::InvalidInput(format!(
            "{name} must be in [0, {max}], got {value}"
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionType {
    /// The customer reached out first.
    Vocal,
    /// Proactive contact chosen by outreach ranking.
    Outreach,
}

/// Record of one completed decision-generate-evaluate-update cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InteractionLog {
    pub id: Uuid,
    pub customer_id: String,
    pub context: Option<ContextKey>,
    pub arm: Arm,
    pub message: String,
    pub evaluation: Evaluation,
    pub reward: f64,
    pub iteration: u32,
    pub interaction_type: InteractionType,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn customer() -> Customer {
        Customer {
            customer_id: "c-1".into(),
            segment: Segment::Nvf,
            is_vocal: false,
            last_purchase_days: 12,
            price: 250.0,
            has_open_issue: true,
            issue_category: None,
            churn_risk_estimate: Some(0.2),
        }
    }

    #[test]
    fn test_context_key_structural_equality() {
        let a = ContextKey::new(Segment::Vf, IssueCategory::Mechanical);
        let b = ContextKey::new(Segment::Vf, IssueCategory::Mechanical);
        let c = ContextKey::new(Segment::Vf, IssueCategory::Financing);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
        assert_eq!(a.to_string(), "VF/mechanical");
    }

    #[test]
    fn test_customer_without_issue_maps_to_service() {
        let c = customer();
        assert_eq!(
            c.context_key(),
            ContextKey::new(Segment::Nvf, IssueCategory::Service)
        );
    }

    #[test]
    fn test_customer_validation() {
        assert!(customer().validate().is_ok());

        let mut bad = customer();
        bad.price = -1.0;
        assert!(matches!(bad.validate(), Err(DecisionError::InvalidInput(_))));

        let mut bad = customer();
        bad.price = f64::NAN;
        assert!(bad.validate().is_err());

        let mut bad = customer();
        bad.churn_risk_estimate = Some(1.5);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_evaluation_validation() {
        assert!(Evaluation::new(10.0, 1.0, 0.0).validate().is_ok());
        assert!(Evaluation::new(0.0, 0.0, 1.0).validate().is_ok());
        assert!(Evaluation::new(10.5, 0.5, 0.5).validate().is_err());
        assert!(Evaluation::new(5.0, -0.1, 0.5).validate().is_err());
        assert!(Evaluation::new(5.0, 0.5, f64::NAN).validate().is_err());
    }

    #[test]
    fn test_serde_names() {
        let key = ContextKey::new(Segment::Nve, IssueCategory::Logistics);
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, r#"{"segment":"NVE","issue":"logistics"}"#);

        let arm: Arm = serde_json::from_str(r#""coupon""#).unwrap();
        assert_eq!(arm, Arm::from("coupon"));
    }
}
