//! Outreach ranking — scores a candidate pool by open issues, purchase value
//! and purchase recency, then orders it highest priority first.

use decision_core::{Customer, DecisionError, DecisionResult, RankingConfig};
use serde::{Deserialize, Serialize};

/// Score breakdown for one candidate. Components are the normalized,
/// unweighted inputs; `score` is the weighted sum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachScore {
    pub customer_id: String,
    pub issue: f64,
    pub price: f64,
    pub recency: f64,
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutreachRanker {
    issue_weight: f64,
    price_weight: f64,
    recency_weight: f64,
}

impl Default for OutreachRanker {
    fn default() -> Self {
        Self {
            issue_weight: 0.5,
            price_weight: 0.3,
            recency_weight: 0.2,
        }
    }
}

impl OutreachRanker {
    /// Weights are relative, they need not sum to one.
    pub fn new(issue_weight: f64, price_weight: f64, recency_weight: f64) -> DecisionResult<Self> {
        let config = RankingConfig {
            issue_weight,
            price_weight,
            recency_weight,
        };
        Self::from_config(&config)
    }

    pub fn from_config(config: &RankingConfig) -> DecisionResult<Self> {
        config.validate()?;
        Ok(Self {
            issue_weight: config.issue_weight,
            price_weight: config.price_weight,
            recency_weight: config.recency_weight,
        })
    }

    /// Score every candidate, in input order.
    pub fn score_all(&self, customers: &[Customer]) -> DecisionResult<Vec<OutreachScore>> {
        for customer in customers {
            customer.validate()?;
        }

        let max_price = customers.iter().map(|c| c.price).fold(0.0, f64::max);
        let max_days = customers
            .iter()
            .map(|c| c.last_purchase_days)
            .max()
            .unwrap_or(0);

        Ok(customers
            .iter()
            .map(|customer| self.score(customer, max_price, max_days))
            .collect())
    }

    /// Order `customers` by descending priority. Equal scores keep their
    /// input order. `top_n` caps the result length.
    pub fn rank<'a>(
        &self,
        customers: &'a [Customer],
        top_n: Option<usize>,
    ) -> DecisionResult<Vec<&'a Customer>> {
        if customers.is_empty() {
            return Ok(Vec::new());
        }

        let scores = self.score_all(customers)?;
        let mut scored: Vec<(&Customer, f64)> = customers
            .iter()
            .zip(scores.iter().map(|s| s.score))
            .collect();

        // sort_by is stable
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        let limit = top_n.unwrap_or(scored.len()).min(scored.len());
        scored.truncate(limit);

        tracing::debug!(
            candidates = customers.len(),
            selected = limit,
            "outreach pool ranked"
        );

        Ok(scored.into_iter().map(|(c, _)| c).collect())
    }

    fn score(&self, customer: &Customer, max_price: f64, max_days: u32) -> OutreachScore {
        let issue = if customer.has_open_issue { 1.0 } else { 0.0 };

        let price = if max_price > 0.0 {
            customer.price / max_price
        } else {
            0.0
        };

        // inverted so fresher purchases score higher; the stalest customer maps to 1.0
        let recency = if max_days > 0 {
            let inverse = 1.0 / (f64::from(customer.last_purchase_days) + 1.0);
            inverse / (1.0 / (f64::from(max_days) + 1.0))
        } else {
            0.0
        };

        OutreachScore {
            customer_id: customer.customer_id.clone(),
            issue,
            price,
            recency,
            score: self.issue_weight * issue
                + self.price_weight * price
                + self.recency_weight * recency,
        }
    }
}

impl TryFrom<&RankingConfig> for OutreachRanker {
    type Error = DecisionError;

    fn try_from(config: &RankingConfig) -> DecisionResult<Self> {
        Self::from_config(config)
    }
}
