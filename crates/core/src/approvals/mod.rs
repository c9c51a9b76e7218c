use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Decides quotes that arrive without an explicit budget.
pub trait AutoApprovalPolicy: Send + Sync {
    fn approve(&self, quote_total: Decimal) -> bool;
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalThresholds {
    pub low_value_threshold: Decimal,
    pub low_value_probability: f64,
    pub high_value_probability: f64,
}

impl Default for ApprovalThresholds {
    fn default() -> Self {
        Self {
            low_value_threshold: Decimal::new(500, 0),
            low_value_probability: 0.7,
            high_value_probability: 0.3,
        }
    }
}

impl ApprovalThresholds {
    /// Probability of approval for a quote of this size. Quotes strictly
    /// below the threshold count as low value.
    pub fn probability_for(&self, quote_total: Decimal) -> f64 {
        let probability = if quote_total < self.low_value_threshold {
            self.low_value_probability
        } else {
            self.high_value_probability
        };
        probability.clamp(0.0, 1.0)
    }
}

/// Weighted coin flip. Seeding makes runs reproducible.
pub struct RandomAutoApproval {
    thresholds: ApprovalThresholds,
    rng: Mutex<StdRng>,
}

impl RandomAutoApproval {
    pub fn new(thresholds: ApprovalThresholds, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self { thresholds, rng: Mutex::new(rng) }
    }

    pub fn thresholds(&self) -> &ApprovalThresholds {
        &self.thresholds
    }
}

impl Default for RandomAutoApproval {
    fn default() -> Self {
        Self::new(ApprovalThresholds::default(), None)
    }
}

impl AutoApprovalPolicy for RandomAutoApproval {
    fn approve(&self, quote_total: Decimal) -> bool {
        let probability = self.thresholds.probability_for(quote_total);
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_bool(probability),
            Err(poisoned) => poisoned.into_inner().gen_bool(probability),
        }
    }
}

/// Always returns the same answer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedAutoApproval(pub bool);

impl AutoApprovalPolicy for FixedAutoApproval {
    fn approve(&self, _quote_total: Decimal) -> bool {
        self.0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum ApprovalBasis {
    Budget { max_budget: Decimal },
    AutoPolicy,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetDecision {
    pub approved: bool,
    pub quote_total: Decimal,
    pub basis: ApprovalBasis,
}

impl BudgetDecision {
    pub fn landlord_message(&self, vendor_name: &str) -> String {
        let total = self.quote_total;
        match (&self.basis, self.approved) {
            (ApprovalBasis::Budget { max_budget }, true) => format!(
                "Quote of ${total:.2} from {vendor_name} is within budget (max ${max_budget:.2}) and has been auto-approved for evaluation."
            ),
            (ApprovalBasis::Budget { max_budget }, false) => format!(
                "Quote of ${total:.2} from {vendor_name} exceeds budget (max ${max_budget:.2}). It has been rejected."
            ),
            (ApprovalBasis::AutoPolicy, true) => format!(
                "Quote of ${total:.2} from {vendor_name} has been auto-approved for evaluation (no budget info)."
            ),
            (ApprovalBasis::AutoPolicy, false) => format!(
                "Quote of ${total:.2} from {vendor_name} has been rejected (no budget info)."
            ),
        }
    }
}

/// Explicit budgets are authoritative and inclusive; only budget-less quotes
/// reach the auto-approval policy.
pub fn evaluate_quote_budget(
    quote_total: Decimal,
    max_budget: Option<Decimal>,
    policy: &dyn AutoApprovalPolicy,
) -> BudgetDecision {
    match max_budget {
        Some(max_budget) => BudgetDecision {
            approved: quote_total <= max_budget,
            quote_total,
            basis: ApprovalBasis::Budget { max_budget },
        },
        None => BudgetDecision {
            approved: policy.approve(quote_total),
            quote_total,
            basis: ApprovalBasis::AutoPolicy,
        },
    }
}
