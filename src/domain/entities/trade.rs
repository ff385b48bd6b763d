//! Trade entity types and settlement rules.
//!
//! A trade is a binary wager on whether a symbol's price ends above or
//! below its entry price. Settlement is pure arithmetic here; persistence
//! and atomicity live in the repository layer.

use serde::{Deserialize, Serialize};

/// Direction of the wager: will the price finish higher or lower than entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Higher,
    Lower,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Higher => "higher",
            TradeDirection::Lower => "lower",
        }
    }

    pub fn parse(value: &str) -> Result<Self, String> {
        match value {
            "higher" => Ok(TradeDirection::Higher),
            "lower" => Ok(TradeDirection::Lower),
            other => Err(format!(
                "Invalid direction '{}'. Must be 'higher' or 'lower'",
                other
            )),
        }
    }

    /// Win rule: higher wins strictly above entry, lower strictly below.
    /// Equality is always a loss.
    pub fn is_win(&self, entry_price: f64, exit_price: f64) -> bool {
        match self {
            TradeDirection::Higher => exit_price > entry_price,
            TradeDirection::Lower => exit_price < entry_price,
        }
    }
}

impl std::fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Lifecycle status of a trade. `Completed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeStatus {
    Active,
    Completed,
    Cancelled,
}

impl TradeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeStatus::Active => "active",
            TradeStatus::Completed => "completed",
            TradeStatus::Cancelled => "cancelled",
        }
    }
}

/// Outcome of a trade. Stays `Pending` until settlement; cancelled trades
/// keep `Pending` forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeOutcome {
    Pending,
    Won,
    Lost,
}

impl TradeOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeOutcome::Pending => "pending",
            TradeOutcome::Won => "won",
            TradeOutcome::Lost => "lost",
        }
    }
}

/// Result of evaluating a settlement: the final outcome and the payout
/// credited to the account.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Settlement {
    pub outcome: TradeOutcome,
    pub payout: f64,
}

impl Settlement {
    /// Evaluate a settlement for a trade.
    ///
    /// Payout on win is `amount * (1 + profit_percentage / 100)`; payout on
    /// loss is zero. The stake itself is part of the winning payout, so the
    /// net profit of a win is `payout - amount`.
    pub fn evaluate(
        direction: TradeDirection,
        entry_price: f64,
        exit_price: f64,
        amount: f64,
        profit_percentage: f64,
    ) -> Self {
        if direction.is_win(entry_price, exit_price) {
            Settlement {
                outcome: TradeOutcome::Won,
                payout: amount * (1.0 + profit_percentage / 100.0),
            }
        } else {
            Settlement {
                outcome: TradeOutcome::Lost,
                payout: 0.0,
            }
        }
    }

    /// Net effect on the account's profit counter (`payout - amount` on a
    /// win, zero on a loss; losses are tracked separately).
    pub fn profit(&self, amount: f64) -> f64 {
        match self.outcome {
            TradeOutcome::Won => self.payout - amount,
            _ => 0.0,
        }
    }
}
