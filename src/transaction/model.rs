use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::clock::{IdGenerator, unix_timestamp};
use crate::error::{LedgerError, Result};

/// Status given to transactions that don't name one.
pub const DEFAULT_STATUS: &str = "pending";

/// Optional fields for a new transaction, with their defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct TxOptions {
    /// Caller-chosen id; when `None` the ledger's id generator assigns one.
    pub id: Option<u64>,
    pub rating: f64,
    pub description: String,
    pub status: String,
    pub category: String,
}

impl Default for TxOptions {
    fn default() -> Self {
        Self {
            id: None,
            rating: 0.0,
            description: String::new(),
            status: DEFAULT_STATUS.to_string(),
            category: String::new(),
        }
    }
}

/// A value transfer plus metadata. Immutable once built.
///
/// Fields are declared in lexicographic order: the derived encoding is the canonical
/// form that block digests are computed over.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    amount: f64,
    category: String,
    description: String,
    id: u64,
    rating: f64,
    recipient: String,
    sender: String,
    status: String,
    timestamp: f64,
}

impl Transaction {
    /// Build a transaction stamped with the current time.
    /// Fails only when `amount` or `rating` is not a finite number.
    pub fn new(
        sender: impl Into<String>,
        recipient: impl Into<String>,
        amount: f64,
        opts: TxOptions,
        ids: &dyn IdGenerator,
    ) -> Result<Self> {
        if !amount.is_finite() {
            return Err(LedgerError::InvalidAmount(amount.to_string()));
        }
        if !opts.rating.is_finite() {
            return Err(LedgerError::InvalidRating(opts.rating.to_string()));
        }

        Ok(Self {
            amount,
            category: opts.category,
            description: opts.description,
            id: opts.id.unwrap_or_else(|| ids.next_id()),
            rating: opts.rating,
            recipient: recipient.into(),
            sender: sender.into(),
            status: opts.status,
            timestamp: unix_timestamp(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn sender(&self) -> &str {
        &self.sender
    }

    pub fn recipient(&self) -> &str {
        &self.recipient
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn rating(&self) -> f64 {
        self.rating
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    /// External key-value form, same field names as the canonical encoding.
    pub fn to_json(&self) -> Value {
        json!({
            "amount": self.amount,
            "category": self.category,
            "description": self.description,
            "id": self.id,
            "rating": self.rating,
            "recipient": self.recipient,
            "sender": self.sender,
            "status": self.status,
            "timestamp": self.timestamp,
        })
    }
}

/// Numeric cast applied to submitted amounts: JSON numbers and numeric strings are
/// accepted, anything else (or a non-finite result) is an input error.
pub fn parse_amount(raw: &Value) -> Result<f64> {
    let parsed = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match parsed {
        Some(amount) if amount.is_finite() => Ok(amount),
        _ => Err(LedgerError::InvalidAmount(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SequentialIdGenerator;

    #[test]
    fn defaults_are_applied() {
        let ids = SequentialIdGenerator::starting_at(1);
        let tx = Transaction::new("alice", "bob", 10.0, TxOptions::default(), &ids).unwrap();
        assert_eq!(tx.id(), 1);
        assert_eq!(tx.status(), "pending");
        assert_eq!(tx.rating(), 0.0);
        assert_eq!(tx.description(), "");
        assert_eq!(tx.category(), "");
    }

    #[test]
    fn caller_id_wins_over_generator() {
        let ids = SequentialIdGenerator::starting_at(1);
        let opts = TxOptions {
            id: Some(42),
            ..TxOptions::default()
        };
        let tx = Transaction::new("a", "b", 1.0, opts, &ids).unwrap();
        assert_eq!(tx.id(), 42);
        assert_eq!(ids.next_id(), 1, "generator must not be consumed");
    }

    #[test]
    fn negative_amounts_are_allowed() {
        let ids = SequentialIdGenerator::starting_at(1);
        let tx = Transaction::new("a", "b", -3.5, TxOptions::default(), &ids).unwrap();
        assert_eq!(tx.amount(), -3.5);
    }

    #[test]
    fn rejects_non_finite_values() {
        let ids = SequentialIdGenerator::starting_at(1);
        let err = Transaction::new("a", "b", f64::NAN, TxOptions::default(), &ids).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAmount(_)));

        let opts = TxOptions {
            rating: f64::INFINITY,
            ..TxOptions::default()
        };
        let err = Transaction::new("a", "b", 1.0, opts, &ids).unwrap_err();
        assert!(matches!(err, LedgerError::InvalidRating(_)));
    }

    #[test]
    fn to_json_matches_derived_encoding() {
        let ids = SequentialIdGenerator::starting_at(9);
        let tx = Transaction::new("a", "b", 2.25, TxOptions::default(), &ids).unwrap();
        assert_eq!(tx.to_json(), serde_json::to_value(&tx).unwrap());
        assert_eq!(tx.to_json()["sender"], "a");
        assert_eq!(tx.to_json()["id"], 9);
    }

    #[test]
    fn parse_amount_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_amount(&json!(10)).unwrap(), 10.0);
        assert_eq!(parse_amount(&json!(" 2.5 ")).unwrap(), 2.5);
        assert_eq!(parse_amount(&json!("-1")).unwrap(), -1.0);
    }

    #[test]
    fn parse_amount_rejects_garbage() {
        for raw in [json!("ten"), json!(null), json!([1]), json!("inf"), json!(true)] {
            assert!(
                matches!(parse_amount(&raw), Err(LedgerError::InvalidAmount(_))),
                "{raw} should be rejected"
            );
        }
    }
}
