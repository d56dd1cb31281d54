//! Cost amounts and the secondary-currency presenter.

use serde::{Serialize, Serializer};

/// Default USD to INR conversion rate for the secondary display currency.
pub const DEFAULT_USD_TO_INR: f64 = 83.0;

/// A cost quantity as ingested from upstream. Amounts arrive as decimal
/// strings or numbers; anything non-numeric is `Unavailable` rather than
/// zero. Valid amounts are rounded to cents exactly once, here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CostAmount {
    Valid(f64),
    Unavailable,
}

impl CostAmount {
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<f64>() {
            Ok(value) => Self::from_f64(value),
            Err(_) => Self::Unavailable,
        }
    }

    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Self::Valid(round_to_cents(value))
        } else {
            Self::Unavailable
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Valid(value) => Some(*value),
            Self::Unavailable => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Valid(_))
    }
}

impl Serialize for CostAmount {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Valid(value) => serializer.collect_str(&format_args!("{value:.2}")),
            Self::Unavailable => serializer.serialize_none(),
        }
    }
}

fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Converts USD amounts into a secondary display currency at a fixed rate.
/// Unavailable amounts stay unavailable; they are never coerced to zero.
#[derive(Debug, Clone, Copy)]
pub struct CurrencyConverter {
    rate: f64,
}

impl CurrencyConverter {
    pub fn new(rate: f64) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn convert(&self, amount: CostAmount) -> CostAmount {
        match amount {
            CostAmount::Valid(value) => CostAmount::from_f64(value * self.rate),
            CostAmount::Unavailable => CostAmount::Unavailable,
        }
    }
}

impl Default for CurrencyConverter {
    fn default() -> Self {
        Self::new(DEFAULT_USD_TO_INR)
    }
}
