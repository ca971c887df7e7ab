//! Bookmaker price comparison. Everything here works in percent.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, require_finite, require_non_negative};

/// `100 / odds` for a decimal price.
pub fn implied_probability(odds: f64) -> ModelResult<f64> {
    let odds = require_finite("odds", odds)?;
    if odds <= 0.0 {
        return Err(ModelError::invalid(
            "odds",
            format!("decimal price must be positive, got {odds}"),
        ));
    }
    Ok(100.0 / odds)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueBetVerdict {
    pub predicted_pct: f64,
    pub implied_pct: f64,
    /// `predicted − implied`, in percentage points.
    pub margin: f64,
    pub is_value: bool,
}

/// A bet is value when its margin beats `risk_factor × implied`. With a zero
/// risk factor any positive margin qualifies.
pub fn identify_value_bet(
    predicted_pct: f64,
    odds: f64,
    risk_factor: f64,
) -> ModelResult<ValueBetVerdict> {
    let predicted_pct = require_finite("predicted probability", predicted_pct)?;
    let risk_factor = require_non_negative("risk_factor", risk_factor)?;
    let implied_pct = implied_probability(odds)?;
    let margin = predicted_pct - implied_pct;
    Ok(ValueBetVerdict {
        predicted_pct,
        implied_pct,
        margin,
        is_value: margin > risk_factor * implied_pct,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsEntry {
    pub outcome: String,
    pub odds: f64,
}

/// Bookmaker prices keyed by outcome label, kept in the order they were quoted.
/// Deserialization goes through `insert`, so a repeated label keeps its first
/// position and its last price.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<OddsEntry>", into = "Vec<OddsEntry>")]
pub struct OddsBook {
    entries: Vec<OddsEntry>,
}

impl OddsBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-quoting a label replaces its price in place.
    pub fn insert(&mut self, outcome: impl Into<String>, odds: f64) {
        let outcome = outcome.into();
        if let Some(entry) = self.entries.iter_mut().find(|e| e.outcome == outcome) {
            entry.odds = odds;
        } else {
            self.entries.push(OddsEntry { outcome, odds });
        }
    }

    pub fn get(&self, outcome: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.outcome == outcome)
            .map(|e| e.odds)
    }

    pub fn entries(&self) -> &[OddsEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|e| (e.outcome.as_str(), e.odds))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Reprices the entry at `index`. Returns false when there is no such entry.
    pub fn set_odds_at(&mut self, index: usize, odds: f64) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => {
                entry.odds = odds;
                true
            }
            None => false,
        }
    }

    /// `Σ implied − 100`, the bookmaker's margin across the quoted set. Only
    /// meaningful when the entries form a complete, mutually exclusive market.
    pub fn overround_pct(&self) -> ModelResult<f64> {
        let mut total = 0.0;
        for entry in &self.entries {
            total += implied_probability(entry.odds)?;
        }
        Ok(total - 100.0)
    }

    /// Implied probabilities rescaled proportionally so they sum to 100.
    pub fn fair_probabilities(&self) -> ModelResult<Vec<(String, f64)>> {
        let implied = self
            .entries
            .iter()
            .map(|e| implied_probability(e.odds).map(|p| (e.outcome.clone(), p)))
            .collect::<ModelResult<Vec<_>>>()?;
        let total: f64 = implied.iter().map(|(_, p)| p).sum();
        if total <= 0.0 {
            return Ok(implied);
        }
        Ok(implied
            .into_iter()
            .map(|(label, p)| (label, p / total * 100.0))
            .collect())
    }
}

impl From<Vec<OddsEntry>> for OddsBook {
    fn from(entries: Vec<OddsEntry>) -> Self {
        entries.into_iter().map(|e| (e.outcome, e.odds)).collect()
    }
}

impl From<OddsBook> for Vec<OddsEntry> {
    fn from(book: OddsBook) -> Self {
        book.entries
    }
}

impl FromIterator<(String, f64)> for OddsBook {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut book = OddsBook::new();
        for (outcome, odds) in iter {
            book.insert(outcome, odds);
        }
        book
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recommendation {
    pub outcome: String,
    pub odds: f64,
    pub predicted_pct: f64,
    pub edge: f64,
}

/// Picks the book entry with the largest `predicted − implied`. Entries are
/// scanned in book order and the earliest wins a tie. Every book label must
/// have a prediction.
pub fn recommend_best_bet(
    book: &OddsBook,
    mut predicted_pct: impl FnMut(&str) -> Option<f64>,
) -> ModelResult<Option<Recommendation>> {
    let mut best: Option<Recommendation> = None;
    for (outcome, odds) in book.iter() {
        let predicted = predicted_pct(outcome).ok_or_else(|| {
            ModelError::invalid("outcome label", format!("no prediction for {outcome:?}"))
        })?;
        let edge = predicted - implied_probability(odds)?;
        let better = best.as_ref().is_none_or(|b| edge > b.edge);
        if better {
            best = Some(Recommendation {
                outcome: outcome.to_string(),
                odds,
                predicted_pct: predicted,
                edge,
            });
        }
    }
    Ok(best)
}
