use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{ModelError, ModelResult, ModelWarning, Period, require_non_negative};
use crate::htft::{self, Bucket, HtFtGrid, HtFtMethod, HtFtOutcome, HtWeights};
use crate::rates::{self, HalftimeInput, RatePair};
use crate::scoreline::{
    BucketProbs, Btts, DEFAULT_TRUNCATION_TOLERANCE, OverUnder, Scoreline, ScorelineDistribution,
};
use crate::value::{self, OddsBook, Recommendation, ValueBetVerdict};

pub const DEFAULT_MAX_GOALS: u32 = 6;
pub const DEFAULT_OVER_UNDER_LINES: [f64; 3] = [1.5, 2.5, 3.5];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelConfig {
    pub max_goals: u32,
    pub ht_max_goals: u32,
    pub halftime_fraction: f64,
    pub risk_factor: f64,
    pub over_under_lines: Vec<f64>,
    pub truncation_tolerance: f64,
    pub ht_weights: HtWeights,
    pub htft_method: HtFtMethod,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            max_goals: DEFAULT_MAX_GOALS,
            ht_max_goals: DEFAULT_MAX_GOALS,
            halftime_fraction: rates::DEFAULT_HALFTIME_FRACTION,
            risk_factor: 0.0,
            over_under_lines: DEFAULT_OVER_UNDER_LINES.to_vec(),
            truncation_tolerance: DEFAULT_TRUNCATION_TOLERANCE,
            ht_weights: HtWeights::default(),
            htft_method: HtFtMethod::default(),
        }
    }
}

/// Everything one evaluation needs. Built by the caller, never mutated here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchInputs {
    pub full_time: RatePair,
    /// `None` uses the configured halftime fraction.
    pub halftime: Option<HalftimeInput>,
}

impl MatchInputs {
    pub fn from_rates(home: f64, away: f64) -> ModelResult<Self> {
        Ok(Self {
            full_time: RatePair::new(home, away)?,
            halftime: None,
        })
    }

    pub fn with_halftime(mut self, halftime: HalftimeInput) -> Self {
        self.halftime = Some(halftime);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub full_time_rates: (f64, f64),
    pub halftime_rates: (f64, f64),
    pub full_time: ScorelineDistribution,
    pub halftime: ScorelineDistribution,
    pub ft_buckets: BucketProbs,
    pub ht_buckets: BucketProbs,
    pub over_under: Vec<OverUnder>,
    pub btts: Btts,
    pub most_likely: Scoreline,
    pub htft: HtFtGrid,
    pub htft_method: HtFtMethod,
    pub warnings: Vec<ModelWarning>,
}

impl MatchReport {
    /// Probability in percent for a market label: `"1/X"`, `"1"`, `"X"`, `"2"`,
    /// `"O2.5"` / `"U2.5"` for evaluated lines, `"BTTS:Y"` / `"BTTS:N"`.
    pub fn probability_pct(&self, label: &str) -> Option<f64> {
        let label = label.trim();
        let fraction = if let Ok(outcome) = label.parse::<HtFtOutcome>() {
            Some(self.htft.get(outcome))
        } else {
            match label.to_uppercase().as_str() {
                "1" => Some(self.ft_buckets.get(Bucket::Home)),
                "X" => Some(self.ft_buckets.get(Bucket::Draw)),
                "2" => Some(self.ft_buckets.get(Bucket::Away)),
                "BTTS:Y" => Some(self.btts.yes),
                "BTTS:N" => Some(self.btts.no),
                other => self.over_under_label(other),
            }
        };
        fraction.map(|p| p * 100.0)
    }

    fn over_under_label(&self, label: &str) -> Option<f64> {
        let (side, line) = label.split_at_checked(1)?;
        let line: f64 = line.parse().ok()?;
        let ou = self.over_under.iter().find(|ou| ou.line == line)?;
        match side {
            "O" => Some(ou.over),
            "U" => Some(ou.under),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueBetRow {
    pub outcome: String,
    pub odds: f64,
    pub verdict: ValueBetVerdict,
}

/// The probability engine. Holds configuration only; every call is pure.
#[derive(Debug, Clone, Default)]
pub struct OutcomeModel {
    config: ModelConfig,
}

impl OutcomeModel {
    pub fn new(config: ModelConfig) -> ModelResult<Self> {
        require_non_negative("risk_factor", config.risk_factor)?;
        require_non_negative("truncation_tolerance", config.truncation_tolerance)?;
        for line in &config.over_under_lines {
            if !line.is_finite() || *line < 0.0 || line.fract() != 0.5 {
                return Err(ModelError::invalid(
                    "over_under_lines",
                    format!("{line} is not a non-negative half-integer"),
                ));
            }
        }
        // Surfaces bad bounds and fractions now rather than on first evaluation.
        ScorelineDistribution::build(0.0, 0.0, config.max_goals)?;
        ScorelineDistribution::build(0.0, 0.0, config.ht_max_goals)?;
        RatePair::new(1.0, 1.0)?.scaled(config.halftime_fraction)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn evaluate(&self, inputs: &MatchInputs) -> ModelResult<MatchReport> {
        let cfg = &self.config;
        let halftime_input = inputs.halftime.unwrap_or(HalftimeInput::Fraction {
            fraction: cfg.halftime_fraction,
        });
        let ht_rates = halftime_input.resolve(inputs.full_time)?;

        let full_time = ScorelineDistribution::from_rates(inputs.full_time, cfg.max_goals)?;
        let halftime = ScorelineDistribution::from_rates(ht_rates, cfg.ht_max_goals)?;

        let mut warnings = Vec::new();
        warnings.extend(full_time.truncation_warning(Period::FullTime, cfg.truncation_tolerance));
        warnings.extend(halftime.truncation_warning(Period::Halftime, cfg.truncation_tolerance));

        let htft = match cfg.htft_method {
            HtFtMethod::Weighted => {
                warnings.extend(cfg.ht_weights.normalization_warnings());
                htft::ht_ft_transition(&full_time, &cfg.ht_weights)
            }
            HtFtMethod::IndependentHalves => {
                let second = rates::second_half_rates(inputs.full_time, ht_rates)?;
                let second_half = ScorelineDistribution::from_rates(second, cfg.max_goals)?;
                warnings.extend(
                    second_half.truncation_warning(Period::SecondHalf, cfg.truncation_tolerance),
                );
                htft::ht_ft_from_halves(&halftime, &second_half)
            }
        };

        let over_under = cfg
            .over_under_lines
            .iter()
            .map(|line| full_time.over_under(*line))
            .collect::<ModelResult<Vec<_>>>()?;

        for w in &warnings {
            warn!(warning = %w, "model warning");
        }

        let report = MatchReport {
            full_time_rates: (inputs.full_time.home.value(), inputs.full_time.away.value()),
            halftime_rates: (ht_rates.home.value(), ht_rates.away.value()),
            ft_buckets: full_time.full_time_buckets(),
            ht_buckets: halftime.full_time_buckets(),
            btts: full_time.both_teams_to_score(),
            most_likely: full_time.most_likely(),
            over_under,
            htft,
            htft_method: cfg.htft_method,
            warnings,
            full_time,
            halftime,
        };
        debug!(
            home_rate = report.full_time_rates.0,
            away_rate = report.full_time_rates.1,
            mass = report.full_time.total_mass(),
            "evaluated match"
        );
        Ok(report)
    }

    /// One verdict per quoted outcome, in book order.
    pub fn value_bets(&self, report: &MatchReport, book: &OddsBook) -> ModelResult<Vec<ValueBetRow>> {
        book.iter()
            .map(|(outcome, odds)| {
                let predicted = report.probability_pct(outcome).ok_or_else(|| {
                    ModelError::invalid("outcome label", format!("unknown market {outcome:?}"))
                })?;
                let verdict = value::identify_value_bet(predicted, odds, self.config.risk_factor)?;
                Ok(ValueBetRow {
                    outcome: outcome.to_string(),
                    odds,
                    verdict,
                })
            })
            .collect()
    }

    pub fn recommend(
        &self,
        report: &MatchReport,
        book: &OddsBook,
    ) -> ModelResult<Option<Recommendation>> {
        value::recommend_best_bet(book, |label| report.probability_pct(label))
    }
}
