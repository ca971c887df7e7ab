use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, require_finite, require_non_negative};

pub const DEFAULT_HALFTIME_FRACTION: f64 = 0.5;

/// Expected goals for one side over one period. Always finite and non-negative.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct ScoreRate(f64);

impl ScoreRate {
    pub fn new(value: f64) -> ModelResult<Self> {
        require_non_negative("score rate", value).map(ScoreRate)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

/// Home/away rate pair for one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RatePair {
    pub home: ScoreRate,
    pub away: ScoreRate,
}

impl RatePair {
    pub fn new(home: f64, away: f64) -> ModelResult<Self> {
        Ok(Self {
            home: ScoreRate::new(home)?,
            away: ScoreRate::new(away)?,
        })
    }

    pub fn scaled(self, fraction: f64) -> ModelResult<Self> {
        let fraction = require_fraction(fraction)?;
        Self::new(self.home.value() * fraction, self.away.value() * fraction)
    }
}

/// Per-match team averages plus the league baselines they are measured against.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthInputs {
    pub home_scored: f64,
    pub home_conceded: f64,
    pub away_scored: f64,
    pub away_conceded: f64,
    /// League-wide goals per match scored by home sides.
    pub league_home: f64,
    /// League-wide goals per match scored by away sides.
    pub league_away: f64,
}

impl StrengthInputs {
    /// `attack × opponent defense × league average`, each strength relative to
    /// the league average of the side it feeds.
    pub fn derive_rates(&self) -> ModelResult<RatePair> {
        let league_home = require_league_average("league_home", self.league_home)?;
        let league_away = require_league_average("league_away", self.league_away)?;

        let home_attack = require_non_negative("home_scored", self.home_scored)? / league_home;
        let away_defense = require_non_negative("away_conceded", self.away_conceded)? / league_home;
        let away_attack = require_non_negative("away_scored", self.away_scored)? / league_away;
        let home_defense = require_non_negative("home_conceded", self.home_conceded)? / league_away;

        RatePair::new(
            home_attack * away_defense * league_home,
            away_attack * home_defense * league_away,
        )
    }
}

/// Ratings already expressed as multipliers: `home = attack × opponent defense`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrengthRatings {
    pub home_attack: f64,
    pub home_defense: f64,
    pub away_attack: f64,
    pub away_defense: f64,
}

impl StrengthRatings {
    pub fn derive_rates(&self) -> ModelResult<RatePair> {
        rates_from_strengths(
            self.home_attack,
            self.away_defense,
            self.away_attack,
            self.home_defense,
        )
    }
}

pub fn rates_from_strengths(
    home_attack: f64,
    away_defense: f64,
    away_attack: f64,
    home_defense: f64,
) -> ModelResult<RatePair> {
    let home_attack = require_non_negative("home_attack", home_attack)?;
    let away_defense = require_non_negative("away_defense", away_defense)?;
    let away_attack = require_non_negative("away_attack", away_attack)?;
    let home_defense = require_non_negative("home_defense", home_defense)?;
    RatePair::new(home_attack * away_defense, away_attack * home_defense)
}

/// How the halftime rate pair is obtained from the match inputs. In JSON this
/// is either `{"fraction": f}` or `{"home": h, "away": a}`, never a mix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "HalftimeFields", into = "HalftimeFields")]
pub enum HalftimeInput {
    Fraction { fraction: f64 },
    Rates { home: f64, away: f64 },
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct HalftimeFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fraction: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    home: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    away: Option<f64>,
}

impl TryFrom<HalftimeFields> for HalftimeInput {
    type Error = String;

    fn try_from(fields: HalftimeFields) -> Result<Self, Self::Error> {
        match (fields.fraction, fields.home, fields.away) {
            (Some(fraction), None, None) => Ok(HalftimeInput::Fraction { fraction }),
            (None, Some(home), Some(away)) => Ok(HalftimeInput::Rates { home, away }),
            (Some(_), _, _) => Err("halftime takes either a fraction or home/away rates".into()),
            _ => Err("halftime rates need both home and away".into()),
        }
    }
}

impl From<HalftimeInput> for HalftimeFields {
    fn from(input: HalftimeInput) -> Self {
        match input {
            HalftimeInput::Fraction { fraction } => HalftimeFields {
                fraction: Some(fraction),
                ..Self::default()
            },
            HalftimeInput::Rates { home, away } => HalftimeFields {
                home: Some(home),
                away: Some(away),
                ..Self::default()
            },
        }
    }
}

impl Default for HalftimeInput {
    fn default() -> Self {
        HalftimeInput::Fraction {
            fraction: DEFAULT_HALFTIME_FRACTION,
        }
    }
}

impl HalftimeInput {
    /// Resolve to a rate pair. Explicit halftime rates may not exceed the
    /// full-time ones, since the second half cannot have negative expectation.
    pub fn resolve(&self, full_time: RatePair) -> ModelResult<RatePair> {
        match *self {
            HalftimeInput::Fraction { fraction } => full_time.scaled(fraction),
            HalftimeInput::Rates { home, away } => {
                let ht = RatePair::new(home, away)?;
                if ht.home > full_time.home {
                    return Err(ModelError::invalid(
                        "halftime home rate",
                        format!(
                            "{} exceeds full-time rate {}",
                            ht.home.value(),
                            full_time.home.value()
                        ),
                    ));
                }
                if ht.away > full_time.away {
                    return Err(ModelError::invalid(
                        "halftime away rate",
                        format!(
                            "{} exceeds full-time rate {}",
                            ht.away.value(),
                            full_time.away.value()
                        ),
                    ));
                }
                Ok(ht)
            }
        }
    }
}

/// Rates for the second half once the first-half share is known.
pub fn second_half_rates(full_time: RatePair, halftime: RatePair) -> ModelResult<RatePair> {
    RatePair::new(
        (full_time.home.value() - halftime.home.value()).max(0.0),
        (full_time.away.value() - halftime.away.value()).max(0.0),
    )
}

fn require_fraction(fraction: f64) -> ModelResult<f64> {
    let fraction = require_finite("halftime fraction", fraction)?;
    if !(0.0..=1.0).contains(&fraction) {
        return Err(ModelError::invalid(
            "halftime fraction",
            format!("{fraction} is outside [0, 1]"),
        ));
    }
    Ok(fraction)
}

fn require_league_average(name: &'static str, value: f64) -> ModelResult<f64> {
    let value = require_finite(name, value)?;
    if value <= 0.0 {
        return Err(ModelError::invalid(
            name,
            format!("league average must be positive, got {value}"),
        ));
    }
    Ok(value)
}
