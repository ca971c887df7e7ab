use std::collections::VecDeque;

use crate::config::MatchCase;
use crate::error::ModelWarning;
use crate::model::{MatchInputs, MatchReport, ModelConfig, OutcomeModel, ValueBetRow};
use crate::rates::{HalftimeInput, RatePair, StrengthInputs, rates_from_strengths};
use crate::value::{OddsBook, Recommendation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// Expected goals typed in directly.
    Rates,
    /// Attack/defense multipliers, multiplied pairwise.
    Ratings,
    /// Team averages measured against league averages.
    Strengths,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Overview,
    Scorelines,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Inputs,
    Odds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKey {
    HomeRate,
    AwayRate,
    HomeAttack,
    HomeDefense,
    AwayAttack,
    AwayDefense,
    HomeScored,
    HomeConceded,
    AwayScored,
    AwayConceded,
    LeagueHome,
    LeagueAway,
    HalftimeFraction,
    RiskFactor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InputField {
    pub key: FieldKey,
    pub label: &'static str,
    pub value: f64,
    pub step: f64,
}

impl InputField {
    fn new(key: FieldKey, label: &'static str, value: f64, step: f64) -> Self {
        Self {
            key,
            label,
            value,
            step,
        }
    }
}

const ODDS_STEP: f64 = 0.05;

pub struct AppState {
    pub screen: Screen,
    pub focus: Focus,
    pub mode: InputMode,
    pub fields: Vec<InputField>,
    pub selected: usize,
    pub odds: OddsBook,
    pub odds_selected: usize,
    pub config: ModelConfig,
    pub title: String,
    pub report: Option<MatchReport>,
    pub value_bets: Vec<ValueBetRow>,
    pub recommendation: Option<Recommendation>,
    pub last_error: Option<String>,
    pub logs: VecDeque<String>,
    /// Kinds of warning raised by the last successful evaluation.
    active_warnings: Vec<String>,
    pub help_overlay: bool,
}

impl AppState {
    pub fn new(config: ModelConfig) -> Self {
        let mut state = Self {
            screen: Screen::Overview,
            focus: Focus::Inputs,
            mode: InputMode::Ratings,
            fields: Vec::new(),
            selected: 0,
            odds: default_odds(),
            odds_selected: 0,
            title: "Home vs Away".to_string(),
            report: None,
            value_bets: Vec::new(),
            recommendation: None,
            last_error: None,
            logs: VecDeque::new(),
            active_warnings: Vec::new(),
            help_overlay: false,
            config,
        };
        state.fields = state.fields_for_mode(InputMode::Ratings, None);
        state.recompute();
        state
    }

    /// Seed the inputs from a match case. Cases given as strengths or ratings
    /// keep that form so the underlying numbers stay editable.
    pub fn from_case(config: ModelConfig, case: &MatchCase) -> Self {
        let mut state = Self::new(config);
        state.title = case.label();
        if !case.odds.is_empty() {
            state.odds = case.odds.clone();
        }
        if let Some(HalftimeInput::Fraction { fraction }) = case.halftime {
            state.config.halftime_fraction = fraction;
        }
        if matches!(case.halftime, Some(HalftimeInput::Rates { .. })) {
            state.push_log("[WARN] Explicit halftime rates not editable; using fraction");
        }

        let (mode, values) = if let Some(r) = case.rates {
            (InputMode::Rates, vec![r.home, r.away])
        } else if let Some(r) = case.ratings {
            (
                InputMode::Ratings,
                vec![r.home_attack, r.home_defense, r.away_attack, r.away_defense],
            )
        } else if let Some(s) = case.strengths {
            (
                InputMode::Strengths,
                vec![
                    s.home_scored,
                    s.home_conceded,
                    s.away_scored,
                    s.away_conceded,
                    s.league_home,
                    s.league_away,
                ],
            )
        } else {
            (InputMode::Ratings, Vec::new())
        };
        state.mode = mode;
        state.fields = state.fields_for_mode(mode, Some(&values));
        state.selected = 0;
        state.odds_selected = 0;
        state.recompute();
        state.push_log(format!("[INFO] Loaded case {}", state.title));
        state
    }

    fn fields_for_mode(&self, mode: InputMode, seed: Option<&[f64]>) -> Vec<InputField> {
        let mut fields = match mode {
            InputMode::Rates => vec![
                InputField::new(FieldKey::HomeRate, "Home xG", 1.30, 0.05),
                InputField::new(FieldKey::AwayRate, "Away xG", 0.96, 0.05),
            ],
            InputMode::Ratings => vec![
                InputField::new(FieldKey::HomeAttack, "Home attack", 1.8, 0.05),
                InputField::new(FieldKey::HomeDefense, "Home defense", 1.4, 0.05),
                InputField::new(FieldKey::AwayAttack, "Away attack", 1.5, 0.05),
                InputField::new(FieldKey::AwayDefense, "Away defense", 1.3, 0.05),
            ],
            InputMode::Strengths => vec![
                InputField::new(FieldKey::HomeScored, "Home scored/gm", 1.8, 0.05),
                InputField::new(FieldKey::HomeConceded, "Home conceded/gm", 0.9, 0.05),
                InputField::new(FieldKey::AwayScored, "Away scored/gm", 1.2, 0.05),
                InputField::new(FieldKey::AwayConceded, "Away conceded/gm", 1.5, 0.05),
                InputField::new(FieldKey::LeagueHome, "League home avg", 1.5, 0.05),
                InputField::new(FieldKey::LeagueAway, "League away avg", 1.2, 0.05),
            ],
        };
        if let Some(seed) = seed {
            for (field, value) in fields.iter_mut().zip(seed) {
                field.value = *value;
            }
        }
        fields.push(InputField::new(
            FieldKey::HalftimeFraction,
            "Halftime share",
            self.config.halftime_fraction,
            0.05,
        ));
        fields.push(InputField::new(
            FieldKey::RiskFactor,
            "Risk factor",
            self.config.risk_factor,
            0.05,
        ));
        fields
    }

    pub fn field(&self, key: FieldKey) -> Option<f64> {
        self.fields.iter().find(|f| f.key == key).map(|f| f.value)
    }

    pub fn cycle_mode(&mut self) {
        let next = match self.mode {
            InputMode::Rates => InputMode::Ratings,
            InputMode::Ratings => InputMode::Strengths,
            InputMode::Strengths => InputMode::Rates,
        };
        self.mode = next;
        self.fields = self.fields_for_mode(next, None);
        self.selected = 0;
        self.push_log(format!("[INFO] Input mode: {}", mode_label(next)));
        self.recompute();
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Inputs => Focus::Odds,
            Focus::Odds => Focus::Inputs,
        };
    }

    pub fn toggle_screen(&mut self) {
        self.screen = match self.screen {
            Screen::Overview => Screen::Scorelines,
            Screen::Scorelines => Screen::Overview,
        };
    }

    pub fn select_next(&mut self) {
        match self.focus {
            Focus::Inputs => {
                if self.selected + 1 < self.fields.len() {
                    self.selected += 1;
                }
            }
            Focus::Odds => {
                if self.odds_selected + 1 < self.odds.len() {
                    self.odds_selected += 1;
                }
            }
        }
    }

    pub fn select_prev(&mut self) {
        match self.focus {
            Focus::Inputs => self.selected = self.selected.saturating_sub(1),
            Focus::Odds => self.odds_selected = self.odds_selected.saturating_sub(1),
        }
    }

    /// Moves the focused value by `steps` increments and re-evaluates. Values
    /// are not clamped; out-of-range inputs show up as model errors.
    pub fn adjust(&mut self, steps: i32) {
        match self.focus {
            Focus::Inputs => {
                let Some(field) = self.fields.get_mut(self.selected) else {
                    return;
                };
                field.value = round_step(field.value + field.step * steps as f64);
            }
            Focus::Odds => {
                let Some(current) = self.odds.entries().get(self.odds_selected).map(|e| e.odds)
                else {
                    return;
                };
                let odds = round_step(current + ODDS_STEP * steps as f64);
                self.odds.set_odds_at(self.odds_selected, odds);
            }
        }
        self.recompute();
    }

    pub fn match_inputs(&self) -> anyhow::Result<MatchInputs> {
        let get = |key| {
            self.field(key)
                .ok_or_else(|| anyhow::anyhow!("missing input {key:?}"))
        };
        let full_time = match self.mode {
            InputMode::Rates => RatePair::new(get(FieldKey::HomeRate)?, get(FieldKey::AwayRate)?)?,
            InputMode::Ratings => rates_from_strengths(
                get(FieldKey::HomeAttack)?,
                get(FieldKey::AwayDefense)?,
                get(FieldKey::AwayAttack)?,
                get(FieldKey::HomeDefense)?,
            )?,
            InputMode::Strengths => StrengthInputs {
                home_scored: get(FieldKey::HomeScored)?,
                home_conceded: get(FieldKey::HomeConceded)?,
                away_scored: get(FieldKey::AwayScored)?,
                away_conceded: get(FieldKey::AwayConceded)?,
                league_home: get(FieldKey::LeagueHome)?,
                league_away: get(FieldKey::LeagueAway)?,
            }
            .derive_rates()?,
        };
        Ok(MatchInputs {
            full_time,
            halftime: Some(HalftimeInput::Fraction {
                fraction: get(FieldKey::HalftimeFraction)?,
            }),
        })
    }

    fn effective_config(&self) -> ModelConfig {
        let mut config = self.config.clone();
        if let Some(fraction) = self.field(FieldKey::HalftimeFraction) {
            config.halftime_fraction = fraction;
        }
        if let Some(risk) = self.field(FieldKey::RiskFactor) {
            config.risk_factor = risk;
        }
        config
    }

    pub fn recompute(&mut self) {
        match self.evaluate() {
            Ok((report, value_bets, recommendation)) => {
                let kinds = warning_kinds(&report.warnings);
                if kinds != self.active_warnings {
                    for w in &report.warnings {
                        self.push_log(format!("[WARN] {w}"));
                    }
                    self.active_warnings = kinds;
                }
                self.report = Some(report);
                self.value_bets = value_bets;
                self.recommendation = recommendation;
                self.last_error = None;
            }
            Err(err) => {
                let msg = format!("{err:#}");
                tracing::warn!(error = %msg, "evaluation failed");
                self.push_log(format!("[ERROR] {msg}"));
                self.report = None;
                self.value_bets.clear();
                self.recommendation = None;
                self.last_error = Some(msg);
            }
        }
    }

    fn evaluate(
        &self,
    ) -> anyhow::Result<(MatchReport, Vec<ValueBetRow>, Option<Recommendation>)> {
        let model = OutcomeModel::new(self.effective_config())?;
        let inputs = self.match_inputs()?;
        let report = model.evaluate(&inputs)?;
        let value_bets = model.value_bets(&report, &self.odds)?;
        let recommendation = model.recommend(&report, &self.odds)?;
        Ok((report, value_bets, recommendation))
    }

    pub fn push_log(&mut self, msg: impl Into<String>) {
        const MAX_LOGS: usize = 200;
        self.logs.push_back(msg.into());
        while self.logs.len() > MAX_LOGS {
            self.logs.pop_front();
        }
    }
}

pub fn mode_label(mode: InputMode) -> &'static str {
    match mode {
        InputMode::Rates => "xG rates",
        InputMode::Ratings => "Ratings",
        InputMode::Strengths => "League strengths",
    }
}

/// The HT/FT prices the dashboard opens with.
pub fn default_odds() -> OddsBook {
    [
        ("1/1", 4.50),
        ("1/X", 5.00),
        ("1/2", 15.00),
        ("X/1", 6.00),
        ("X/X", 3.50),
        ("X/2", 7.00),
    ]
    .into_iter()
    .map(|(label, odds)| (label.to_string(), odds))
    .collect()
}

/// Identity of a warning without its numbers, so a drifting mass does not
/// count as a new warning.
fn warning_kinds(warnings: &[ModelWarning]) -> Vec<String> {
    warnings
        .iter()
        .map(|w| match w {
            ModelWarning::TruncatedMass { period, .. } => format!("truncated {period}"),
            ModelWarning::UnnormalizedWeights { row, .. } => format!("weights row {row}"),
        })
        .collect()
}

/// Keeps repeated +/- presses from accumulating float noise.
fn round_step(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
