//! Independent-Poisson scoreline grid and the reductions read off it.
//!
//! The grid is truncated at `max_goals` per side and is never renormalised:
//! every reduction below partitions the grid's own mass, so `total_mass()` is
//! the reference against which complements (over, BTTS no) are taken.

use serde::Serialize;

use crate::error::{ModelError, ModelResult, ModelWarning, Period};
use crate::htft::Bucket;
use crate::rates::RatePair;

pub const MAX_GRID_GOALS: u32 = 50;
pub const DEFAULT_TRUNCATION_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketProbs {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

impl BucketProbs {
    pub fn get(&self, bucket: Bucket) -> f64 {
        match bucket {
            Bucket::Home => self.home,
            Bucket::Draw => self.draw,
            Bucket::Away => self.away,
        }
    }

    pub fn total(&self) -> f64 {
        self.home + self.draw + self.away
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OverUnder {
    pub line: f64,
    pub over: f64,
    pub under: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Btts {
    pub yes: f64,
    pub no: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Scoreline {
    pub home: u32,
    pub away: u32,
    pub probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScorelineDistribution {
    max_goals: u32,
    home_pmf: Vec<f64>,
    away_pmf: Vec<f64>,
    /// Row-major: `cells[i * side + j]` = P(home scores i, away scores j).
    cells: Vec<f64>,
}

impl ScorelineDistribution {
    pub fn build(home_rate: f64, away_rate: f64, max_goals: u32) -> ModelResult<Self> {
        let rates = RatePair::new(home_rate, away_rate)?;
        Self::from_rates(rates, max_goals)
    }

    pub fn from_rates(rates: RatePair, max_goals: u32) -> ModelResult<Self> {
        if max_goals == 0 || max_goals > MAX_GRID_GOALS {
            return Err(ModelError::invalid(
                "max_goals",
                format!("{max_goals} is outside 1..={MAX_GRID_GOALS}"),
            ));
        }
        let home_pmf = poisson_pmf(rates.home.value(), max_goals);
        let away_pmf = poisson_pmf(rates.away.value(), max_goals);

        let mut cells = Vec::with_capacity(home_pmf.len() * away_pmf.len());
        for p_i in &home_pmf {
            for p_j in &away_pmf {
                cells.push(p_i * p_j);
            }
        }

        Ok(Self {
            max_goals,
            home_pmf,
            away_pmf,
            cells,
        })
    }

    pub fn max_goals(&self) -> u32 {
        self.max_goals
    }

    fn side(&self) -> usize {
        self.max_goals as usize + 1
    }

    /// Zero outside the grid.
    pub fn cell(&self, home: u32, away: u32) -> f64 {
        if home > self.max_goals || away > self.max_goals {
            return 0.0;
        }
        self.cells[home as usize * self.side() + away as usize]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        self.cells.chunks(self.side())
    }

    fn indexed(&self) -> impl Iterator<Item = (u32, u32, f64)> + '_ {
        let side = self.side();
        self.cells
            .iter()
            .enumerate()
            .map(move |(idx, p)| ((idx / side) as u32, (idx % side) as u32, *p))
    }

    pub fn home_marginal(&self) -> &[f64] {
        &self.home_pmf
    }

    pub fn away_marginal(&self) -> &[f64] {
        &self.away_pmf
    }

    pub fn total_mass(&self) -> f64 {
        self.cells.iter().sum()
    }

    /// Probability mass lying beyond `max_goals` on either side.
    pub fn truncation_deficit(&self) -> f64 {
        (1.0 - self.total_mass()).max(0.0)
    }

    pub fn truncation_warning(&self, period: Period, tolerance: f64) -> Option<ModelWarning> {
        if self.truncation_deficit() > tolerance {
            Some(ModelWarning::TruncatedMass {
                period,
                mass: self.total_mass(),
                max_goals: self.max_goals,
            })
        } else {
            None
        }
    }

    /// Same grid with home and away swapped.
    pub fn transpose(&self) -> Self {
        let side = self.side();
        let mut cells = vec![0.0; self.cells.len()];
        for (i, j, p) in self.indexed() {
            cells[j as usize * side + i as usize] = p;
        }
        Self {
            max_goals: self.max_goals,
            home_pmf: self.away_pmf.clone(),
            away_pmf: self.home_pmf.clone(),
            cells,
        }
    }

    pub fn full_time_buckets(&self) -> BucketProbs {
        let mut out = BucketProbs {
            home: 0.0,
            draw: 0.0,
            away: 0.0,
        };
        for (i, j, p) in self.indexed() {
            match Bucket::classify(i, j) {
                Bucket::Home => out.home += p,
                Bucket::Draw => out.draw += p,
                Bucket::Away => out.away += p,
            }
        }
        out
    }

    /// `line` must be a non-negative half-integer such as 2.5.
    pub fn over_under(&self, line: f64) -> ModelResult<OverUnder> {
        let threshold = half_integer_floor(line)?;
        let under: f64 = self
            .indexed()
            .filter(|(i, j, _)| i + j <= threshold)
            .map(|(_, _, p)| p)
            .sum();
        Ok(OverUnder {
            line,
            over: (self.total_mass() - under).max(0.0),
            under,
        })
    }

    /// `yes` is the mass of cells where both sides score at least once and `no`
    /// is the rest of the grid. For the 0-0 cell alone see [`Self::neither_scores`].
    pub fn both_teams_to_score(&self) -> Btts {
        let yes: f64 = self
            .indexed()
            .filter(|(i, j, _)| *i >= 1 && *j >= 1)
            .map(|(_, _, p)| p)
            .sum();
        Btts {
            yes,
            no: (self.total_mass() - yes).max(0.0),
        }
    }

    /// `cell(0, 0)`.
    pub fn neither_scores(&self) -> f64 {
        self.cell(0, 0)
    }

    /// First maximum in row-major order, so ties favour fewer home goals, then
    /// fewer away goals.
    pub fn most_likely(&self) -> Scoreline {
        let mut best = Scoreline {
            home: 0,
            away: 0,
            probability: self.cells[0],
        };
        for (i, j, p) in self.indexed() {
            if p > best.probability {
                best = Scoreline {
                    home: i,
                    away: j,
                    probability: p,
                };
            }
        }
        best
    }

    /// Scorelines in descending probability, row-major order among equals.
    pub fn top_scorelines(&self, n: usize) -> Vec<Scoreline> {
        let mut all: Vec<Scoreline> = self
            .indexed()
            .map(|(home, away, probability)| Scoreline {
                home,
                away,
                probability,
            })
            .collect();
        all.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        all.truncate(n);
        all
    }
}

/// Truncated Poisson pmf for `k = 0..=max_k`. No residual is folded into the
/// last bucket; the missing tail is reported by the grid instead.
pub fn poisson_pmf(lambda: f64, max_k: u32) -> Vec<f64> {
    let max_k = max_k as usize;
    let mut out = vec![0.0; max_k + 1];
    out[0] = (-lambda).exp();
    for k in 1..=max_k {
        out[k] = out[k - 1] * lambda / k as f64;
    }
    out
}

fn half_integer_floor(line: f64) -> ModelResult<u32> {
    if !line.is_finite() || line < 0.0 || line.fract() != 0.5 {
        return Err(ModelError::invalid(
            "goal line",
            format!("{line} is not a non-negative half-integer"),
        ));
    }
    Ok(line.floor() as u32)
}
