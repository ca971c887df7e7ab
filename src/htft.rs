use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult, ModelWarning};
use crate::scoreline::ScorelineDistribution;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bucket {
    Home,
    Draw,
    Away,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Home, Bucket::Draw, Bucket::Away];

    pub fn classify(home_goals: u32, away_goals: u32) -> Self {
        if home_goals > away_goals {
            Bucket::Home
        } else if home_goals < away_goals {
            Bucket::Away
        } else {
            Bucket::Draw
        }
    }

    pub fn index(self) -> usize {
        match self {
            Bucket::Home => 0,
            Bucket::Draw => 1,
            Bucket::Away => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Bucket::Home => "1",
            Bucket::Draw => "X",
            Bucket::Away => "2",
        }
    }

    fn from_label(raw: &str) -> Option<Self> {
        match raw.trim() {
            "1" => Some(Bucket::Home),
            "X" | "x" => Some(Bucket::Draw),
            "2" => Some(Bucket::Away),
            _ => None,
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HtFtOutcome {
    pub ht: Bucket,
    pub ft: Bucket,
}

impl HtFtOutcome {
    /// `1/1, 1/X, 1/2, X/1, ... 2/2`.
    pub fn all() -> impl Iterator<Item = HtFtOutcome> {
        Bucket::ALL
            .into_iter()
            .flat_map(|ht| Bucket::ALL.into_iter().map(move |ft| HtFtOutcome { ht, ft }))
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.ht, self.ft)
    }
}

impl fmt::Display for HtFtOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ht, self.ft)
    }
}

impl FromStr for HtFtOutcome {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let parsed = raw.split_once('/').and_then(|(ht, ft)| {
            Some(HtFtOutcome {
                ht: Bucket::from_label(ht)?,
                ft: Bucket::from_label(ft)?,
            })
        });
        parsed.ok_or_else(|| ModelError::invalid("HT/FT label", format!("{raw:?}")))
    }
}

/// Conditional HT-bucket weights given the FT bucket. Rows are indexed by FT
/// bucket, columns by HT bucket, both in `Home, Draw, Away` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "[[f64; 3]; 3]", into = "[[f64; 3]; 3]")]
pub struct HtWeights([[f64; 3]; 3]);

impl Default for HtWeights {
    fn default() -> Self {
        HtWeights([[0.60, 0.40, 0.00], [0.40, 0.60, 0.00], [0.00, 0.40, 0.60]])
    }
}

impl TryFrom<[[f64; 3]; 3]> for HtWeights {
    type Error = ModelError;

    fn try_from(rows: [[f64; 3]; 3]) -> Result<Self, Self::Error> {
        HtWeights::from_rows(rows)
    }
}

impl From<HtWeights> for [[f64; 3]; 3] {
    fn from(weights: HtWeights) -> Self {
        weights.0
    }
}

impl HtWeights {
    pub const ROW_SUM_TOLERANCE: f64 = 1e-9;

    pub fn from_rows(rows: [[f64; 3]; 3]) -> ModelResult<Self> {
        for row in &rows {
            for w in row {
                if !w.is_finite() || *w < 0.0 {
                    return Err(ModelError::invalid(
                        "ht_weights",
                        format!("weight {w} must be finite and non-negative"),
                    ));
                }
            }
        }
        Ok(HtWeights(rows))
    }

    pub fn weight(&self, ft: Bucket, ht: Bucket) -> f64 {
        self.0[ft.index()][ht.index()]
    }

    pub fn rows(&self) -> &[[f64; 3]; 3] {
        &self.0
    }

    /// One warning per row whose weights do not sum to 1.
    pub fn normalization_warnings(&self) -> Vec<ModelWarning> {
        self.0
            .iter()
            .enumerate()
            .filter_map(|(row, weights)| {
                let sum: f64 = weights.iter().sum();
                ((sum - 1.0).abs() > Self::ROW_SUM_TOLERANCE)
                    .then_some(ModelWarning::UnnormalizedWeights { row, sum })
            })
            .collect()
    }

    pub fn is_row_normalized(&self) -> bool {
        self.normalization_warnings().is_empty()
    }
}

/// How HT/FT probabilities are composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HtFtMethod {
    /// `P(FT bucket) × weight(HT | FT)`.
    #[default]
    Weighted,
    /// Two independent Poisson halves convolved into the final score.
    IndependentHalves,
}

impl FromStr for HtFtMethod {
    type Err = ModelError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_lowercase().as_str() {
            "weighted" => Ok(HtFtMethod::Weighted),
            "halves" | "independent_halves" | "independent-halves" => {
                Ok(HtFtMethod::IndependentHalves)
            }
            other => Err(ModelError::invalid("htft method", format!("{other:?}"))),
        }
    }
}

/// The nine HT/FT probabilities, indexed `[ht][ft]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HtFtGrid([[f64; 3]; 3]);

impl HtFtGrid {
    pub fn get(&self, outcome: HtFtOutcome) -> f64 {
        self.0[outcome.ht.index()][outcome.ft.index()]
    }

    pub fn entries(&self) -> impl Iterator<Item = (HtFtOutcome, f64)> + '_ {
        HtFtOutcome::all().map(|o| (o, self.get(o)))
    }

    pub fn total(&self) -> f64 {
        self.0.iter().flatten().sum()
    }
}

pub fn ht_ft_transition(dist_ft: &ScorelineDistribution, weights: &HtWeights) -> HtFtGrid {
    let ft = dist_ft.full_time_buckets();
    let mut grid = [[0.0; 3]; 3];
    for outcome in HtFtOutcome::all() {
        grid[outcome.ht.index()][outcome.ft.index()] =
            ft.get(outcome.ft) * weights.weight(outcome.ft, outcome.ht);
    }
    HtFtGrid(grid)
}

/// Convolve a first-half grid with an independent second-half grid. The
/// result's total equals the product of the two grids' masses.
pub fn ht_ft_from_halves(
    first_half: &ScorelineDistribution,
    second_half: &ScorelineDistribution,
) -> HtFtGrid {
    let mut grid = [[0.0; 3]; 3];
    let first_max = first_half.max_goals();
    let second_max = second_half.max_goals();
    for a in 0..=first_max {
        for b in 0..=first_max {
            let p_ht = first_half.cell(a, b);
            if p_ht == 0.0 {
                continue;
            }
            let ht = Bucket::classify(a, b);
            for c in 0..=second_max {
                for d in 0..=second_max {
                    let ft = Bucket::classify(a + c, b + d);
                    grid[ht.index()][ft.index()] += p_ht * second_half.cell(c, d);
                }
            }
        }
    }
    HtFtGrid(grid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_one_x_two_convention() {
        let labels: Vec<String> = HtFtOutcome::all().map(|o| o.label()).collect();
        assert_eq!(
            labels,
            vec!["1/1", "1/X", "1/2", "X/1", "X/X", "X/2", "2/1", "2/X", "2/2"]
        );
    }

    #[test]
    fn labels_parse_back() {
        let o: HtFtOutcome = "X/2".parse().unwrap();
        assert_eq!(o.ht, Bucket::Draw);
        assert_eq!(o.ft, Bucket::Away);
        assert!("3/1".parse::<HtFtOutcome>().is_err());
        assert!("1X".parse::<HtFtOutcome>().is_err());
    }

    #[test]
    fn default_weights_are_row_normalized() {
        assert!(HtWeights::default().is_row_normalized());
    }

    #[test]
    fn negative_weights_are_rejected() {
        let rows = [[0.5, 0.5, 0.0], [0.5, -0.1, 0.6], [0.0, 0.4, 0.6]];
        assert!(HtWeights::from_rows(rows).is_err());
    }

    #[test]
    fn unnormalized_rows_warn() {
        let rows = [[0.6, 0.4, 0.0], [0.4, 0.6, 0.0], [0.2, 0.4, 0.0]];
        let weights = HtWeights::from_rows(rows).unwrap();
        let warnings = weights.normalization_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            warnings[0],
            ModelWarning::UnnormalizedWeights { row: 2, .. }
        ));
        assert!(!weights.is_row_normalized());
    }

    #[test]
    fn weights_deserialize_through_validation() {
        let ok: HtWeights = serde_json::from_str("[[1,0,0],[0,1,0],[0,0,1]]").unwrap();
        assert_eq!(ok.weight(Bucket::Draw, Bucket::Draw), 1.0);
        assert!(serde_json::from_str::<HtWeights>("[[1,0,0],[0,-1,0],[0,0,1]]").is_err());
    }

    #[test]
    fn weighted_transition_scales_full_time_buckets() {
        let dist = ScorelineDistribution::build(2.34, 2.1, 5).unwrap();
        let ft = dist.full_time_buckets();
        let grid = ht_ft_transition(&dist, &HtWeights::default());
        let one_one: HtFtOutcome = "1/1".parse().unwrap();
        assert!((grid.get(one_one) - ft.home * 0.6).abs() < 1e-15);
        let two_one: HtFtOutcome = "2/1".parse().unwrap();
        assert_eq!(grid.get(two_one), 0.0);
    }

    #[test]
    fn halves_sum_to_product_of_masses() {
        let first = ScorelineDistribution::build(0.6, 0.5, 8).unwrap();
        let second = ScorelineDistribution::build(0.7, 0.6, 8).unwrap();
        let grid = ht_ft_from_halves(&first, &second);
        let expected = first.total_mass() * second.total_mass();
        assert!((grid.total() - expected).abs() < 1e-12);
        // Leading at the break and holding on is the likeliest way to win.
        let one_one = grid.get("1/1".parse().unwrap());
        let x_one = grid.get("X/1".parse().unwrap());
        let two_one = grid.get("2/1".parse().unwrap());
        assert!(one_one > two_one);
        assert!(x_one > two_one);
    }

    #[test]
    fn method_parses_aliases() {
        assert_eq!("halves".parse::<HtFtMethod>().unwrap(), HtFtMethod::IndependentHalves);
        assert_eq!("Weighted".parse::<HtFtMethod>().unwrap(), HtFtMethod::Weighted);
        assert!("poisson".parse::<HtFtMethod>().is_err());
    }
}
