use htft_terminal::htft::{Bucket, HtFtMethod, HtFtOutcome, HtWeights, ht_ft_transition};
use htft_terminal::model::{MatchInputs, ModelConfig, OutcomeModel};
use htft_terminal::rates::HalftimeInput;
use htft_terminal::scoreline::ScorelineDistribution;

const EPS: f64 = 1e-9;

fn rate_sweep() -> impl Iterator<Item = (f64, f64)> {
    (0..=10).flat_map(|i| (0..=10).map(move |j| (i as f64 * 0.25, j as f64 * 0.25)))
}

#[test]
fn grid_mass_is_close_to_one_for_wide_grids() {
    for max_goals in [8, 10, 12] {
        for (home, away) in rate_sweep() {
            let dist = ScorelineDistribution::build(home, away, max_goals).unwrap();
            let mass = dist.total_mass();
            assert!(mass <= 1.0 + EPS, "mass {mass} above one for {home}/{away}");
            assert!(
                mass >= 1.0 - 5e-3,
                "mass {mass} too low for {home}/{away} at {max_goals}"
            );
        }
    }
}

#[test]
fn buckets_partition_the_grid() {
    for (home, away) in rate_sweep() {
        let dist = ScorelineDistribution::build(home, away, 6).unwrap();
        let buckets = dist.full_time_buckets();
        assert!((buckets.total() - dist.total_mass()).abs() < EPS);
        for p in [buckets.home, buckets.draw, buckets.away] {
            assert!((0.0..=1.0).contains(&p));
        }
    }
}

#[test]
fn btts_yes_and_no_cover_the_grid() {
    for (home, away) in rate_sweep() {
        let dist = ScorelineDistribution::build(home, away, 7).unwrap();
        let btts = dist.both_teams_to_score();
        assert!((btts.yes + btts.no - dist.total_mass()).abs() < EPS);
        assert!(btts.no >= dist.neither_scores() - EPS);
    }
}

#[test]
fn over_under_splits_the_grid_mass() {
    let dist = ScorelineDistribution::build(1.6, 1.1, 6).unwrap();
    let mut previous_over = f64::INFINITY;
    for line in [0.5, 1.5, 2.5, 3.5, 4.5] {
        let ou = dist.over_under(line).unwrap();
        assert!((ou.over + ou.under - dist.total_mass()).abs() < EPS);
        assert!(ou.over < previous_over);
        previous_over = ou.over;
    }
    assert!(dist.over_under(2.0).is_err());
}

#[test]
fn default_weighted_htft_sums_to_grid_mass() {
    let weights = HtWeights::default();
    assert!(weights.is_row_normalized());
    for (home, away) in rate_sweep() {
        let dist = ScorelineDistribution::build(home, away, 6).unwrap();
        let grid = ht_ft_transition(&dist, &weights);
        assert!((grid.total() - dist.total_mass()).abs() < 1e-9);
        assert_eq!(grid.entries().count(), 9);
    }
}

#[test]
fn default_weights_never_allow_away_lead_turning_into_home_win() {
    let dist = ScorelineDistribution::build(1.5, 1.5, 6).unwrap();
    let grid = ht_ft_transition(&dist, &HtWeights::default());
    let outcome = HtFtOutcome {
        ht: Bucket::Away,
        ft: Bucket::Home,
    };
    assert_eq!(grid.get(outcome), 0.0);
}

#[test]
fn swapping_rates_swaps_home_and_away() {
    for (a, b) in rate_sweep() {
        let forward = ScorelineDistribution::build(a, b, 6).unwrap().full_time_buckets();
        let back = ScorelineDistribution::build(b, a, 6).unwrap().full_time_buckets();
        assert!((forward.home - back.away).abs() < 1e-12);
        assert!((forward.away - back.home).abs() < 1e-12);
        assert!((forward.draw - back.draw).abs() < 1e-12);
    }
}

#[test]
fn transposed_grid_matches_swapped_rates() {
    let dist = ScorelineDistribution::build(1.7, 0.9, 6).unwrap();
    let swapped = ScorelineDistribution::build(0.9, 1.7, 6).unwrap();
    let transposed = dist.transpose();
    for i in 0..=6 {
        for j in 0..=6 {
            assert!((transposed.cell(i, j) - dist.cell(j, i)).abs() < 1e-15);
            assert!((transposed.cell(i, j) - swapped.cell(i, j)).abs() < 1e-12);
        }
    }
    assert_eq!(dist.cell(7, 0), 0.0);
}

#[test]
fn zero_rates_put_all_mass_on_nil_nil() {
    let dist = ScorelineDistribution::build(0.0, 0.0, 6).unwrap();
    let best = dist.most_likely();
    assert_eq!((best.home, best.away), (0, 0));
    assert!((best.probability - 1.0).abs() < EPS);
    let buckets = dist.full_time_buckets();
    assert!((buckets.draw - 1.0).abs() < EPS);
    assert_eq!(dist.both_teams_to_score().yes, 0.0);
}

#[test]
fn end_to_end_low_scoring_match() {
    let cfg = ModelConfig {
        max_goals: 5,
        ht_max_goals: 5,
        ..ModelConfig::default()
    };
    let model = OutcomeModel::new(cfg).unwrap();
    let report = model
        .evaluate(&MatchInputs::from_rates(1.3, 0.96).unwrap())
        .unwrap();

    assert_eq!((report.most_likely.home, report.most_likely.away), (1, 0));
    let b = report.ft_buckets;
    for p in [b.home, b.draw, b.away] {
        assert!(p > 0.0 && p < 1.0);
    }
    assert!((b.total() - 1.0).abs() < 0.01);
    assert!(b.home > b.away);
}

#[test]
fn negative_rates_and_bad_bounds_are_rejected() {
    assert!(ScorelineDistribution::build(-0.1, 1.0, 6).is_err());
    assert!(ScorelineDistribution::build(1.0, f64::NAN, 6).is_err());
    assert!(ScorelineDistribution::build(1.0, 1.0, 0).is_err());
    assert!(ScorelineDistribution::build(1.0, 1.0, 51).is_err());
    assert!(MatchInputs::from_rates(-1.0, 1.0).is_err());
}

#[test]
fn tight_grid_reports_truncation_warning() {
    let cfg = ModelConfig {
        max_goals: 3,
        ht_max_goals: 3,
        ..ModelConfig::default()
    };
    let model = OutcomeModel::new(cfg).unwrap();
    let report = model
        .evaluate(&MatchInputs::from_rates(2.8, 2.4).unwrap())
        .unwrap();
    assert!(!report.warnings.is_empty());
    assert!(report.full_time.total_mass() < 0.99);
}

#[test]
fn unnormalized_weights_warn_but_still_evaluate() {
    let weights = HtWeights::from_rows([[0.5, 0.4, 0.0], [0.4, 0.6, 0.0], [0.0, 0.4, 0.6]]).unwrap();
    assert!(!weights.is_row_normalized());
    let cfg = ModelConfig {
        ht_weights: weights,
        ..ModelConfig::default()
    };
    let report = OutcomeModel::new(cfg)
        .unwrap()
        .evaluate(&MatchInputs::from_rates(1.2, 1.0).unwrap())
        .unwrap();
    assert_eq!(report.warnings.len(), 1);
    assert!(report.htft.total() < report.full_time.total_mass());
}

#[test]
fn independent_halves_cover_both_grids() {
    let cfg = ModelConfig {
        max_goals: 10,
        ht_max_goals: 10,
        htft_method: HtFtMethod::IndependentHalves,
        ..ModelConfig::default()
    };
    let model = OutcomeModel::new(cfg).unwrap();
    let inputs = MatchInputs::from_rates(1.4, 1.1)
        .unwrap()
        .with_halftime(HalftimeInput::Rates {
            home: 0.6,
            away: 0.5,
        });
    let report = model.evaluate(&inputs).unwrap();
    assert!((report.htft.total() - 1.0).abs() < 1e-4);

    let leading_then_win = report.htft.get("1/1".parse().unwrap());
    let leading_then_lose = report.htft.get("1/2".parse().unwrap());
    assert!(leading_then_win > leading_then_lose);
    assert!(leading_then_lose > 0.0);
}

#[test]
fn explicit_halftime_rates_above_full_time_fail() {
    let inputs = MatchInputs::from_rates(1.0, 1.0)
        .unwrap()
        .with_halftime(HalftimeInput::Rates {
            home: 1.5,
            away: 0.5,
        });
    assert!(OutcomeModel::default().evaluate(&inputs).is_err());
}
