use std::path::Path;

use htft_terminal::config::{MatchCase, load_case};
use htft_terminal::model::ModelConfig;
use htft_terminal::state::{AppState, FieldKey, Focus, InputMode, Screen};

fn state() -> AppState {
    AppState::new(ModelConfig::default())
}

#[test]
fn ratings_mode_multiplies_attack_by_opposing_defense() {
    let state = state();
    let report = state.report.as_ref().unwrap();
    assert!((report.full_time_rates.0 - 1.8 * 1.3).abs() < 1e-9);
    assert!((report.full_time_rates.1 - 1.5 * 1.4).abs() < 1e-9);
    assert!((report.halftime_rates.0 - 1.8 * 1.3 * 0.5).abs() < 1e-9);
}

#[test]
fn adjusting_a_field_recomputes_the_report() {
    let mut state = state();
    let before = state.report.as_ref().unwrap().ft_buckets.home;
    state.selected = 0;
    state.adjust(4);
    assert_eq!(state.field(FieldKey::HomeAttack), Some(2.0));
    let after = state.report.as_ref().unwrap().ft_buckets.home;
    assert!(after > before);
}

#[test]
fn invalid_input_surfaces_an_error_instead_of_clamping() {
    let mut state = state();
    state.cycle_mode();
    assert_eq!(state.mode, InputMode::Strengths);
    let league_home = state
        .fields
        .iter()
        .position(|f| f.key == FieldKey::LeagueHome)
        .unwrap();
    state.selected = league_home;
    state.adjust(-100);
    assert!(state.field(FieldKey::LeagueHome).unwrap() <= 0.0);
    assert!(state.report.is_none());
    assert!(state.last_error.is_some());
    assert!(state.logs.back().unwrap().starts_with("[ERROR]"));

    state.adjust(100);
    assert!(state.report.is_some());
    assert!(state.last_error.is_none());
}

#[test]
fn odds_focus_edits_prices_in_place() {
    let mut state = state();
    state.toggle_focus();
    assert_eq!(state.focus, Focus::Odds);
    state.select_next();
    let label = state.odds.entries()[1].outcome.clone();
    let before = state.odds.get(&label).unwrap();
    state.adjust(2);
    assert!((state.odds.get(&label).unwrap() - (before + 0.1)).abs() < 1e-9);
    assert_eq!(state.odds.entries()[1].outcome, label);

    let row = state.value_bets.iter().find(|r| r.outcome == label).unwrap();
    assert!((row.verdict.implied_pct - 100.0 / row.odds).abs() < 1e-9);
}

#[test]
fn selection_stays_in_bounds() {
    let mut state = state();
    for _ in 0..50 {
        state.select_next();
    }
    assert_eq!(state.selected, state.fields.len() - 1);
    for _ in 0..50 {
        state.select_prev();
    }
    assert_eq!(state.selected, 0);
}

#[test]
fn mode_cycle_and_screen_toggle() {
    let mut state = state();
    state.cycle_mode();
    state.cycle_mode();
    assert_eq!(state.mode, InputMode::Rates);
    assert_eq!(state.field(FieldKey::HomeRate), Some(1.3));
    let report = state.report.as_ref().unwrap();
    assert_eq!((report.most_likely.home, report.most_likely.away), (1, 0));

    state.toggle_screen();
    assert_eq!(state.screen, Screen::Scorelines);
    state.toggle_screen();
    assert_eq!(state.screen, Screen::Overview);
}

#[test]
fn risk_factor_field_changes_value_flags() {
    let mut state = state();
    let flagged = |s: &AppState| s.value_bets.iter().filter(|r| r.verdict.is_value).count();
    let baseline = flagged(&state);
    let risk = state
        .fields
        .iter()
        .position(|f| f.key == FieldKey::RiskFactor)
        .unwrap();
    state.selected = risk;
    state.adjust(100);
    assert!(flagged(&state) <= baseline);
    assert_eq!(flagged(&state), 0);
}

#[test]
fn loading_fixture_case_seeds_inputs_and_odds() {
    let case = load_case(Path::new("tests/fixtures/match_case.json")).unwrap();
    let state = AppState::from_case(ModelConfig::default(), &case);
    assert_eq!(state.title, "Home vs Away");
    assert_eq!(state.mode, InputMode::Ratings);
    assert_eq!(state.odds.len(), 6);
    assert_eq!(state.field(FieldKey::AwayDefense), Some(1.3));
    assert!(state.logs.iter().any(|l| l.contains("Loaded case")));
}

#[test]
fn log_buffer_is_bounded() {
    let mut state = state();
    for i in 0..500 {
        state.push_log(format!("line {i}"));
    }
    assert_eq!(state.logs.len(), 200);
    assert_eq!(state.logs.back().unwrap(), "line 499");
}

#[test]
fn repeated_odds_label_yields_one_editable_row() {
    let case: MatchCase = serde_json::from_str(
        r#"{"rates":{"home":1.4,"away":1.1},
            "odds":[{"outcome":"1","odds":2.0},{"outcome":"X","odds":3.3},{"outcome":"1","odds":3.0}]}"#,
    )
    .unwrap();
    let mut state = AppState::from_case(ModelConfig::default(), &case);
    assert_eq!(state.odds.len(), 2);
    assert_eq!(state.value_bets.len(), 2);
    assert_eq!(state.odds.get("1"), Some(3.0));

    state.toggle_focus();
    state.select_next();
    state.adjust(2);
    assert_eq!(state.odds.get("1"), Some(3.0));
    assert_eq!(state.odds.get("X"), Some(3.4));
    assert_eq!(state.value_bets[1].outcome, "X");
    assert_eq!(state.value_bets[1].odds, 3.4);
}
