use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{MatchCase, env_parse};
use crate::model::{MatchReport, OutcomeModel, ValueBetRow};
use crate::value::Recommendation;

const DEFAULT_PARALLELISM: usize = 4;

#[derive(Debug, Clone, Serialize)]
pub struct CaseResult {
    pub name: String,
    pub outcome: Result<CaseOutcome, String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CaseOutcome {
    pub report: MatchReport,
    pub value_bets: Vec<ValueBetRow>,
    pub recommendation: Option<Recommendation>,
}

impl CaseResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

pub fn evaluate_case(model: &OutcomeModel, case: &MatchCase) -> anyhow::Result<CaseOutcome> {
    let inputs = case.inputs()?;
    let report = model.evaluate(&inputs)?;
    let value_bets = model.value_bets(&report, &case.odds)?;
    let recommendation = model.recommend(&report, &case.odds)?;
    Ok(CaseOutcome {
        report,
        value_bets,
        recommendation,
    })
}

/// Evaluates every case on a bounded pool. Output order matches input order and
/// a failing case is recorded rather than aborting the rest.
pub fn evaluate_cases(model: &OutcomeModel, cases: &[MatchCase]) -> Vec<CaseResult> {
    let pool = build_eval_pool();
    let results = with_eval_pool(&pool, || {
        cases
            .par_iter()
            .map(|case| CaseResult {
                name: case.label(),
                outcome: evaluate_case(model, case).map_err(|err| format!("{err:#}")),
            })
            .collect::<Vec<_>>()
    });

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    if failed > 0 {
        warn!(failed, total = results.len(), "some match cases failed");
    }
    info!(total = results.len(), "batch evaluated");
    results
}

fn build_eval_pool() -> Option<rayon::ThreadPool> {
    let threads = eval_parallelism();
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .ok()
}

fn with_eval_pool<T>(pool: &Option<rayon::ThreadPool>, action: impl FnOnce() -> T + Send) -> T
where
    T: Send,
{
    if let Some(pool) = pool.as_ref() {
        pool.install(action)
    } else {
        action()
    }
}

fn eval_parallelism() -> usize {
    env_parse("HTFT_PARALLELISM", DEFAULT_PARALLELISM).clamp(1, 32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn case(json: &str) -> MatchCase {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn failures_are_isolated_and_order_is_kept() {
        let cases = vec![
            case(r#"{"name":"a","rates":{"home":1.2,"away":0.9}}"#),
            case(r#"{"name":"b","rates":{"home":-1.0,"away":0.9}}"#),
            case(r#"{"name":"c","rates":{"home":0.8,"away":1.4},"odds":[{"outcome":"2","odds":2.4}]}"#),
        ];
        let results = evaluate_cases(&OutcomeModel::default(), &cases);
        let names: Vec<&str> = results.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(results[0].is_ok());
        assert!(!results[1].is_ok());
        let c = results[2].outcome.as_ref().unwrap();
        assert_eq!(c.value_bets.len(), 1);
        assert_eq!(c.recommendation.as_ref().unwrap().outcome, "2");
    }
}
