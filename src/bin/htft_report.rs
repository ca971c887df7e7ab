use std::path::PathBuf;

use anyhow::{Context, Result};

use htft_terminal::batch::evaluate_case;
use htft_terminal::config::{self, load_case};
use htft_terminal::export::{default_export_path, export_report};
use htft_terminal::model::{ModelConfig, OutcomeModel};

fn main() -> Result<()> {
    config::load_dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "htft_terminal=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let path = parse_path_arg(&["--risk", "--max-goals"])
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/match_case.json"));

    let mut model_config = ModelConfig::from_env()?;
    if let Some(risk) = parse_f64_arg("--risk") {
        model_config.risk_factor = risk;
    }
    if let Some(max_goals) = parse_u32_arg("--max-goals") {
        model_config.max_goals = max_goals;
        model_config.ht_max_goals = max_goals;
    }
    let model = OutcomeModel::new(model_config).context("invalid model configuration")?;

    let case = load_case(&path)?;
    let outcome = evaluate_case(&model, &case)
        .with_context(|| format!("evaluate {}", case.label()))?;
    let report = &outcome.report;

    if has_flag("--json") {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("Match: {}", case.label());
    println!(
        "Expected goals: FT {:.2}-{:.2}, HT {:.2}-{:.2}",
        report.full_time_rates.0,
        report.full_time_rates.1,
        report.halftime_rates.0,
        report.halftime_rates.1
    );
    println!(
        "1X2: {:.1}% / {:.1}% / {:.1}%",
        report.ft_buckets.home * 100.0,
        report.ft_buckets.draw * 100.0,
        report.ft_buckets.away * 100.0
    );
    println!(
        "Most likely score: {}-{} ({:.1}%)",
        report.most_likely.home,
        report.most_likely.away,
        report.most_likely.probability * 100.0
    );
    println!(
        "BTTS: yes {:.1}%, no {:.1}%",
        report.btts.yes * 100.0,
        report.btts.no * 100.0
    );
    for ou in &report.over_under {
        println!(
            "Over/Under {}: {:.1}% / {:.1}%",
            ou.line,
            ou.over * 100.0,
            ou.under * 100.0
        );
    }

    println!();
    println!("HT/FT probabilities ({:?}):", report.htft_method);
    for (outcome, p) in report.htft.entries() {
        println!("  {outcome}: {:.2}%", p * 100.0);
    }

    if !outcome.value_bets.is_empty() {
        let fair = case.odds.fair_probabilities()?;
        println!();
        println!("Value bets (book overround {:+.2}%):", case.odds.overround_pct()?);
        for (row, (_, fair_pct)) in outcome.value_bets.iter().zip(&fair) {
            let flag = if row.verdict.is_value { "VALUE" } else { "-" };
            println!(
                "  {:<5} @ {:>6.2}  model {:>6.2}%  implied {:>6.2}%  fair {:>6.2}%  margin {:>+6.2}  {flag}",
                row.outcome,
                row.odds,
                row.verdict.predicted_pct,
                row.verdict.implied_pct,
                fair_pct,
                row.verdict.margin
            );
        }
    }

    match outcome.recommendation.as_ref() {
        Some(rec) => println!(
            "Recommended bet: {} @ {:.2} (model {:.2}%, edge {:+.2})",
            rec.outcome, rec.odds, rec.predicted_pct, rec.edge
        ),
        None => println!("Recommended bet: none"),
    }

    for w in &report.warnings {
        println!("Warning: {w}");
    }

    if has_flag("--xlsx") {
        let summary = export_report(
            &default_export_path(),
            &case.label(),
            report,
            &outcome.value_bets,
            outcome.recommendation.as_ref(),
        )?;
        println!("Wrote {} ({} rows)", summary.path.display(), summary.rows);
    }

    Ok(())
}

/// First positional argument, skipping the values of flags that take one.
fn parse_path_arg(valued_flags: &[&str]) -> Option<PathBuf> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let mut skip_next = false;
    for arg in &args {
        if skip_next {
            skip_next = false;
            continue;
        }
        if valued_flags.contains(&arg.as_str()) {
            skip_next = true;
            continue;
        }
        if !arg.starts_with("--") {
            return Some(PathBuf::from(arg));
        }
    }
    None
}

fn parse_f64_arg(name: &str) -> Option<f64> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<f64>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<f64>()
        {
            return Some(v);
        }
    }
    None
}

fn parse_u32_arg(name: &str) -> Option<u32> {
    let args = std::env::args().skip(1).collect::<Vec<_>>();
    for (idx, arg) in args.iter().enumerate() {
        if let Some(raw) = arg.strip_prefix(&format!("{name}="))
            && let Ok(v) = raw.trim().parse::<u32>()
        {
            return Some(v);
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && let Ok(v) = next.trim().parse::<u32>()
        {
            return Some(v);
        }
    }
    None
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
