use std::path::PathBuf;

use anyhow::{Context, Result};

use htft_terminal::batch::evaluate_cases;
use htft_terminal::config::{self, load_cases};
use htft_terminal::export::export_batch;
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

    let path = std::env::args()
        .skip(1)
        .find(|arg| !arg.starts_with("--"))
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("tests/fixtures/batch_cases.json"));

    let model = OutcomeModel::new(ModelConfig::from_env()?)
        .context("invalid model configuration")?;
    let cases = load_cases(&path)?;
    println!("Loaded {} cases from {}", cases.len(), path.display());

    let results = evaluate_cases(&model, &cases);

    println!(
        "{:<28}{:>8}{:>8}{:>8}{:>8}  {:<16}Recommended",
        "Match", "1 %", "X %", "2 %", "Score", "Value"
    );
    for result in &results {
        match &result.outcome {
            Ok(out) => {
                let r = &out.report;
                let value = out
                    .value_bets
                    .iter()
                    .filter(|row| row.verdict.is_value)
                    .map(|row| row.outcome.as_str())
                    .collect::<Vec<_>>()
                    .join(",");
                let rec = out
                    .recommendation
                    .as_ref()
                    .map(|rec| format!("{} @ {:.2} ({:+.2})", rec.outcome, rec.odds, rec.edge))
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{:<28}{:>8.1}{:>8.1}{:>8.1}{:>8}  {:<16}{rec}",
                    truncate(&result.name, 27),
                    r.ft_buckets.home * 100.0,
                    r.ft_buckets.draw * 100.0,
                    r.ft_buckets.away * 100.0,
                    format!("{}-{}", r.most_likely.home, r.most_likely.away),
                    if value.is_empty() { "-" } else { value.as_str() },
                );
            }
            Err(err) => println!("{:<28}error: {err}", truncate(&result.name, 27)),
        }
    }

    let failed = results.iter().filter(|r| !r.is_ok()).count();
    println!("{} ok, {} failed", results.len() - failed, failed);

    if has_flag("--xlsx") {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let out = PathBuf::from(format!("htft_batch_{stamp}.xlsx"));
        let summary = export_batch(&out, &results)?;
        println!("Wrote {} ({} rows)", summary.path.display(), summary.rows);
    }

    Ok(())
}

fn truncate(name: &str, max: usize) -> String {
    if name.chars().count() <= max {
        return name.to_string();
    }
    let mut out: String = name.chars().take(max.saturating_sub(1)).collect();
    out.push('~');
    out
}

fn has_flag(name: &str) -> bool {
    std::env::args().skip(1).any(|arg| arg == name)
}
