use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::batch::CaseResult;
use crate::model::{MatchReport, ValueBetRow};
use crate::value::Recommendation;

pub struct ExportSummary {
    pub path: PathBuf,
    pub sheets: usize,
    pub rows: usize,
}

/// `htft_report_<timestamp>.xlsx` in the working directory.
pub fn default_export_path() -> PathBuf {
    let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    PathBuf::from(format!("htft_report_{stamp}.xlsx"))
}

pub fn export_report(
    path: &Path,
    title: &str,
    report: &MatchReport,
    value_bets: &[ValueBetRow],
    recommendation: Option<&Recommendation>,
) -> Result<ExportSummary> {
    let sheets: Vec<(&str, Vec<Vec<String>>)> = vec![
        ("Summary", summary_rows(title, report, recommendation)),
        ("Scorelines", scoreline_rows(report)),
        ("HTFT", htft_rows(report)),
        ("Value Bets", value_rows(value_bets)),
    ];

    let mut workbook = Workbook::new();
    let mut rows = 0usize;
    for (name, sheet_rows) in &sheets {
        let worksheet = workbook.add_worksheet();
        worksheet
            .set_name(*name)
            .with_context(|| format!("name sheet {name}"))?;
        write_rows(worksheet, sheet_rows)?;
        rows += sheet_rows.len();
    }

    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        sheets: sheets.len(),
        rows,
    })
}

/// One row per case: buckets, likeliest score and the recommended bet, or the error.
pub fn export_batch(path: &Path, results: &[CaseResult]) -> Result<ExportSummary> {
    let rows = batch_rows(results);
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Batch").context("name sheet Batch")?;
    write_rows(worksheet, &rows)?;
    workbook
        .save(path)
        .with_context(|| format!("save workbook {}", path.display()))?;

    Ok(ExportSummary {
        path: path.to_path_buf(),
        sheets: 1,
        rows: rows.len(),
    })
}

fn summary_rows(
    title: &str,
    report: &MatchReport,
    recommendation: Option<&Recommendation>,
) -> Vec<Vec<String>> {
    let mut rows = vec![
        vec!["Field".to_string(), "Value".to_string()],
        vec!["Match".to_string(), title.to_string()],
        vec!["Home xG (FT)".to_string(), fmt_rate(report.full_time_rates.0)],
        vec!["Away xG (FT)".to_string(), fmt_rate(report.full_time_rates.1)],
        vec!["Home xG (HT)".to_string(), fmt_rate(report.halftime_rates.0)],
        vec!["Away xG (HT)".to_string(), fmt_rate(report.halftime_rates.1)],
        vec!["Home win %".to_string(), fmt_pct(report.ft_buckets.home)],
        vec!["Draw %".to_string(), fmt_pct(report.ft_buckets.draw)],
        vec!["Away win %".to_string(), fmt_pct(report.ft_buckets.away)],
        vec!["HT home lead %".to_string(), fmt_pct(report.ht_buckets.home)],
        vec!["HT level %".to_string(), fmt_pct(report.ht_buckets.draw)],
        vec!["HT away lead %".to_string(), fmt_pct(report.ht_buckets.away)],
        vec!["BTTS yes %".to_string(), fmt_pct(report.btts.yes)],
        vec!["BTTS no %".to_string(), fmt_pct(report.btts.no)],
        vec![
            "Most likely score".to_string(),
            format!(
                "{}-{} ({})",
                report.most_likely.home,
                report.most_likely.away,
                fmt_pct(report.most_likely.probability)
            ),
        ],
        vec![
            "Grid mass".to_string(),
            format!("{:.6}", report.full_time.total_mass()),
        ],
    ];
    for ou in &report.over_under {
        rows.push(vec![format!("Over {} %", ou.line), fmt_pct(ou.over)]);
        rows.push(vec![format!("Under {} %", ou.line), fmt_pct(ou.under)]);
    }
    if let Some(rec) = recommendation {
        rows.push(vec![
            "Recommended".to_string(),
            format!("{} @ {:.2} (edge {:+.2})", rec.outcome, rec.odds, rec.edge),
        ]);
    }
    for w in &report.warnings {
        rows.push(vec!["Warning".to_string(), w.to_string()]);
    }
    rows
}

fn scoreline_rows(report: &MatchReport) -> Vec<Vec<String>> {
    let max = report.full_time.max_goals();
    let mut header = vec!["Home \\ Away".to_string()];
    header.extend((0..=max).map(|j| j.to_string()));
    let mut rows = vec![header];
    for (i, row) in report.full_time.rows().enumerate() {
        let mut out = vec![i.to_string()];
        out.extend(row.iter().map(|p| fmt_pct(*p)));
        rows.push(out);
    }
    rows
}

fn htft_rows(report: &MatchReport) -> Vec<Vec<String>> {
    let mut rows = vec![vec!["HT/FT".to_string(), "Probability %".to_string()]];
    rows.extend(
        report
            .htft
            .entries()
            .map(|(outcome, p)| vec![outcome.label(), fmt_pct(p)]),
    );
    rows
}

fn value_rows(value_bets: &[ValueBetRow]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Outcome".to_string(),
        "Odds".to_string(),
        "Predicted %".to_string(),
        "Implied %".to_string(),
        "Margin".to_string(),
        "Value".to_string(),
    ]];
    rows.extend(value_bets.iter().map(|row| {
        vec![
            row.outcome.clone(),
            format!("{:.2}", row.odds),
            format!("{:.2}", row.verdict.predicted_pct),
            format!("{:.2}", row.verdict.implied_pct),
            format!("{:+.2}", row.verdict.margin),
            if row.verdict.is_value { "yes" } else { "no" }.to_string(),
        ]
    }));
    rows
}

fn batch_rows(results: &[CaseResult]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![
        "Match".to_string(),
        "Home %".to_string(),
        "Draw %".to_string(),
        "Away %".to_string(),
        "Most likely".to_string(),
        "Value bets".to_string(),
        "Recommended".to_string(),
        "Error".to_string(),
    ]];
    for result in results {
        let row = match &result.outcome {
            Ok(out) => {
                let r = &out.report;
                let value = out
                    .value_bets
                    .iter()
                    .filter(|row| row.verdict.is_value)
                    .map(|row| row.outcome.as_str())
                    .collect::<Vec<_>>()
                    .join(" ");
                let rec = out
                    .recommendation
                    .as_ref()
                    .map(|rec| format!("{} @ {:.2}", rec.outcome, rec.odds))
                    .unwrap_or_default();
                vec![
                    result.name.clone(),
                    fmt_pct(r.ft_buckets.home),
                    fmt_pct(r.ft_buckets.draw),
                    fmt_pct(r.ft_buckets.away),
                    format!("{}-{}", r.most_likely.home, r.most_likely.away),
                    value,
                    rec,
                    String::new(),
                ]
            }
            Err(err) => {
                let mut row = vec![result.name.clone()];
                row.extend(std::iter::repeat_n(String::new(), 6));
                row.push(err.clone());
                row
            }
        };
        rows.push(row);
    }
    rows
}

fn fmt_pct(fraction: f64) -> String {
    format!("{:.2}", fraction * 100.0)
}

fn fmt_rate(rate: f64) -> String {
    format!("{rate:.3}")
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}
