use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, anyhow, bail};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::htft::{HtFtMethod, HtWeights};
use crate::model::{MatchInputs, ModelConfig};
use crate::rates::{HalftimeInput, RatePair, StrengthInputs, StrengthRatings};
use crate::value::OddsBook;

/// Loads `.env.local` then `.env`; variables already set in the process win.
pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

impl ModelConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(opt_env)
    }

    /// Builds the configuration from `HTFT_*` settings served by `lookup`.
    /// Missing keys keep their defaults; unparseable ones are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let d = ModelConfig::default();
        let setting = |key: &str| lookup(key).filter(|val| !val.trim().is_empty());
        let max_goals = parse_setting("HTFT_MAX_GOALS", setting("HTFT_MAX_GOALS"), d.max_goals);
        let ht_weights = match setting("HTFT_HT_WEIGHTS_PATH") {
            Some(path) => load_ht_weights(Path::new(path.trim()))?,
            None => d.ht_weights,
        };
        let over_under_lines = setting("HTFT_OU_LINES")
            .and_then(|raw| parse_lines(&raw))
            .unwrap_or(d.over_under_lines);
        Ok(Self {
            max_goals,
            ht_max_goals: parse_setting("HTFT_HT_MAX_GOALS", setting("HTFT_HT_MAX_GOALS"), max_goals),
            halftime_fraction: parse_setting(
                "HTFT_HALFTIME_FRACTION",
                setting("HTFT_HALFTIME_FRACTION"),
                d.halftime_fraction,
            ),
            risk_factor: parse_setting("HTFT_RISK_FACTOR", setting("HTFT_RISK_FACTOR"), d.risk_factor),
            over_under_lines,
            truncation_tolerance: parse_setting(
                "HTFT_TRUNCATION_TOLERANCE",
                setting("HTFT_TRUNCATION_TOLERANCE"),
                d.truncation_tolerance,
            ),
            ht_weights,
            htft_method: parse_setting::<HtFtMethod>(
                "HTFT_HTFT_METHOD",
                setting("HTFT_HTFT_METHOD"),
                d.htft_method,
            ),
        })
    }
}

pub fn load_ht_weights(path: &Path) -> Result<HtWeights> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("read HT/FT weights {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse HT/FT weights {}", path.display()))
}

/// One match to evaluate, as stored in JSON fixtures and batch files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchCase {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub rates: Option<RateCase>,
    #[serde(default)]
    pub strengths: Option<StrengthInputs>,
    #[serde(default)]
    pub ratings: Option<StrengthRatings>,
    #[serde(default)]
    pub halftime: Option<HalftimeInput>,
    #[serde(default)]
    pub odds: OddsBook,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateCase {
    pub home: f64,
    pub away: f64,
}

impl MatchCase {
    pub fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "match".to_string())
    }

    pub fn inputs(&self) -> Result<MatchInputs> {
        let full_time = match (&self.rates, &self.strengths, &self.ratings) {
            (Some(r), None, None) => RatePair::new(r.home, r.away)?,
            (None, Some(s), None) => s.derive_rates()?,
            (None, None, Some(r)) => r.derive_rates()?,
            (None, None, None) => bail!("{}: one of rates, strengths or ratings is required", self.label()),
            _ => bail!("{}: rates, strengths and ratings are mutually exclusive", self.label()),
        };
        Ok(MatchInputs {
            full_time,
            halftime: self.halftime,
        })
    }
}

pub fn load_case(path: &Path) -> Result<MatchCase> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read match case {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parse match case {}", path.display()))
}

/// A batch file is either a single case or an array of cases.
pub fn load_cases(path: &Path) -> Result<Vec<MatchCase>> {
    let raw =
        fs::read_to_string(path).with_context(|| format!("read match cases {}", path.display()))?;
    let value: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;
    match value {
        serde_json::Value::Array(_) => {
            serde_json::from_value(value).context("decode match case list")
        }
        serde_json::Value::Object(_) => {
            Ok(vec![serde_json::from_value(value).context("decode match case")?])
        }
        _ => Err(anyhow!("{}: expected an object or array", path.display())),
    }
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val) })
}

pub(crate) fn env_parse<T: FromStr>(key: &str, default: T) -> T {
    parse_setting(key, opt_env(key), default)
}

fn parse_setting<T: FromStr>(key: &str, raw: Option<String>, default: T) -> T {
    let Some(raw) = raw else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(val) => val,
        Err(_) => {
            warn!(key, value = %raw, "ignoring unparseable setting");
            default
        }
    }
}

fn parse_lines(raw: &str) -> Option<Vec<f64>> {
    let lines = raw
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<f64>())
        .collect::<Result<Vec<_>, _>>();
    match lines {
        Ok(lines) if !lines.is_empty() => Some(lines),
        _ => {
            warn!(value = raw, "ignoring unparseable HTFT_OU_LINES");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    fn temp_json(name: &str, body: &str) -> std::path::PathBuf {
        let path = env::temp_dir().join(format!("htft_{}_{name}.json", std::process::id()));
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn no_settings_gives_defaults() {
        let cfg = ModelConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg, ModelConfig::default());
    }

    #[test]
    fn ht_bound_follows_ft_bound_unless_set() {
        let cfg = ModelConfig::from_lookup(lookup(&[("HTFT_MAX_GOALS", "9")])).unwrap();
        assert_eq!(cfg.max_goals, 9);
        assert_eq!(cfg.ht_max_goals, 9);

        let cfg = ModelConfig::from_lookup(lookup(&[
            ("HTFT_MAX_GOALS", "9"),
            ("HTFT_HT_MAX_GOALS", "5"),
        ]))
        .unwrap();
        assert_eq!(cfg.ht_max_goals, 5);
    }

    #[test]
    fn unparseable_settings_fall_back_to_defaults() {
        let cfg = ModelConfig::from_lookup(lookup(&[
            ("HTFT_MAX_GOALS", "lots"),
            ("HTFT_RISK_FACTOR", "0.1.2"),
            ("HTFT_OU_LINES", "2.5,many"),
            ("HTFT_HTFT_METHOD", "coin-flip"),
            ("HTFT_HALFTIME_FRACTION", "  "),
        ]))
        .unwrap();
        let d = ModelConfig::default();
        assert_eq!(cfg.max_goals, d.max_goals);
        assert_eq!(cfg.ht_max_goals, d.max_goals);
        assert_eq!(cfg.risk_factor, d.risk_factor);
        assert_eq!(cfg.over_under_lines, d.over_under_lines);
        assert_eq!(cfg.htft_method, d.htft_method);
        assert_eq!(cfg.halftime_fraction, d.halftime_fraction);
    }

    #[test]
    fn parsed_settings_are_applied() {
        let cfg = ModelConfig::from_lookup(lookup(&[
            ("HTFT_HTFT_METHOD", "halves"),
            ("HTFT_RISK_FACTOR", "0.15"),
            ("HTFT_HALFTIME_FRACTION", "0.45"),
            ("HTFT_OU_LINES", "0.5, 4.5"),
            ("HTFT_TRUNCATION_TOLERANCE", "1e-4"),
        ]))
        .unwrap();
        assert_eq!(cfg.htft_method, HtFtMethod::IndependentHalves);
        assert_eq!(cfg.risk_factor, 0.15);
        assert_eq!(cfg.halftime_fraction, 0.45);
        assert_eq!(cfg.over_under_lines, vec![0.5, 4.5]);
        assert_eq!(cfg.truncation_tolerance, 1e-4);
    }

    #[test]
    fn weight_table_is_loaded_from_path() {
        let path = temp_json("weights_ok", "[[0.5,0.5,0],[0.3,0.7,0],[0,0.5,0.5]]");
        let cfg = ModelConfig::from_lookup(lookup(&[(
            "HTFT_HT_WEIGHTS_PATH",
            path.to_str().unwrap(),
        )]))
        .unwrap();
        assert_eq!(cfg.ht_weights.rows()[1], [0.3, 0.7, 0.0]);
        fs::remove_file(path).ok();
    }

    #[test]
    fn negative_weight_table_is_rejected() {
        let path = temp_json("weights_negative", "[[0.6,0.4,0],[0.4,0.6,0],[0,1.4,-0.4]]");
        assert!(load_ht_weights(&path).is_err());
        let err = ModelConfig::from_lookup(lookup(&[(
            "HTFT_HT_WEIGHTS_PATH",
            path.to_str().unwrap(),
        )]))
        .unwrap_err();
        assert!(format!("{err:#}").contains("HT/FT weights"));
        fs::remove_file(path).ok();

        assert!(load_ht_weights(Path::new("/nonexistent/htft_weights.json")).is_err());
    }

    #[test]
    fn numeric_setting_falls_back_on_garbage() {
        assert_eq!(parse_setting("HTFT_PARALLELISM", Some("many".to_string()), 4usize), 4);
        assert_eq!(parse_setting("HTFT_PARALLELISM", Some(" 8 ".to_string()), 4usize), 8);
        assert_eq!(parse_setting::<usize>("HTFT_PARALLELISM", None, 4), 4);
    }

    #[test]
    fn parse_lines_handles_spacing_and_garbage() {
        assert_eq!(parse_lines(" 1.5, 2.5 ,3.5"), Some(vec![1.5, 2.5, 3.5]));
        assert_eq!(parse_lines("2.5,abc"), None);
        assert_eq!(parse_lines(" , "), None);
    }

    #[test]
    fn case_requires_exactly_one_rate_source() {
        let case: MatchCase = serde_json::from_str(r#"{"name":"empty"}"#).unwrap();
        assert!(case.inputs().is_err());

        let case: MatchCase = serde_json::from_str(
            r#"{"rates":{"home":1.0,"away":1.0},
                "ratings":{"home_attack":1,"home_defense":1,"away_attack":1,"away_defense":1}}"#,
        )
        .unwrap();
        assert!(case.inputs().is_err());
    }

    #[test]
    fn ratings_case_uses_product_form() {
        let case: MatchCase = serde_json::from_str(
            r#"{"ratings":{"home_attack":1.8,"home_defense":1.4,"away_attack":1.5,"away_defense":1.3},
                "halftime":{"fraction":0.5},
                "odds":[{"outcome":"1/1","odds":4.5}]}"#,
        )
        .unwrap();
        let inputs = case.inputs().unwrap();
        assert!((inputs.full_time.home.value() - 2.34).abs() < 1e-12);
        assert_eq!(inputs.halftime, Some(HalftimeInput::Fraction { fraction: 0.5 }));
        assert_eq!(case.odds.get("1/1"), Some(4.5));
        assert_eq!(case.label(), "match");
    }
}
