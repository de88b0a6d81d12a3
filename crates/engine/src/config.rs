use std::collections::HashMap;

use orglens_core::SourceSystem;
use serde::Deserialize;

use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct EngineConfig {
    pub name: String,
    #[serde(default)]
    pub sources: HashMap<String, SourceConfig>,
    #[serde(default)]
    pub resolver: ResolverConfig,
    #[serde(default)]
    pub classify: ClassifyConfig,
}

// ---------------------------------------------------------------------------
// Sources
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    pub system: SourceSystem,
    pub file: String,
    #[serde(default)]
    pub format: SnapshotFormat,
    /// Required for CSV snapshots; JSON snapshots carry their own field names.
    #[serde(default)]
    pub columns: Option<ColumnMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFormat {
    Csv,
    Json,
}

impl Default for SnapshotFormat {
    fn default() -> Self {
        Self::Csv
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnMapping {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub reports_to: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ResolverConfig {
    /// Pairs scoring at or above this become cluster edges.
    #[serde(default = "default_pair_threshold")]
    pub pair_threshold: f64,
    /// Clusters at or above this get `likely_same_person = true`.
    #[serde(default = "default_likely_threshold")]
    pub likely_threshold: f64,
    #[serde(default)]
    pub weights: WeightConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pair_threshold: default_pair_threshold(),
            likely_threshold: default_likely_threshold(),
            weights: WeightConfig::default(),
        }
    }
}

fn default_pair_threshold() -> f64 {
    0.75
}

fn default_likely_threshold() -> f64 {
    0.9
}

#[derive(Debug, Clone, Deserialize)]
pub struct WeightConfig {
    #[serde(default = "default_name_weight")]
    pub name: f64,
    #[serde(default = "default_title_weight")]
    pub title: f64,
    #[serde(default = "default_structure_weight")]
    pub structure: f64,
}

impl Default for WeightConfig {
    fn default() -> Self {
        Self {
            name: default_name_weight(),
            title: default_title_weight(),
            structure: default_structure_weight(),
        }
    }
}

fn default_name_weight() -> f64 {
    0.6
}

fn default_title_weight() -> f64 {
    0.25
}

fn default_structure_weight() -> f64 {
    0.15
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ClassifyConfig {
    #[serde(default = "default_leadership_keywords")]
    pub leadership_keywords: Vec<String>,
    #[serde(default = "default_manager_keywords")]
    pub manager_keywords: Vec<String>,
    #[serde(default = "default_honorifics")]
    pub honorifics: Vec<String>,
    /// Token → canonical token, applied before title comparison.
    #[serde(default = "default_title_synonyms")]
    pub title_synonyms: HashMap<String, String>,
}

impl Default for ClassifyConfig {
    fn default() -> Self {
        Self {
            leadership_keywords: default_leadership_keywords(),
            manager_keywords: default_manager_keywords(),
            honorifics: default_honorifics(),
            title_synonyms: default_title_synonyms(),
        }
    }
}

fn default_leadership_keywords() -> Vec<String> {
    ["chief", "vp", "vice", "president", "director", "head", "officer", "founder"]
        .map(String::from)
        .to_vec()
}

fn default_manager_keywords() -> Vec<String> {
    ["manager", "mgr", "lead", "supervisor", "foreman"]
        .map(String::from)
        .to_vec()
}

fn default_honorifics() -> Vec<String> {
    ["mr", "mrs", "ms", "miss", "dr", "prof", "jr", "sr", "ii", "iii", "iv"]
        .map(String::from)
        .to_vec()
}

fn default_title_synonyms() -> HashMap<String, String> {
    [
        ("vp", "vicepresident"),
        ("svp", "vicepresident"),
        ("evp", "vicepresident"),
        ("mgr", "manager"),
        ("dir", "director"),
        ("asst", "assistant"),
        ("sr", "senior"),
        ("jr", "junior"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn from_toml(input: &str) -> Result<Self, EngineError> {
        let config: EngineConfig =
            toml::from_str(input).map_err(|e| EngineError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let r = &self.resolver;
        for (label, value) in [
            ("pair_threshold", r.pair_threshold),
            ("likely_threshold", r.likely_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(EngineError::ConfigValidation(format!(
                    "{label} must be within [0, 1], got {value}"
                )));
            }
        }

        let w = &r.weights;
        if w.name < 0.0 || w.title < 0.0 || w.structure < 0.0 {
            return Err(EngineError::ConfigValidation(
                "weights must be non-negative".into(),
            ));
        }
        let sum = w.name + w.title + w.structure;
        if (sum - 1.0).abs() > 1e-6 {
            return Err(EngineError::ConfigValidation(format!(
                "weights must sum to 1.0, got {sum}"
            )));
        }

        for (source_name, source) in &self.sources {
            if source.format == SnapshotFormat::Csv && source.columns.is_none() {
                return Err(EngineError::ConfigValidation(format!(
                    "source '{source_name}': csv format requires a [sources.{source_name}.columns] table"
                )));
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"
name = "Acme Org"

[sources.ladder]
system = "ladder"
file = "ladder.csv"

[sources.ladder.columns]
id         = "agent_id"
name       = "full_name"
title      = "rank_title"
level      = "rank_level"
reports_to = "upline_id"

[sources.orgchart]
system = "orgchart"
file = "orgchart.json"
format = "json"

[resolver]
pair_threshold = 0.75
likely_threshold = 0.9
"#;

    #[test]
    fn parse_valid() {
        let config = EngineConfig::from_toml(VALID).unwrap();
        assert_eq!(config.name, "Acme Org");
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources["ladder"].system, SourceSystem::Ladder);
        assert_eq!(config.sources["orgchart"].format, SnapshotFormat::Json);
        assert_eq!(config.resolver.pair_threshold, 0.75);
        assert_eq!(config.resolver.weights.name, 0.6);
    }

    #[test]
    fn defaults_apply_without_tables() {
        let config = EngineConfig::from_toml(r#"name = "Bare""#).unwrap();
        assert_eq!(config.resolver.pair_threshold, 0.75);
        assert_eq!(config.resolver.likely_threshold, 0.9);
        assert!(config.classify.leadership_keywords.contains(&"chief".to_string()));
        assert!(config.classify.manager_keywords.contains(&"manager".to_string()));
        assert_eq!(config.classify.title_synonyms["vp"], "vicepresident");
    }

    #[test]
    fn reject_threshold_out_of_range() {
        let input = r#"
name = "Bad"
[resolver]
pair_threshold = 1.5
"#;
        let err = EngineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("pair_threshold"));
    }

    #[test]
    fn reject_weights_not_summing_to_one() {
        let input = r#"
name = "Bad"
[resolver.weights]
name = 0.5
title = 0.5
structure = 0.5
"#;
        let err = EngineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn reject_csv_source_without_columns() {
        let input = r#"
name = "Bad"
[sources.ladder]
system = "ladder"
file = "ladder.csv"
"#;
        let err = EngineConfig::from_toml(input).unwrap_err();
        assert!(err.to_string().contains("columns"));
    }

    #[test]
    fn unknown_system_becomes_other() {
        let input = r#"
name = "Custom"
[sources.payroll]
system = "payroll"
file = "payroll.json"
format = "json"
"#;
        let config = EngineConfig::from_toml(input).unwrap();
        assert_eq!(
            config.sources["payroll"].system,
            SourceSystem::Other("payroll".into())
        );
    }
}
