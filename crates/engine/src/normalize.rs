use orglens_core::{PersonRecord, RawRecord, SourceKey, SourceSystem};

use crate::config::ClassifyConfig;
use crate::error::EngineError;

/// Maps one raw source record into the canonical schema.
///
/// Pure and deterministic: identical input always yields identical output.
/// The resolver's reproducibility depends on that, so the keyword tables are
/// fixed at construction — reconfiguring means building a new instance.
pub struct Normalizer {
    leadership_keywords: Vec<String>,
    manager_keywords: Vec<String>,
    honorifics: Vec<String>,
}

impl Normalizer {
    pub fn new(config: &ClassifyConfig) -> Self {
        let lower = |words: &[String]| words.iter().map(|w| w.to_lowercase()).collect();
        Self {
            leadership_keywords: lower(&config.leadership_keywords),
            manager_keywords: lower(&config.manager_keywords),
            honorifics: lower(&config.honorifics),
        }
    }

    /// Normalize one raw record. Records without a source id or name cannot
    /// be identified and are rejected, never fabricated.
    pub fn normalize(
        &self,
        system: &SourceSystem,
        raw: &RawRecord,
    ) -> Result<PersonRecord, EngineError> {
        let id = match raw.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(EngineError::Validation {
                    system: system.clone(),
                    reason: "record has no source id".into(),
                })
            }
        };

        let canonical_name = match raw.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                return Err(EngineError::Validation {
                    system: system.clone(),
                    reason: format!("record '{id}' has no name"),
                })
            }
        };

        let level = match raw.level.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(value.parse::<u8>().map_err(|_| EngineError::Validation {
                system: system.clone(),
                reason: format!("record '{id}': cannot parse level '{value}'"),
            })?),
        };

        let title = raw.title.as_deref().map(str::trim).unwrap_or("").to_string();
        let (is_leadership, is_manager) = self.classify_title(&title);

        let department = raw
            .department
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);

        let reports_to = raw
            .reports_to
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(|r| SourceKey::new(system.clone(), r));

        Ok(PersonRecord {
            key: SourceKey::new(system.clone(), id),
            name_key: self.fold_name(&canonical_name),
            canonical_name,
            title,
            department,
            level,
            reports_to,
            is_leadership,
            is_manager,
            raw: raw.fields.clone(),
        })
    }

    /// Deterministic name folding: case-fold, drop punctuation, strip
    /// honorifics, collapse whitespace.
    pub fn fold_name(&self, name: &str) -> String {
        let lowered: String = name
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();

        lowered
            .split_whitespace()
            .filter(|token| !self.honorifics.iter().any(|h| h == token))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Advisory, non-exclusive classification from the keyword tables.
    fn classify_title(&self, title: &str) -> (bool, bool) {
        let lowered: String = title
            .to_lowercase()
            .chars()
            .map(|c| if c.is_alphanumeric() { c } else { ' ' })
            .collect();
        let tokens: Vec<&str> = lowered.split_whitespace().collect();

        let is_leadership = tokens
            .iter()
            .any(|t| self.leadership_keywords.iter().any(|k| k == t));
        let is_manager = tokens
            .iter()
            .any(|t| self.manager_keywords.iter().any(|k| k == t));
        (is_leadership, is_manager)
    }
}
