use std::collections::BTreeMap;

use orglens_core::RawRecord;

use crate::config::ColumnMapping;
use crate::error::EngineError;

/// Load CSV snapshot rows into raw records, applying the column mapping.
/// Unknown columns are retained verbatim in `fields`.
pub fn load_csv_records(
    source_name: &str,
    csv_data: &str,
    columns: &ColumnMapping,
) -> Result<Vec<RawRecord>, EngineError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(csv_data.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| EngineError::Io(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let idx = |name: &str| -> Result<usize, EngineError> {
        headers.iter().position(|h| h == name).ok_or_else(|| EngineError::MissingColumn {
            source: source_name.into(),
            column: name.into(),
        })
    };
    let optional_idx = |name: &Option<String>| -> Result<Option<usize>, EngineError> {
        match name {
            Some(column) => Ok(Some(idx(column)?)),
            None => Ok(None),
        }
    };

    let id_idx = idx(&columns.id)?;
    let name_idx = idx(&columns.name)?;
    let title_idx = optional_idx(&columns.title)?;
    let department_idx = optional_idx(&columns.department)?;
    let level_idx = optional_idx(&columns.level)?;
    let reports_to_idx = optional_idx(&columns.reports_to)?;

    let cell = |record: &csv::StringRecord, i: Option<usize>| -> Option<String> {
        i.and_then(|i| record.get(i))
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    let mut records = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::Io(e.to_string()))?;

        let mut fields = BTreeMap::new();
        for (i, h) in headers.iter().enumerate() {
            if let Some(value) = record.get(i) {
                fields.insert(h.clone(), value.to_string());
            }
        }

        records.push(RawRecord {
            id: cell(&record, Some(id_idx)),
            name: cell(&record, Some(name_idx)),
            title: cell(&record, title_idx),
            department: cell(&record, department_idx),
            level: cell(&record, level_idx),
            reports_to: cell(&record, reports_to_idx),
            fields,
        });
    }

    Ok(records)
}

/// Load a JSON snapshot: a top-level array of objects. The well-known keys
/// (`id`, `name`, `title`, `department`, `level`, `reports_to`) map onto the
/// raw record; everything else lands in `fields`.
pub fn load_json_records(source_name: &str, json_data: &str) -> Result<Vec<RawRecord>, EngineError> {
    let parsed: serde_json::Value = serde_json::from_str(json_data)
        .map_err(|e| EngineError::Io(format!("source '{source_name}': {e}")))?;

    let items = parsed.as_array().ok_or_else(|| {
        EngineError::Io(format!("source '{source_name}': expected a top-level JSON array"))
    })?;

    let mut records = Vec::with_capacity(items.len());
    for item in items {
        let object = item.as_object().ok_or_else(|| {
            EngineError::Io(format!("source '{source_name}': expected an array of objects"))
        })?;

        let mut raw = RawRecord::default();
        for (key, value) in object {
            let text = scalar_to_string(value);
            match key.as_str() {
                "id" => raw.id = text,
                "name" => raw.name = text,
                "title" => raw.title = text,
                "department" => raw.department = text,
                "level" => raw.level = text,
                "reports_to" => raw.reports_to = text,
                _ => {
                    if let Some(text) = text {
                        raw.fields.insert(key.clone(), text);
                    }
                }
            }
        }
        records.push(raw);
    }

    Ok(records)
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapping() -> ColumnMapping {
        ColumnMapping {
            id: "agent_id".into(),
            name: "full_name".into(),
            title: Some("rank_title".into()),
            department: None,
            level: Some("rank_level".into()),
            reports_to: Some("upline_id".into()),
        }
    }

    #[test]
    fn load_csv_basic() {
        let csv = "\
agent_id,full_name,rank_title,rank_level,upline_id,region
L1,Sarah Johnson,Master Agent,1,,West
L2,Robert Chen,Senior Distributor,2,L1,East
";
        let records = load_csv_records("ladder", csv, &mapping()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.as_deref(), Some("L1"));
        assert_eq!(records[0].level.as_deref(), Some("1"));
        assert_eq!(records[0].reports_to, None);
        assert_eq!(records[1].reports_to.as_deref(), Some("L1"));
        // Unknown columns survive in fields.
        assert_eq!(records[0].fields["region"], "West");
    }

    #[test]
    fn load_csv_missing_column() {
        let csv = "agent_id,rank_title\nL1,Master Agent\n";
        let err = load_csv_records("ladder", csv, &mapping()).unwrap_err();
        assert!(matches!(err, EngineError::MissingColumn { .. }));
        assert!(err.to_string().contains("full_name"));
    }

    #[test]
    fn load_json_basic() {
        let json = r#"[
            {"id": "E100", "name": "Sarah Johnson", "title": "Chief Executive Officer",
             "reports_to": null, "office": "HQ"},
            {"id": "E101", "name": "Robert Chen", "title": "VP Sales",
             "department": "Sales", "reports_to": "E100"}
        ]"#;
        let records = load_json_records("orgchart", json).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].reports_to, None);
        assert_eq!(records[0].fields["office"], "HQ");
        assert_eq!(records[1].department.as_deref(), Some("Sales"));
        assert_eq!(records[1].reports_to.as_deref(), Some("E100"));
    }

    #[test]
    fn load_json_numeric_level() {
        let json = r#"[{"id": "L1", "name": "Sarah Johnson", "level": 1}]"#;
        let records = load_json_records("ladder", json).unwrap();
        assert_eq!(records[0].level.as_deref(), Some("1"));
    }

    #[test]
    fn load_json_rejects_non_array() {
        let err = load_json_records("orgchart", r#"{"id": "E1"}"#).unwrap_err();
        assert!(err.to_string().contains("array"));
    }
}
