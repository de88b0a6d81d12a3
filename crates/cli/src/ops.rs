//! Command implementations: config loading, snapshot ingestion, output.

use std::path::{Path, PathBuf};

use orglens_core::SourceSystem;
use orglens_engine::config::SnapshotFormat;
use orglens_engine::snapshot::{load_csv_records, load_json_records};
use orglens_engine::{
    CycleBudget, Engine, EngineConfig, EngineError, QueryFilter, SnapshotBatch, ViewName,
};

use crate::exit_codes::{engine_exit_code, EXIT_INVALID_CONFIG};
use crate::CliError;

fn engine_err(err: EngineError) -> CliError {
    CliError {
        code: engine_exit_code(&err),
        message: err.to_string(),
        hint: None,
    }
}

fn load_config(path: &Path) -> Result<EngineConfig, CliError> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;
    EngineConfig::from_toml(&raw).map_err(engine_err)
}

/// Load every configured snapshot, in source-name order so repeated runs
/// ingest identically. File paths resolve relative to the config's directory.
fn load_batches(config: &EngineConfig, base_dir: &Path) -> Result<Vec<SnapshotBatch>, CliError> {
    let mut names: Vec<&String> = config.sources.keys().collect();
    names.sort();

    let mut batches = Vec::with_capacity(names.len());
    for name in names {
        let source = &config.sources[name];
        let path = base_dir.join(&source.file);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| CliError::io(format!("cannot read {}: {e}", path.display())))?;

        let records = match source.format {
            SnapshotFormat::Csv => {
                // Validation guarantees a columns table for CSV sources.
                let columns = source.columns.as_ref().ok_or_else(|| {
                    CliError {
                        code: EXIT_INVALID_CONFIG,
                        message: format!("source '{name}': csv format requires a columns table"),
                        hint: None,
                    }
                })?;
                load_csv_records(name, &raw, columns).map_err(engine_err)?
            }
            SnapshotFormat::Json => load_json_records(name, &raw).map_err(engine_err)?,
        };

        batches.push(SnapshotBatch {
            source: name.clone(),
            system: source.system.clone(),
            records,
        });
    }
    Ok(batches)
}

/// Load config + snapshots and run one full cycle.
fn run_engine(config_path: &Path, budget: &CycleBudget) -> Result<Engine, CliError> {
    let config = load_config(config_path)?;
    let base_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
    let batches = load_batches(&config, base_dir)?;

    let engine = Engine::new(config).map_err(engine_err)?;
    engine.ingest_cycle(&batches, budget).map_err(engine_err)?;
    Ok(engine)
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), CliError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
    println!("{json}");
    Ok(())
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

pub fn cmd_run(
    config_path: PathBuf,
    json_output: bool,
    output_file: Option<PathBuf>,
    timeout_ms: Option<u64>,
) -> Result<(), CliError> {
    let budget = match timeout_ms {
        Some(ms) => CycleBudget::with_deadline(std::time::Duration::from_millis(ms)),
        None => CycleBudget::unbounded(),
    };

    let engine = run_engine(&config_path, &budget)?;
    let outcome = engine
        .diagnostics()
        .ok_or_else(|| CliError::io("cycle completed without an outcome"))?;

    if output_file.is_some() || json_output {
        let json = serde_json::to_string_pretty(&outcome)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        if let Some(ref path) = output_file {
            std::fs::write(path, &json)
                .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if json_output {
            println!("{json}");
        }
    }

    // Human summary to stderr
    let s = &outcome.summary;
    eprintln!(
        "{}: {} records — {} cross-references ({} likely), {} skipped, {} sources aborted",
        outcome.meta.config_name,
        s.records,
        s.cross_references,
        s.likely_same_person,
        s.skipped_records,
        s.aborted_sources,
    );
    if s.unblockable_records > 0 {
        eprintln!("note: {} records could not be blocked for matching", s.unblockable_records);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// validate
// ---------------------------------------------------------------------------

pub fn cmd_validate(config_path: PathBuf) -> Result<(), CliError> {
    let config = load_config(&config_path)?;
    println!("config OK: \"{}\" ({} sources)", config.name, config.sources.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// query
// ---------------------------------------------------------------------------

pub fn cmd_query(
    config_path: PathBuf,
    department: Option<String>,
    system: Option<String>,
    leadership: bool,
    managers: bool,
    name_contains: Option<String>,
) -> Result<(), CliError> {
    let filter = QueryFilter {
        department,
        source_system: system.map(SourceSystem::from),
        is_leadership: leadership.then_some(true),
        is_manager: managers.then_some(true),
        name_contains,
    };

    let engine = run_engine(&config_path, &CycleBudget::unbounded())?;
    let records = engine.query(&filter);
    print_json(&records)?;
    eprintln!("{} records", records.len());
    Ok(())
}

// ---------------------------------------------------------------------------
// view
// ---------------------------------------------------------------------------

pub fn cmd_view(config_path: PathBuf, name: String) -> Result<(), CliError> {
    let view_name: ViewName = name.parse().map_err(|e: EngineError| {
        engine_err(e).with_hint(
            "valid names: source:<system>, organizational, department, leadership, managers",
        )
    })?;

    let engine = run_engine(&config_path, &CycleBudget::unbounded())?;
    print_json(&engine.materialize_view(&view_name))
}

// ---------------------------------------------------------------------------
// xrefs
// ---------------------------------------------------------------------------

pub fn cmd_xrefs(config_path: PathBuf, min_confidence: Option<f64>) -> Result<(), CliError> {
    if let Some(floor) = min_confidence {
        if !(0.0..=1.0).contains(&floor) {
            return Err(CliError::args(format!(
                "--min-confidence must be within [0, 1], got {floor}"
            )));
        }
    }

    let engine = run_engine(&config_path, &CycleBudget::unbounded())?;
    let xrefs = engine.cross_references(min_confidence);
    print_json(&xrefs)?;
    eprintln!("{} cross-references", xrefs.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_fixture(dir: &Path) -> PathBuf {
        fs::write(
            dir.join("people.csv"),
            "emp_id,employee,position,dept\nD1,Sarah Johnson,Marketing Director,Marketing\n",
        )
        .unwrap();
        let config_path = dir.join("orglens.toml");
        fs::write(
            &config_path,
            r#"
name = "cli test"

[sources.roster]
system = "department"
file = "people.csv"

[sources.roster.columns]
id         = "emp_id"
name       = "employee"
title      = "position"
department = "dept"
"#,
        )
        .unwrap();
        config_path
    }

    #[test]
    fn batches_load_relative_to_the_config_directory() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_fixture(dir.path());

        let config = load_config(&config_path).unwrap();
        let batches = load_batches(&config, dir.path()).unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].source, "roster");
        assert_eq!(batches[0].system, SourceSystem::Department);
        assert_eq!(batches[0].records.len(), 1);
        assert_eq!(batches[0].records[0].name.as_deref(), Some("Sarah Johnson"));
    }

    #[test]
    fn missing_snapshot_file_is_a_runtime_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_fixture(dir.path());
        fs::remove_file(dir.path().join("people.csv")).unwrap();

        let config = load_config(&config_path).unwrap();
        let err = load_batches(&config, dir.path()).unwrap_err();
        assert_eq!(err.code, crate::exit_codes::EXIT_RUNTIME);
        assert!(err.message.contains("people.csv"));
    }

    #[test]
    fn invalid_config_maps_to_its_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("bad.toml");
        fs::write(
            &config_path,
            "name = \"bad\"\n[resolver]\npair_threshold = 2.0\n",
        )
        .unwrap();
        let err = load_config(&config_path).unwrap_err();
        assert_eq!(err.code, EXIT_INVALID_CONFIG);
    }

    #[test]
    fn end_to_end_cycle_through_the_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = write_fixture(dir.path());
        let engine = run_engine(&config_path, &CycleBudget::unbounded()).unwrap();
        assert_eq!(engine.query(&QueryFilter::default()).len(), 1);
    }
}
