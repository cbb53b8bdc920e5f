use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::EvalError;
use crate::util::ensure_directory;

/// Reads one record per non-blank line.
pub fn read_jsonl<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    if !path.exists() {
        return Err(EvalError::MissingInputFile(path.to_path_buf()).into());
    }

    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).with_context(|| {
            format!("failed to parse line {} of {}", index + 1, path.display())
        })?;
        records.push(record);
    }

    Ok(records)
}

/// Overwrites `path` with one compact JSON object per line.
pub fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_directory(parent)?;
    }

    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    for record in records {
        serde_json::to_writer(&mut writer, record)
            .with_context(|| format!("failed to serialize record for {}", path.display()))?;
        writer
            .write_all(b"\n")
            .with_context(|| format!("failed to write {}", path.display()))?;
    }

    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};

    #[test]
    fn write_then_read_preserves_records_and_line_layout() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("results").join("rows.jsonl");
        let rows = vec![json!({ "question": "q1" }), json!({ "question": "q2" })];

        write_jsonl(&path, &rows).expect("write should succeed");

        let raw = std::fs::read_to_string(&path).expect("read back");
        assert_eq!(raw, "{\"question\":\"q1\"}\n{\"question\":\"q2\"}\n");

        let loaded: Vec<Value> = read_jsonl(&path).expect("read should succeed");
        assert_eq!(loaded, rows);
    }

    #[test]
    fn read_skips_blank_lines() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rows.jsonl");
        std::fs::write(&path, "{\"a\":1}\n\n   \n{\"a\":2}\n").expect("write fixture");

        let loaded: Vec<Value> = read_jsonl(&path).expect("read should succeed");
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn read_reports_missing_file_as_missing_input() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("absent.jsonl");

        let error = read_jsonl::<Value>(&path).expect_err("missing file should fail");
        assert!(matches!(
            error.downcast_ref::<EvalError>(),
            Some(EvalError::MissingInputFile(_))
        ));
    }

    #[test]
    fn read_reports_line_number_for_bad_json() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("rows.jsonl");
        std::fs::write(&path, "{\"a\":1}\nnot json\n").expect("write fixture");

        let error = read_jsonl::<Value>(&path).expect_err("bad line should fail");
        assert!(error.to_string().contains("line 2"), "unexpected error: {error}");
    }
}
