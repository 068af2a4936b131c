//! JSON Lines input and output
//!
//! Batches are read from and written to newline-delimited JSON. Blank lines
//! in the input are skipped. Any value may appear on a line; non-object
//! records are rejected later, per record, by the transformer.

use serde::Serialize;
use serde_json::Value;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::{Error, Result};

/// Read every record from a JSONL stream
pub fn read_jsonl<R: Read>(reader: R) -> Result<Vec<Value>> {
    let reader = BufReader::new(reader);
    let mut records = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let value = serde_json::from_str(trimmed).map_err(|source| Error::InputLine {
            line: index + 1,
            source,
        })?;
        records.push(value);
    }

    Ok(records)
}

/// Read every record from a JSONL file
pub fn read_jsonl_file(path: impl AsRef<Path>) -> Result<Vec<Value>> {
    let file = std::fs::File::open(path)?;
    read_jsonl(file)
}

/// Write one JSON document per line
pub fn write_jsonl<W: Write, T: Serialize>(writer: W, records: &[T]) -> Result<()> {
    let mut writer = BufWriter::new(writer);
    for record in records {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

/// Write records to a JSONL file, creating parent directories
pub fn write_jsonl_file<T: Serialize>(path: impl AsRef<Path>, records: &[T]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = std::fs::File::create(path)?;
    write_jsonl(file, records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_read_skips_blank_lines() {
        let input = "{\"a\":1}\n\n   \n{\"b\":2}\n";
        let records = read_jsonl(input.as_bytes()).unwrap();
        assert_eq!(records, vec![json!({"a": 1}), json!({"b": 2})]);
    }

    #[test]
    fn test_read_accepts_non_object_lines() {
        let records = read_jsonl("42\n\"text\"\nnull\n".as_bytes()).unwrap();
        assert_eq!(records, vec![json!(42), json!("text"), json!(null)]);
    }

    #[test]
    fn test_read_reports_line_number() {
        let err = read_jsonl("{\"a\":1}\n\n{oops\n".as_bytes()).unwrap_err();
        assert!(matches!(err, Error::InputLine { line: 3, .. }));
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/nested/records.jsonl");
        write_jsonl_file(&path, &[json!({"x": 1}), json!({"x": 2})]).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "{\"x\":1}\n{\"x\":2}\n");
        assert_eq!(read_jsonl_file(&path).unwrap().len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            read_jsonl_file(dir.path().join("absent.jsonl")),
            Err(Error::Io(_))
        ));
    }
}
