// src/record.rs

use anyhow::{bail, Result};

/// One logical entry read from a source file, as an ordered list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// 1-based line number of the record in its source file.
    pub line: u64,
    fields: Vec<String>,
}

impl Record {
    pub fn new(line: u64, fields: Vec<String>) -> Self {
        Self { line, fields }
    }

    /// Number of fields.
    pub fn width(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(String::as_str)
    }

    /// Pick `columns` in the given order. An empty selection keeps every field.
    pub fn select(&self, columns: &[usize]) -> Result<Vec<&str>> {
        if columns.is_empty() {
            return Ok(self.fields.iter().map(String::as_str).collect());
        }
        let mut out = Vec::with_capacity(columns.len());
        for &c in columns {
            match self.get(c) {
                Some(v) => out.push(v),
                None => bail!(
                    "line {}: column {} out of range (record has {} fields)",
                    self.line,
                    c,
                    self.width()
                ),
            }
        }
        Ok(out)
    }
}

/// Make free text safe to hand to a SQL loader: single quotes become
/// backticks and newlines become spaces.
pub fn clean_for_sql(raw: &str) -> String {
    raw.replace('\'', "`").replace('\n', " ")
}
