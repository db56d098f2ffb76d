// src/config.rs
use anyhow::{bail, Result};
use std::{env, path::PathBuf};
use tracing::info;

use crate::yelp::{Source, Table};

/// Where the dataset lives and where the tables go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Directory holding the extracted `yelp_*.JSON` files.
    pub data_dir: PathBuf,
    /// Directory the flat tables are written to.
    pub out_dir: PathBuf,
    /// Output field delimiter.
    pub delimiter: u8,
    /// Start every table with a line of column names.
    pub with_header: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            out_dir: PathBuf::from("output"),
            delimiter: b'|',
            with_header: false,
        }
    }
}

impl Config {
    /// Fixed layout, with `YELP_DATA_DIR`, `YELP_OUT_DIR`, `YELP_DELIMITER`
    /// and `YELP_HEADER` taking precedence when set.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|k| env::var(k).ok())
    }

    fn from_vars(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(dir) = get("YELP_DATA_DIR") {
            cfg.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("YELP_OUT_DIR") {
            cfg.out_dir = PathBuf::from(dir);
        }
        if let Some(d) = get("YELP_DELIMITER") {
            cfg.delimiter = parse_delimiter(&d)?;
        }
        if let Some(h) = get("YELP_HEADER") {
            cfg.with_header = parse_flag(&h)?;
        }
        info!(
            data_dir = %cfg.data_dir.display(),
            out_dir = %cfg.out_dir.display(),
            delimiter = %(cfg.delimiter as char),
            with_header = cfg.with_header,
            "configuration"
        );
        Ok(cfg)
    }

    pub fn input_path(&self, source: Source) -> PathBuf {
        self.data_dir.join(source.file_name())
    }

    pub fn output_path(&self, table: Table) -> PathBuf {
        self.out_dir.join(table.file_name())
    }
}

fn parse_flag(s: &str) -> Result<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => bail!("expected a boolean, got {:?}", other),
    }
}

/// Accept a single ASCII character, or `\t`/`tab` for a tab.
pub fn parse_delimiter(s: &str) -> Result<u8> {
    match s {
        "\\t" | "tab" => return Ok(b'\t'),
        _ => {}
    }
    let bytes = s.as_bytes();
    if bytes.len() != 1 || !bytes[0].is_ascii() {
        bail!("delimiter must be a single ASCII character, got {:?}", s);
    }
    if matches!(bytes[0], b'"' | b'\n' | b'\r') {
        bail!("{:?} cannot be used as a delimiter", s);
    }
    Ok(bytes[0])
}
