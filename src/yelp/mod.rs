// src/yelp/mod.rs
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Deserializer};
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    time::Instant,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::output::TableWriter;

pub mod attributes;
pub mod business;
pub mod checkin;
pub mod hours;
pub mod tip;
pub mod user;

/// The four line-delimited JSON files of the dataset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Source {
    Business,
    User,
    Tip,
    Checkin,
}

impl Source {
    pub const ALL: [Source; 4] = [Source::Business, Source::User, Source::Tip, Source::Checkin];

    pub fn file_name(&self) -> &'static str {
        match self {
            Source::Business => "yelp_business.JSON",
            Source::User => "yelp_user.JSON",
            Source::Tip => "yelp_tip.JSON",
            Source::Checkin => "yelp_checkin.JSON",
        }
    }
}

/// One flat output file and its fixed column list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Table {
    Business,
    Category,
    BusinessCategory,
    Attribute,
    BusinessAttribute,
    Hours,
    YelpUser,
    Friendship,
    Tip,
    Checkin,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Table::Business => "business",
            Table::Category => "category",
            Table::Attribute => "attribute",
            Table::BusinessCategory => "business_category",
            Table::BusinessAttribute => "business_attribute",
            Table::Hours => "hours",
            Table::YelpUser => "yelp_user",
            Table::Friendship => "friendship",
            Table::Tip => "tip",
            Table::Checkin => "checkin",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.txt", self.as_str())
    }

    pub fn columns(&self) -> &'static [&'static str] {
        match self {
            Table::Business => &[
                "business_id",
                "business_name",
                "business_address",
                "city",
                "state",
                "zip_code",
                "latitude",
                "longitude",
                "stars",
                "is_open",
                "tip_count",
            ],
            Table::Category | Table::Attribute => &["name"],
            Table::BusinessCategory => &["business_id", "category_name"],
            Table::BusinessAttribute => &["business_id", "attribute_name", "attribute_value"],
            Table::Hours => &["business_id", "day_of_week", "open_time", "close_time"],
            Table::YelpUser => &[
                "user_id",
                "user_name",
                "yelping_since",
                "tip_count",
                "fans",
                "average_stars",
                "funny",
                "useful",
                "cool",
            ],
            Table::Friendship => &["follower_id", "followee_id"],
            Table::Tip => &[
                "user_id",
                "business_id",
                "tip_timestamp",
                "likes",
                "tip_text",
            ],
            Table::Checkin => &["business_id", "checkin_timestamp"],
        }
    }
}

/// Rows written per table for one source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSummary {
    pub records: u64,
    pub rows: Vec<(Table, u64)>,
}

impl SourceSummary {
    pub fn rows_for(&self, table: Table) -> Option<u64> {
        self.rows.iter().find(|(t, _)| *t == table).map(|(_, n)| *n)
    }
}

/// Comma-joined lists appear either as one string (`"a, b"`) or as a JSON
/// array depending on the dataset release.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListField {
    Joined(String),
    Items(Vec<String>),
}

impl ListField {
    /// Non-empty trimmed items, in source order.
    pub fn items(&self) -> Vec<&str> {
        match self {
            ListField::Joined(s) => s.split(", ").map(str::trim).filter(|s| !s.is_empty()).collect(),
            ListField::Items(v) => v.iter().map(|s| s.trim()).filter(|s| !s.is_empty()).collect(),
        }
    }
}

/// Render an optional JSON number the way it appeared in the source.
pub(crate) fn number_or_empty(n: &Option<serde_json::Number>) -> String {
    n.as_ref().map(|n| n.to_string()).unwrap_or_default()
}

/// For keys that must be present but may hold `null`. Using it through
/// `deserialize_with` stops serde from treating a missing key as `None`.
pub(crate) fn nullable<'de, D, T>(d: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(d)
}

/// Open the sink for `table` under the configured output directory.
pub(crate) fn open_table(cfg: &Config, table: Table) -> Result<TableWriter> {
    let mut w = TableWriter::create(cfg.output_path(table), table.columns(), cfg.delimiter)?;
    if cfg.with_header {
        w.write_header()?;
    }
    Ok(w)
}

/// Parse each non-blank line of `path` as a `T` and hand it to `f` with its
/// 1-based line number. Returns the number of records seen.
pub fn for_each_json_line<T, F>(path: &Path, mut f: F) -> Result<u64>
where
    T: DeserializeOwned,
    F: FnMut(u64, T) -> Result<()>,
{
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = 0u64;
    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx as u64 + 1;
        let line =
            line.with_context(|| format!("reading {} line {}", path.display(), line_no))?;
        if line.trim().is_empty() {
            continue;
        }
        let rec: T = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed record", path.display(), line_no))?;
        f(line_no, rec).with_context(|| format!("{}:{}", path.display(), line_no))?;
        records += 1;
    }
    Ok(records)
}

/// Convert one source file into its tables.
pub fn convert_source(source: Source, cfg: &Config) -> Result<SourceSummary> {
    let input = cfg.input_path(source);
    let start = Instant::now();
    info!(source = source.file_name(), "converting");

    let summary = match source {
        Source::Business => business::convert(&input, cfg)?,
        Source::User => user::convert(&input, cfg)?,
        Source::Tip => tip::convert(&input, cfg)?,
        Source::Checkin => checkin::convert(&input, cfg)?,
    };

    for (table, rows) in &summary.rows {
        debug!(table = table.as_str(), rows, "table done");
    }
    info!(
        source = source.file_name(),
        records = summary.records,
        elapsed = ?start.elapsed(),
        "converted"
    );
    Ok(summary)
}

/// Convert the whole dataset: business, user, tip, then check-in.
pub fn convert_all(cfg: &Config) -> Result<Vec<(Source, SourceSummary)>> {
    let mut out = Vec::with_capacity(Source::ALL.len());
    for source in Source::ALL {
        let summary = convert_source(source, cfg)
            .with_context(|| format!("converting {}", source.file_name()))?;
        out.push((source, summary));
    }
    Ok(out)
}
