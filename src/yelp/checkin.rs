// src/yelp/checkin.rs
use anyhow::Result;
use serde::Deserialize;
use std::path::Path;
use tracing::instrument;

use super::{for_each_json_line, open_table, ListField, SourceSummary, Table};
use crate::config::Config;

#[derive(Debug, Deserialize)]
pub struct Checkin {
    pub business_id: String,
    /// Comma-joined check-in timestamps.
    pub date: Option<ListField>,
}

#[instrument(level = "info", skip(input, cfg), fields(input = %input.display()))]
pub fn convert(input: &Path, cfg: &Config) -> Result<SourceSummary> {
    let mut checkins = open_table(cfg, Table::Checkin)?;

    let records = for_each_json_line(input, |_, c: Checkin| {
        if let Some(dates) = &c.date {
            for ts in dates.items() {
                checkins.write_row(&[c.business_id.as_str(), ts])?;
            }
        }
        Ok(())
    })?;

    Ok(SourceSummary {
        records,
        rows: vec![(Table::Checkin, checkins.finish()?)],
    })
}
