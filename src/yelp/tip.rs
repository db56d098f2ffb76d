// src/yelp/tip.rs
use anyhow::Result;
use serde::Deserialize;
use serde_json::Number;
use std::path::Path;
use tracing::instrument;

use super::{for_each_json_line, open_table, SourceSummary, Table};
use crate::config::Config;
use crate::record::clean_for_sql;

#[derive(Debug, Deserialize)]
pub struct Tip {
    pub user_id: String,
    pub business_id: String,
    pub date: String,
    #[serde(alias = "compliment_count")]
    pub likes: Number,
    pub text: String,
}

#[instrument(level = "info", skip(input, cfg), fields(input = %input.display()))]
pub fn convert(input: &Path, cfg: &Config) -> Result<SourceSummary> {
    let mut tips = open_table(cfg, Table::Tip)?;

    let records = for_each_json_line(input, |_, t: Tip| {
        tips.write_row(&[
            t.user_id,
            t.business_id,
            t.date,
            t.likes.to_string(),
            clean_for_sql(&t.text),
        ])
    })?;

    Ok(SourceSummary {
        records,
        rows: vec![(Table::Tip, tips.finish()?)],
    })
}
