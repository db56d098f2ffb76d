// src/yelp/user.rs
use anyhow::Result;
use serde::Deserialize;
use serde_json::Number;
use std::path::Path;
use tracing::instrument;

use super::{for_each_json_line, open_table, ListField, SourceSummary, Table};
use crate::config::Config;
use crate::output::commit_all;
use crate::record::clean_for_sql;

#[derive(Debug, Deserialize)]
pub struct User {
    pub user_id: String,
    pub name: String,
    pub yelping_since: String,
    #[serde(alias = "tip_count")]
    pub tipcount: Number,
    pub fans: Number,
    pub average_stars: Number,
    pub funny: Number,
    pub useful: Number,
    pub cool: Number,
    pub friends: Option<ListField>,
}

impl User {
    pub fn user_row(&self) -> Vec<String> {
        vec![
            self.user_id.clone(),
            clean_for_sql(&self.name),
            self.yelping_since.clone(),
            self.tipcount.to_string(),
            self.fans.to_string(),
            self.average_stars.to_string(),
            self.funny.to_string(),
            self.useful.to_string(),
            self.cool.to_string(),
        ]
    }

    /// Friend ids; the dataset writes `"None"` for users without friends.
    pub fn friend_ids(&self) -> Vec<&str> {
        self.friends
            .as_ref()
            .map(|f| f.items().into_iter().filter(|id| *id != "None").collect())
            .unwrap_or_default()
    }
}

#[instrument(level = "info", skip(input, cfg), fields(input = %input.display()))]
pub fn convert(input: &Path, cfg: &Config) -> Result<SourceSummary> {
    let mut users = open_table(cfg, Table::YelpUser)?;
    let mut friendship = open_table(cfg, Table::Friendship)?;

    let records = for_each_json_line(input, |_, u: User| {
        users.write_row(&u.user_row())?;
        for friend in u.friend_ids() {
            friendship.write_row(&[u.user_id.as_str(), friend])?;
        }
        Ok(())
    })?;

    let rows = commit_all(vec![(Table::YelpUser, users), (Table::Friendship, friendship)])?;
    Ok(SourceSummary { records, rows })
}
