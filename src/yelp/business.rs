// src/yelp/business.rs
use anyhow::Result;
use serde::Deserialize;
use serde_json::{Map, Number, Value};
use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
};
use tracing::instrument;

use super::{
    attributes::flatten_attributes, for_each_json_line, hours::ordered_hours, nullable,
    number_or_empty, open_table, ListField, SourceSummary, Table,
};
use crate::config::Config;
use crate::output::commit_all;
use crate::record::clean_for_sql;

/// Every key the business table reads must be present; coordinates and
/// stars may be `null`.
#[derive(Debug, Deserialize)]
pub struct Business {
    pub business_id: String,
    pub name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    #[serde(deserialize_with = "nullable")]
    pub latitude: Option<Number>,
    #[serde(deserialize_with = "nullable")]
    pub longitude: Option<Number>,
    #[serde(deserialize_with = "nullable")]
    pub stars: Option<Number>,
    pub is_open: i64,
    pub categories: Option<ListField>,
    pub attributes: Option<Map<String, Value>>,
    pub hours: Option<HashMap<String, String>>,
}

impl Business {
    pub fn business_row(&self) -> Vec<String> {
        vec![
            self.business_id.clone(),
            clean_for_sql(&self.name),
            clean_for_sql(&self.address),
            self.city.clone(),
            self.state.clone(),
            self.postal_code.clone(),
            number_or_empty(&self.latitude),
            number_or_empty(&self.longitude),
            number_or_empty(&self.stars),
            if self.is_open == 1 { "TRUE" } else { "FALSE" }.to_string(),
            // filled in by the database once tips are loaded
            "0".to_string(),
        ]
    }
}

/// One pass over the business file feeds the business, category, attribute
/// and hours tables. Category and attribute names are collected and written
/// once each, sorted, after the pass.
#[instrument(level = "info", skip(input, cfg), fields(input = %input.display()))]
pub fn convert(input: &Path, cfg: &Config) -> Result<SourceSummary> {
    let mut business = open_table(cfg, Table::Business)?;
    let mut categories = open_table(cfg, Table::BusinessCategory)?;
    let mut attributes = open_table(cfg, Table::BusinessAttribute)?;
    let mut hours = open_table(cfg, Table::Hours)?;

    let mut category_names = BTreeSet::new();
    let mut attribute_names = BTreeSet::new();

    let records = for_each_json_line(input, |_, b: Business| {
        business.write_row(&b.business_row())?;

        if let Some(cats) = &b.categories {
            for cat in cats.items() {
                let cat = clean_for_sql(cat);
                categories.write_row(&[b.business_id.as_str(), cat.as_str()])?;
                category_names.insert(cat);
            }
        }

        if let Some(attrs) = &b.attributes {
            for (name, value) in flatten_attributes(attrs) {
                let name = clean_for_sql(&name);
                attributes.write_row(&[b.business_id.clone(), name.clone(), clean_for_sql(&value)])?;
                attribute_names.insert(name);
            }
        }

        if let Some(h) = &b.hours {
            for (day, open, close) in ordered_hours(h)? {
                hours.write_row(&[b.business_id.as_str(), day, open.as_str(), close.as_str()])?;
            }
        }
        Ok(())
    })?;

    let mut category = open_table(cfg, Table::Category)?;
    for name in &category_names {
        category.write_row(&[name])?;
    }
    let mut attribute = open_table(cfg, Table::Attribute)?;
    for name in &attribute_names {
        attribute.write_row(&[name])?;
    }

    let rows = commit_all(vec![
        (Table::Business, business),
        (Table::Category, category),
        (Table::BusinessCategory, categories),
        (Table::Attribute, attribute),
        (Table::BusinessAttribute, attributes),
        (Table::Hours, hours),
    ])?;
    Ok(SourceSummary { records, rows })
}
