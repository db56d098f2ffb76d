use anyhow::{anyhow, Context, Result};
use chrono::{NaiveTime, Weekday};
use std::collections::HashMap;

/// Parse `"H:M"` (either part may lack a leading zero) into a time of day.
pub fn parse_clock(s: &str) -> Result<NaiveTime> {
    let (h, m) = s
        .trim()
        .split_once(':')
        .ok_or_else(|| anyhow!("time {:?} is not H:M", s))?;
    let h: u32 = h.parse().with_context(|| format!("hour in {:?}", s))?;
    let m: u32 = m.parse().with_context(|| format!("minute in {:?}", s))?;
    NaiveTime::from_hms_opt(h, m, 0).ok_or_else(|| anyhow!("time {:?} out of range", s))
}

/// Split `"8:0-18:30"` into normalized `("08:00", "18:30")`.
pub fn split_range(range: &str) -> Result<(String, String)> {
    let (open, close) = range
        .split_once('-')
        .ok_or_else(|| anyhow!("hours {:?} is not OPEN-CLOSE", range))?;
    Ok((
        parse_clock(open)?.format("%H:%M").to_string(),
        parse_clock(close)?.format("%H:%M").to_string(),
    ))
}

/// Hours entries ordered Monday..Sunday with normalized times.
pub fn ordered_hours(hours: &HashMap<String, String>) -> Result<Vec<(&str, String, String)>> {
    let mut days = Vec::with_capacity(hours.len());
    for (day, range) in hours {
        let wd: Weekday = day
            .parse()
            .map_err(|_| anyhow!("unknown day of week {:?}", day))?;
        let (open, close) = split_range(range).with_context(|| format!("hours for {}", day))?;
        days.push((wd.num_days_from_monday(), day.as_str(), open, close));
    }
    days.sort_by_key(|(n, ..)| *n);
    Ok(days.into_iter().map(|(_, d, o, c)| (d, o, c)).collect())
}
