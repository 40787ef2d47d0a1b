//! Progress aggregation over log history
//!
//! Day bucketing and windowed rollups for the analytics endpoints. Buckets
//! are local calendar days: each log carries a precomputed "YYYY-MM-DD"
//! bucket, so the timezone decision happens once at insert time and every
//! aggregation here is pure string/date arithmetic.

use chrono::{DateTime, Datelike, Days, Local, NaiveDate};
use serde::Serialize;

use crate::store::models::LogEntry;

/// Compute the local day bucket string from a Unix timestamp in milliseconds.
///
/// Returns a string in format "YYYY-MM-DD".
pub fn day_bucket(timestamp_ms: i64) -> String {
    let date = local_day(timestamp_ms);
    format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day())
}

/// Local calendar date for a Unix timestamp in milliseconds.
pub fn local_day(timestamp_ms: i64) -> NaiveDate {
    DateTime::from_timestamp_millis(timestamp_ms)
        .unwrap_or_else(|| DateTime::UNIX_EPOCH)
        .with_timezone(&Local)
        .date_naive()
}

/// Parse a day bucket string back to a date.
pub fn parse_day_bucket(bucket: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(bucket, "%Y-%m-%d").ok()
}

/// Per-day rollup inside a breakdown window. Log-free days keep zeroed
/// averages rather than going absent or NaN.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DayTotals {
    /// Day bucket (YYYY-MM-DD)
    pub date: String,
    pub log_count: u64,
    pub total_cost: f64,
    pub total_calories: i64,
    pub avg_guilt: f64,
    pub avg_regret: f64,
}

/// Rollup over a trailing window, as served by the weekly analytics endpoint
#[derive(Debug, Clone, Serialize)]
pub struct WindowSummary {
    pub total_logs: u64,
    pub total_cost: f64,
    pub total_calories: i64,
    pub avg_guilt: f64,
    pub avg_regret: f64,
    pub clean_days_percent: u32,
    pub daily_breakdown: Vec<DayTotals>,
}

/// Per-day breakdown for the `days` calendar days ending at `end_day`
/// inclusive, oldest first.
///
/// Always returns exactly `days` entries. Days with no logs appear as
/// zero-filled rows rather than being omitted, so a sparse week still
/// renders as seven bars.
pub fn daily_breakdown(logs: &[LogEntry], end_day: NaiveDate, days: u32) -> Vec<DayTotals> {
    window_days(end_day, days)
        .map(|date| {
            let bucket = format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day());
            let mut totals = DayTotals {
                date: bucket,
                ..DayTotals::default()
            };
            let mut guilt_sum = 0u64;
            let mut regret_sum = 0u64;
            for log in logs.iter().filter(|l| l.day_bucket == totals.date) {
                totals.log_count += 1;
                totals.total_cost += log.estimated_cost;
                totals.total_calories += log.estimated_calories;
                guilt_sum += log.guilt_rating as u64;
                regret_sum += log.regret_rating as u64;
            }
            if totals.log_count > 0 {
                totals.avg_guilt = guilt_sum as f64 / totals.log_count as f64;
                totals.avg_regret = regret_sum as f64 / totals.log_count as f64;
            }
            totals
        })
        .collect()
}

/// Percentage of clean days in the window, rounded to the nearest integer.
///
/// A day counts as clean when it has no log with guilt rating 4 or higher;
/// low-guilt logs do not spoil it. Log-free days are clean.
pub fn clean_days_percent(logs: &[LogEntry], end_day: NaiveDate, days: u32) -> u32 {
    if days == 0 {
        return 0;
    }
    let clean = window_days(end_day, days)
        .filter(|date| {
            let bucket = format!("{:04}-{:02}-{:02}", date.year(), date.month(), date.day());
            !logs
                .iter()
                .any(|l| l.day_bucket == bucket && l.guilt_rating >= 4)
        })
        .count() as u32;
    (clean as f64 / days as f64 * 100.0).round() as u32
}

/// Full rollup for the trailing window, oldest day first.
///
/// Window-level averages weight every log equally rather than averaging
/// the per-day averages. An empty window reports 0, not NaN.
pub fn window_summary(logs: &[LogEntry], end_day: NaiveDate, days: u32) -> WindowSummary {
    let breakdown = daily_breakdown(logs, end_day, days);
    let total_logs: u64 = breakdown.iter().map(|d| d.log_count).sum();
    let total_cost: f64 = breakdown.iter().map(|d| d.total_cost).sum();
    let total_calories: i64 = breakdown.iter().map(|d| d.total_calories).sum();

    let (avg_guilt, avg_regret) = if total_logs > 0 {
        let guilt: f64 = breakdown.iter().map(|d| d.avg_guilt * d.log_count as f64).sum();
        let regret: f64 = breakdown.iter().map(|d| d.avg_regret * d.log_count as f64).sum();
        (guilt / total_logs as f64, regret / total_logs as f64)
    } else {
        (0.0, 0.0)
    };

    WindowSummary {
        total_logs,
        total_cost,
        total_calories,
        avg_guilt,
        avg_regret,
        clean_days_percent: clean_days_percent(logs, end_day, days),
        daily_breakdown: breakdown,
    }
}

fn window_days(end_day: NaiveDate, days: u32) -> impl Iterator<Item = NaiveDate> {
    (0..days).rev().filter_map(move |back| end_day.checked_sub_days(Days::new(back as u64)))
}
