//! Statistic records returned by the analyzer.
//!
//! Rows are decoded by column name. Where the serialized name differs from
//! the column the query produces, the column is accepted as an alias.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActiveVisitorStats {
    pub hostname: String,
    pub path: String,
    pub title: String,
    pub visitors: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalVisitorStats {
    pub visitors: i64,
    pub views: i64,
    pub sessions: i64,
    pub bounces: i64,
    pub bounce_rate: f64,
    pub cr: f64,
    pub custom_metric_avg: f64,
    pub custom_metric_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalVisitorsPageViewsStats {
    pub visitors: i64,
    pub views: i64,
    pub visitors_growth: f64,
    pub views_growth: f64,
}

/// Visitors per day, week, month or year. Only the field matching the period is set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorStats {
    pub day: Option<NaiveDate>,
    pub week: Option<NaiveDate>,
    pub month: Option<NaiveDate>,
    pub year: Option<NaiveDate>,
    pub visitors: i64,
    pub views: i64,
    pub sessions: i64,
    pub bounces: i64,
    pub bounce_rate: f64,
    pub cr: f64,
    pub custom_metric_avg: f64,
    pub custom_metric_total: f64,
}

/// Relative change between two periods.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Growth {
    pub visitors_growth: f64,
    pub views_growth: f64,
    pub sessions_growth: f64,
    pub bounces_growth: f64,
    pub time_spent_growth: f64,
    pub cr_growth: f64,
    pub custom_metric_avg_growth: f64,
    pub custom_metric_total_growth: f64,
}

/// Totals of one period that growth is computed from.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrowthStats {
    pub visitors: i64,
    pub views: i64,
    pub sessions: i64,
    pub bounces: i64,
    pub bounce_rate: f64,
    pub cr: f64,
    pub custom_metric_avg: f64,
    pub custom_metric_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorHourStats {
    pub hour: i64,
    pub visitors: i64,
    pub views: i64,
    pub sessions: i64,
    pub bounces: i64,
    pub bounce_rate: f64,
    pub cr: f64,
    pub custom_metric_avg: f64,
    pub custom_metric_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorMinuteStats {
    pub minute: i64,
    pub visitors: i64,
    pub views: i64,
    pub sessions: i64,
    pub bounces: i64,
    pub bounce_rate: f64,
    pub cr: f64,
    pub custom_metric_avg: f64,
    pub custom_metric_total: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorWeekdayHourStats {
    pub weekday: i64,
    pub hour: i64,
    pub visitors: i64,
    pub views: i64,
    pub sessions: i64,
    pub bounces: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostnameStats {
    pub hostname: String,
    pub visitors: i64,
    pub views: i64,
    pub sessions: i64,
    pub bounces: i64,
    pub relative_visitors: f64,
    pub relative_views: f64,
    pub bounce_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageStats {
    pub path: String,
    pub title: String,
    pub visitors: i64,
    pub views: i64,
    pub sessions: i64,
    pub bounces: i64,
    pub relative_visitors: f64,
    pub relative_views: f64,
    pub bounce_rate: f64,
    pub average_time_spent_seconds: i64,
}

/// Visitors, views and sessions of a single path.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TotalVisitorSessionStats {
    pub path: String,
    pub views: i64,
    pub visitors: i64,
    pub sessions: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryStats {
    #[serde(alias = "entry_path")]
    pub path: String,
    #[serde(alias = "entry_title")]
    pub title: String,
    pub visitors: i64,
    pub sessions: i64,
    pub entries: i64,
    pub entry_rate: f64,
    pub average_time_spent_seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitStats {
    #[serde(alias = "exit_path")]
    pub path: String,
    #[serde(alias = "exit_title")]
    pub title: String,
    pub visitors: i64,
    pub sessions: i64,
    pub exits: i64,
    pub exit_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventStats {
    #[serde(alias = "event_name")]
    pub name: String,
    pub count: i64,
    pub visitors: i64,
    pub views: i64,
    pub cr: f64,
    #[serde(alias = "average_time_spent_seconds")]
    pub average_duration_seconds: i64,
    pub meta_keys: Vec<String>,
    pub meta_value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventListStats {
    #[serde(alias = "event_name")]
    pub name: String,
    pub meta: BTreeMap<String, String>,
    pub visitors: i64,
    pub count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferrerStats {
    pub referrer: String,
    pub referrer_name: String,
    pub referrer_icon: String,
    pub visitors: i64,
    pub sessions: i64,
    pub relative_visitors: f64,
    pub bounces: i64,
    pub bounce_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageStats {
    pub language: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CountryStats {
    pub country_code: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionStats {
    pub country_code: String,
    pub region: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CityStats {
    pub country_code: String,
    pub region: String,
    pub city: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

/// Visitors per platform: `desktop`, `mobile` or `unknown`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformStats {
    pub platform: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserStats {
    pub browser: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserVersionStats {
    pub browser: String,
    pub browser_version: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsStats {
    pub os: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OsVersionStats {
    pub os: String,
    pub os_version: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenClassStats {
    pub screen_class: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

/// Visitors per value of one UTM parameter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UtmStats {
    #[serde(alias = "utm_source", alias = "utm_medium", alias = "utm_campaign")]
    #[serde(alias = "utm_content", alias = "utm_term")]
    pub value: String,
    pub visitors: i64,
    pub relative_visitors: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvgTimeSpentStats {
    pub path: String,
    pub average_time_spent_seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagStats {
    #[serde(alias = "tag_key")]
    pub key: String,
    #[serde(alias = "tag_value")]
    pub value: String,
    pub visitors: i64,
    pub views: i64,
    pub relative_visitors: f64,
    pub relative_views: f64,
}

/// One live session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    pub visitor_id: u64,
    pub session_id: u32,
    pub entry_path: String,
    pub exit_path: String,
    pub views: i64,
    #[serde(alias = "average_time_spent_seconds")]
    pub duration_seconds: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PageViewRow {
    pub visitor_id: u64,
    pub session_id: u32,
    pub time: Option<NaiveDateTime>,
    pub hostname: String,
    pub path: String,
    pub title: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventRow {
    pub visitor_id: u64,
    pub session_id: u32,
    pub time: Option<NaiveDateTime>,
    #[serde(alias = "event_name")]
    pub name: String,
    pub meta: BTreeMap<String, String>,
    #[serde(alias = "event_path")]
    pub path: String,
    #[serde(alias = "event_title")]
    pub title: String,
}

/// A page view or an event of a session, in time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStep {
    PageView(PageViewRow),
    Event(EventRow),
}

impl SessionStep {
    pub fn time(&self) -> Option<NaiveDateTime> {
        match self {
            SessionStep::PageView(page_view) => page_view.time,
            SessionStep::Event(event) => event.time,
        }
    }
}
