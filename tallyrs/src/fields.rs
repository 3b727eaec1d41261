//! The field catalog.
//!
//! Every selectable, groupable, sortable or searchable output column is a
//! [`Field`]. The catalog owns the mapping from a field to the physical column
//! it reads on each fact table and on the imported tables; no other module
//! spells out column names.

use serde::{Deserialize, Serialize};

use crate::filter::Direction;

/// Physical column names shared by the fact tables.
pub(crate) mod columns {
    pub const CLIENT_ID: &str = "client_id";
    pub const VISITOR_ID: &str = "visitor_id";
    pub const SESSION_ID: &str = "session_id";
    pub const TIME: &str = "time";
    pub const SIGN: &str = "sign";
    pub const PAGE_VIEWS: &str = "page_views";
    pub const IS_BOUNCE: &str = "is_bounce";
    pub const DURATION_SECONDS: &str = "duration_seconds";
    pub const DESKTOP: &str = "desktop";
    pub const MOBILE: &str = "mobile";
    pub const TAG_KEYS: &str = "tag_keys";
    pub const TAG_VALUES: &str = "tag_values";
    pub const EVENT_META_KEYS: &str = "event_meta_keys";
    pub const EVENT_META_VALUES: &str = "event_meta_values";
    pub const REFERRER_ICON: &str = "referrer_icon";

    pub const IMPORTED_DATE: &str = "date";
    pub const IMPORTED_SESSION_DURATION: &str = "session_duration";
}

/// The three live fact tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    Sessions,
    PageViews,
    Events,
}

impl Table {
    pub fn name(self) -> &'static str {
        match self {
            Table::Sessions => "session",
            Table::PageViews => "page_view",
            Table::Events => "event",
        }
    }

    /// Sessions are stored as sign-versioned rows.
    pub fn is_sign_versioned(self) -> bool {
        matches!(self, Table::Sessions)
    }
}

/// Pre-aggregated historical tables, keyed by date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportedTable {
    Visitors,
    Page,
    EntryPage,
    ExitPage,
    Referrer,
}

impl ImportedTable {
    pub fn name(self) -> &'static str {
        match self {
            ImportedTable::Visitors => "imported_visitors",
            ImportedTable::Page => "imported_page",
            ImportedTable::EntryPage => "imported_entry_page",
            ImportedTable::ExitPage => "imported_exit_page",
            ImportedTable::Referrer => "imported_referrer",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCategory {
    /// Row identity (visitor, session, timestamp).
    Identity,
    /// Raw columns only selected by join sub-queries.
    Raw,
    /// Aggregates computed per group.
    Aggregate,
    /// Ratios built from aggregates and totals.
    Rate,
    /// Time buckets derived from the timestamp.
    TimeBucket,
    /// Grouping dimensions.
    Dimension,
    /// Fields that only steer table selection and never reach the SELECT list.
    Marker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    VisitorId,
    SessionId,
    Time,
    Desktop,
    Mobile,
    VisitorsRaw,
    TagKeysRaw,
    TagValuesRaw,
    EventMetaKeysRaw,
    EventMetaValuesRaw,

    Count,
    Visitors,
    Sessions,
    Views,
    Bounces,
    Entries,
    Exits,
    EventTimeSpent,
    EventDurationSeconds,
    EventMetaKeys,
    EventMetaCustomMetricAvg,
    EventMetaCustomMetricTotal,
    SessionDurationAvg,
    ReferrerIcon,
    AnyReferrer,

    RelativeVisitors,
    RelativeViews,
    BounceRate,
    Cr,
    CrPeriod,
    EntryRate,
    ExitRate,

    Day,
    Hour,
    Minute,
    Weekday,

    Hostname,
    Path,
    Title,
    EntryPath,
    EntryTitle,
    ExitPath,
    ExitTitle,
    Language,
    Country,
    Region,
    City,
    Referrer,
    ReferrerName,
    Channel,
    Os,
    OsVersion,
    Browser,
    BrowserVersion,
    Platform,
    ScreenClass,
    UtmSource,
    UtmMedium,
    UtmCampaign,
    UtmContent,
    UtmTerm,
    TagKey,
    TagValue,
    EventName,
    EventPath,
    EventTitle,
    EventMetaValues,
    EventMeta,

    PageViewsAll,
    SessionsAll,
    EventsAll,
}

const ALL_TABLES: &[Table] = &[Table::Sessions, Table::PageViews, Table::Events];
const PAGE_TABLES: &[Table] = &[Table::PageViews, Table::Events];

impl Field {
    /// Output alias in the SELECT list and the key decoders read by.
    pub fn name(self) -> &'static str {
        match self {
            Field::VisitorId => "visitor_id",
            Field::SessionId => "session_id",
            Field::Time => "time",
            Field::Desktop => "desktop",
            Field::Mobile => "mobile",
            Field::VisitorsRaw => "visitors",
            Field::TagKeysRaw => "tag_keys",
            Field::TagValuesRaw => "tag_values",
            Field::EventMetaKeysRaw => "event_meta_keys",
            Field::EventMetaValuesRaw => "event_meta_values",
            Field::Count => "count",
            Field::Visitors => "visitors",
            Field::Sessions => "sessions",
            Field::Views => "views",
            Field::Bounces => "bounces",
            Field::Entries => "entries",
            Field::Exits => "exits",
            Field::EventTimeSpent => "average_time_spent_seconds",
            Field::EventDurationSeconds => "duration_seconds",
            Field::EventMetaKeys => "meta_keys",
            Field::EventMetaCustomMetricAvg => "custom_metric_avg",
            Field::EventMetaCustomMetricTotal => "custom_metric_total",
            Field::SessionDurationAvg => "average_time_spent_seconds",
            Field::ReferrerIcon => "referrer_icon",
            Field::AnyReferrer => "referrer",
            Field::RelativeVisitors => "relative_visitors",
            Field::RelativeViews => "relative_views",
            Field::BounceRate => "bounce_rate",
            Field::Cr => "cr",
            Field::CrPeriod => "cr",
            Field::EntryRate => "entry_rate",
            Field::ExitRate => "exit_rate",
            Field::Day => "day",
            Field::Hour => "hour",
            Field::Minute => "minute",
            Field::Weekday => "weekday",
            Field::Hostname => "hostname",
            Field::Path => "path",
            Field::Title => "title",
            Field::EntryPath => "entry_path",
            Field::EntryTitle => "entry_title",
            Field::ExitPath => "exit_path",
            Field::ExitTitle => "exit_title",
            Field::Language => "language",
            Field::Country => "country_code",
            Field::Region => "region",
            Field::City => "city",
            Field::Referrer => "referrer",
            Field::ReferrerName => "referrer_name",
            Field::Channel => "channel",
            Field::Os => "os",
            Field::OsVersion => "os_version",
            Field::Browser => "browser",
            Field::BrowserVersion => "browser_version",
            Field::Platform => "platform",
            Field::ScreenClass => "screen_class",
            Field::UtmSource => "utm_source",
            Field::UtmMedium => "utm_medium",
            Field::UtmCampaign => "utm_campaign",
            Field::UtmContent => "utm_content",
            Field::UtmTerm => "utm_term",
            Field::TagKey => "tag_key",
            Field::TagValue => "tag_value",
            Field::EventName => "event_name",
            Field::EventPath => "event_path",
            Field::EventTitle => "event_title",
            Field::EventMetaValues => "meta_value",
            Field::EventMeta => "meta",
            Field::PageViewsAll => "page_views_all",
            Field::SessionsAll => "sessions_all",
            Field::EventsAll => "events_all",
        }
    }

    pub fn category(self) -> FieldCategory {
        match self {
            Field::VisitorId | Field::SessionId | Field::Time => FieldCategory::Identity,
            Field::Desktop
            | Field::Mobile
            | Field::VisitorsRaw
            | Field::TagKeysRaw
            | Field::TagValuesRaw
            | Field::EventMetaKeysRaw
            | Field::EventMetaValuesRaw => FieldCategory::Raw,
            Field::Count
            | Field::Visitors
            | Field::Sessions
            | Field::Views
            | Field::Bounces
            | Field::Entries
            | Field::Exits
            | Field::EventTimeSpent
            | Field::EventDurationSeconds
            | Field::EventMetaKeys
            | Field::EventMetaCustomMetricAvg
            | Field::EventMetaCustomMetricTotal
            | Field::SessionDurationAvg
            | Field::ReferrerIcon
            | Field::AnyReferrer => FieldCategory::Aggregate,
            Field::RelativeVisitors
            | Field::RelativeViews
            | Field::BounceRate
            | Field::Cr
            | Field::CrPeriod
            | Field::EntryRate
            | Field::ExitRate => FieldCategory::Rate,
            Field::Day | Field::Hour | Field::Minute | Field::Weekday => FieldCategory::TimeBucket,
            Field::PageViewsAll | Field::SessionsAll | Field::EventsAll => FieldCategory::Marker,
            _ => FieldCategory::Dimension,
        }
    }

    pub fn is_aggregate(self) -> bool {
        matches!(
            self.category(),
            FieldCategory::Aggregate | FieldCategory::Rate
        )
    }

    pub fn default_direction(self) -> Direction {
        if self.is_aggregate() {
            Direction::Desc
        } else {
            Direction::Asc
        }
    }

    /// Tables that carry the column a plain field reads.
    fn tables(self) -> &'static [Table] {
        match self {
            Field::VisitorId | Field::SessionId | Field::Time | Field::Desktop | Field::Mobile => {
                ALL_TABLES
            }
            Field::Hostname
            | Field::Language
            | Field::Country
            | Field::Region
            | Field::City
            | Field::Referrer
            | Field::ReferrerName
            | Field::Channel
            | Field::Os
            | Field::OsVersion
            | Field::Browser
            | Field::BrowserVersion
            | Field::ScreenClass
            | Field::UtmSource
            | Field::UtmMedium
            | Field::UtmCampaign
            | Field::UtmContent
            | Field::UtmTerm => ALL_TABLES,
            Field::Path | Field::Title => PAGE_TABLES,
            Field::EntryPath | Field::EntryTitle | Field::ExitPath | Field::ExitTitle => {
                &[Table::Sessions]
            }
            Field::TagKeysRaw | Field::TagValuesRaw => &[Table::PageViews],
            Field::EventName
            | Field::EventPath
            | Field::EventTitle
            | Field::EventMetaKeysRaw
            | Field::EventMetaValuesRaw => &[Table::Events],
            _ => &[],
        }
    }

    /// Physical column of a plain field on `table`, if the table carries it.
    pub fn column(self, table: Table) -> Option<&'static str> {
        if !self.tables().contains(&table) {
            return None;
        }
        let column = match self {
            Field::VisitorId => columns::VISITOR_ID,
            Field::SessionId => columns::SESSION_ID,
            Field::Time => columns::TIME,
            Field::Desktop => columns::DESKTOP,
            Field::Mobile => columns::MOBILE,
            Field::TagKeysRaw => columns::TAG_KEYS,
            Field::TagValuesRaw => columns::TAG_VALUES,
            Field::EventMetaKeysRaw => columns::EVENT_META_KEYS,
            Field::EventMetaValuesRaw => columns::EVENT_META_VALUES,
            Field::EventPath => "path",
            Field::EventTitle => "title",
            other => other.name(),
        };
        Some(column)
    }

    /// Column on an imported table, if the field is stored there.
    pub fn imported_column(self, table: ImportedTable) -> Option<&'static str> {
        use ImportedTable as I;
        match (self, table) {
            (Field::Day, _) => Some(columns::IMPORTED_DATE),
            (Field::Visitors | Field::Sessions, _) => Some(self.name()),
            (Field::Views, I::Visitors | I::Page) => Some("views"),
            (Field::Bounces, I::Visitors | I::Page | I::Referrer) => Some("bounces"),
            (Field::Path, I::Page) => Some("path"),
            (Field::EntryPath, I::EntryPage) => Some("entry_path"),
            (Field::Entries, I::EntryPage) => Some("entries"),
            (Field::ExitPath, I::ExitPage) => Some("exit_path"),
            (Field::Exits, I::ExitPage) => Some("exits"),
            (Field::Referrer | Field::ReferrerName, I::Referrer) => Some("referrer"),
            _ => None,
        }
    }

    /// Text valued fields, used to pick neutral values and to coalesce
    /// columns read through a LEFT JOIN.
    pub fn is_text(self) -> bool {
        match self {
            Field::ReferrerIcon | Field::AnyReferrer => true,
            Field::EventMeta => false,
            other => other.category() == FieldCategory::Dimension,
        }
    }

    /// Array columns.
    pub fn is_list(self) -> bool {
        matches!(
            self,
            Field::TagKeysRaw
                | Field::TagValuesRaw
                | Field::EventMetaKeysRaw
                | Field::EventMetaValuesRaw
                | Field::EventMetaKeys
        )
    }

    /// Counts that can be summed across live and imported rows.
    pub fn is_summable(self) -> bool {
        matches!(
            self,
            Field::Count
                | Field::Visitors
                | Field::Sessions
                | Field::Views
                | Field::Bounces
                | Field::Entries
                | Field::Exits
        )
    }
}

/// Returns true if `haystack` contains `needle`.
pub fn contains(haystack: &[Field], needle: Field) -> bool {
    haystack.contains(&needle)
}

/// Returns true if `haystack` contains any of `needles`.
pub fn contains_any(haystack: &[Field], needles: &[Field]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
