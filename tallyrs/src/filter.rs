//! The analysis filter: time range, dimension predicates, ordering and options.
//!
//! List values may be negated with a leading `!`. The value `null`
//! (case-insensitive) matches absent/unknown values.

use std::collections::{BTreeMap, HashSet};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::executor::QueryContext;
use crate::fields::Field;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Period {
    #[default]
    Day,
    Week,
    Month,
    Year,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_sql(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CustomMetricType {
    Integer,
    Float,
}

impl CustomMetricType {
    pub fn as_str(self) -> &'static str {
        match self {
            CustomMetricType::Integer => "integer",
            CustomMetricType::Float => "float",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "integer" => Some(CustomMetricType::Integer),
            "float" => Some(CustomMetricType::Float),
            _ => None,
        }
    }
}

/// First day of the week. Stored as a plain integer so that unknown values
/// survive until validation resets them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WeekdayMode(pub i32);

impl WeekdayMode {
    pub const MONDAY: WeekdayMode = WeekdayMode(1);
    pub const SUNDAY: WeekdayMode = WeekdayMode(2);

    pub fn is_sunday(self) -> bool {
        self == Self::SUNDAY
    }
}

/// Case-insensitive substring search on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Search {
    pub field: Field,
    pub input: String,
}

/// Ordering override for the outer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    pub field: Field,
    pub direction: Direction,
}

#[derive(Debug, Clone, Default)]
pub struct Filter {
    /// Cancellation and deadline for every store call made with this filter.
    pub ctx: QueryContext,

    /// Tenant. 0 selects data stored without a client.
    pub client_id: i64,

    /// Timezone used to bucket and compare dates. Validation defaults it to UTC.
    pub timezone: Option<Tz>,

    /// Start of the selected period (UTC).
    pub from: Option<NaiveDateTime>,

    /// End of the selected period (UTC).
    pub to: Option<NaiveDateTime>,

    /// Dates before this day are read from the imported tables.
    pub imported_until: Option<NaiveDateTime>,

    pub period: Period,

    pub hostname: Vec<String>,

    /// Exact path filter. Takes precedence over `path_pattern`.
    pub path: Vec<String>,

    /// Matches sessions that visited any of these paths.
    pub any_path: Vec<String>,

    pub entry_path: Vec<String>,
    pub exit_path: Vec<String>,

    /// Regular expressions matched against the path, e.g. `(?i)^/path/[^/]+$`.
    pub path_pattern: Vec<String>,

    pub language: Vec<String>,

    /// ISO country codes. Anything but two letters (optionally negated) is dropped.
    pub country: Vec<String>,

    pub region: Vec<String>,
    pub city: Vec<String>,
    pub referrer: Vec<String>,
    pub referrer_name: Vec<String>,
    pub channel: Vec<String>,
    pub os: Vec<String>,
    pub os_version: Vec<String>,
    pub browser: Vec<String>,
    pub browser_version: Vec<String>,

    /// `desktop`, `mobile` or `unknown`.
    pub platform: String,

    pub screen_class: Vec<String>,
    pub utm_source: Vec<String>,
    pub utm_medium: Vec<String>,
    pub utm_campaign: Vec<String>,
    pub utm_content: Vec<String>,
    pub utm_term: Vec<String>,

    /// Tag key/value pairs.
    pub tags: BTreeMap<String, String>,

    /// Tag keys.
    pub tag: Vec<String>,

    pub event_name: Vec<String>,

    /// Event meta keys. Only meaningful together with `event_name`.
    pub event_meta_key: Vec<String>,

    /// Event meta key/value pairs.
    pub event_meta: BTreeMap<String, String>,

    /// Must be used together with `session_id`.
    pub visitor_id: u64,
    pub session_id: u32,

    pub search: Vec<Search>,

    /// Replaces the default order of the analyzer.
    pub sort: Vec<Sort>,

    /// Zero or less disables the offset.
    pub offset: i64,

    /// Zero or less disables the limit.
    pub limit: i64,

    /// Event meta key to average and sum. Requires `event_name` and `custom_metric_type`.
    pub custom_metric_key: String,

    /// `integer` or `float`.
    pub custom_metric_type: String,

    /// Keep the time of day in `from` and `to`.
    pub include_time: bool,
    pub include_title: bool,
    pub include_time_on_page: bool,
    pub include_cr: bool,

    pub weekday_mode: WeekdayMode,

    /// Caps the time spent on a single page. 0 disables the cap.
    pub max_time_on_page_seconds: i64,

    /// Sampling size. 0 disables sampling.
    pub sample: u32,

    /// Start of the imported sub-range. Set by validation from `imported_until`.
    pub imported_from: Option<NaiveDateTime>,

    /// End of the imported sub-range. Set by validation.
    pub imported_to: Option<NaiveDateTime>,
}

fn to_date(datetime: NaiveDateTime) -> NaiveDateTime {
    datetime.date().and_time(NaiveTime::default())
}

fn remove_duplicates(list: &mut Vec<String>) {
    let mut seen = HashSet::with_capacity(list.len());
    list.retain(|item| seen.insert(item.clone()));
}

fn sorted(list: &[String]) -> Vec<&String> {
    let mut list: Vec<&String> = list.iter().collect();
    list.sort();
    list
}

impl Filter {
    pub fn new(client_id: i64) -> Self {
        Self {
            client_id,
            ..Self::default()
        }
    }

    /// Sets the period to whole days between `from` and `to`.
    pub fn with_range(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.from = Some(from.and_time(NaiveTime::default()));
        self.to = Some(to.and_time(NaiveTime::default()));
        self
    }

    pub fn with_context(mut self, ctx: QueryContext) -> Self {
        self.ctx = ctx;
        self
    }

    /// Both ends of the imported sub-range, if validation produced one.
    pub fn imported_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        self.imported_from.zip(self.imported_to)
    }

    pub(crate) fn clear_imported_range(&mut self) {
        self.imported_from = None;
        self.imported_to = None;
    }

    pub fn tz(&self) -> Tz {
        self.timezone.unwrap_or(Tz::UTC)
    }

    /// The custom metric, if key and a recognised type are both set.
    pub fn custom_metric(&self) -> Option<(&str, CustomMetricType)> {
        if self.custom_metric_key.is_empty() {
            return None;
        }
        CustomMetricType::parse(&self.custom_metric_type).map(|t| (self.custom_metric_key.as_str(), t))
    }

    /// Key or type set, even if the pair is incomplete.
    pub(crate) fn custom_metric_requested(&self) -> bool {
        !self.custom_metric_key.is_empty() || !self.custom_metric_type.is_empty()
    }

    pub fn search_contains(&self, field: Field) -> bool {
        self.search.iter().any(|s| s.field == field)
    }

    pub(crate) fn has_negated_event_name(&self) -> bool {
        self.event_name.iter().any(|name| name.starts_with('!'))
    }

    /// Normalizes the filter in place. Running it twice is a no-op.
    pub fn validate(&mut self) {
        self.validate_at(Utc::now().naive_utc());
    }

    /// [`validate`](Self::validate) with an explicit current time.
    pub fn validate_at(&mut self, now: NaiveDateTime) {
        if self.timezone.is_none() {
            self.timezone = Some(Tz::UTC);
        }

        if !self.include_time {
            self.from = self.from.map(to_date);
            self.to = self.to.map(to_date);
        }

        if let (Some(from), Some(to)) = (self.from, self.to) {
            if from > to {
                self.from = Some(to);
                self.to = Some(from);
            }
        }

        if let (Some(until), Some(from), Some(to)) = (self.imported_until, self.from, self.to) {
            if from < until {
                self.imported_from = Some(from);

                if to < until {
                    self.imported_to = Some(to);
                } else {
                    self.from = Some(until);
                    self.imported_to = Some(until - Duration::days(1));
                }
            }
        }

        // tomorrow rather than today so every timezone's current day is included
        let tomorrow = to_date(now) + Duration::days(1);

        if let Some(to) = self.to {
            if to > tomorrow {
                self.to = Some(tomorrow);
            }
        }

        if !self.path.is_empty() && !self.path_pattern.is_empty() {
            self.path_pattern.clear();
        }

        for search in &mut self.search {
            search.input = search.input.trim().to_string();
        }

        self.offset = self.offset.max(0);
        self.limit = self.limit.max(0);

        if !self.custom_metric_type.is_empty()
            && CustomMetricType::parse(&self.custom_metric_type).is_none()
        {
            self.custom_metric_type.clear();
        }

        if self.weekday_mode != WeekdayMode::MONDAY && self.weekday_mode != WeekdayMode::SUNDAY {
            self.weekday_mode = WeekdayMode::MONDAY;
        }

        remove_duplicates(&mut self.country);
        self.country
            .retain(|code| code.len() == 2 || (code.len() == 3 && code.starts_with('!')));

        for list in self.lists_mut() {
            remove_duplicates(list);
        }
    }

    fn lists(&self) -> [&Vec<String>; 26] {
        [
            &self.hostname,
            &self.path,
            &self.any_path,
            &self.entry_path,
            &self.exit_path,
            &self.path_pattern,
            &self.language,
            &self.country,
            &self.region,
            &self.city,
            &self.referrer,
            &self.referrer_name,
            &self.channel,
            &self.os,
            &self.os_version,
            &self.browser,
            &self.browser_version,
            &self.screen_class,
            &self.utm_source,
            &self.utm_medium,
            &self.utm_campaign,
            &self.utm_content,
            &self.utm_term,
            &self.tag,
            &self.event_name,
            &self.event_meta_key,
        ]
    }

    fn lists_mut(&mut self) -> [&mut Vec<String>; 26] {
        [
            &mut self.hostname,
            &mut self.path,
            &mut self.any_path,
            &mut self.entry_path,
            &mut self.exit_path,
            &mut self.path_pattern,
            &mut self.language,
            &mut self.country,
            &mut self.region,
            &mut self.city,
            &mut self.referrer,
            &mut self.referrer_name,
            &mut self.channel,
            &mut self.os,
            &mut self.os_version,
            &mut self.browser,
            &mut self.browser_version,
            &mut self.screen_class,
            &mut self.utm_source,
            &mut self.utm_medium,
            &mut self.utm_campaign,
            &mut self.utm_content,
            &mut self.utm_term,
            &mut self.tag,
            &mut self.event_name,
            &mut self.event_meta_key,
        ]
    }

    /// True if no dimension predicate is set. Time range and options are ignored.
    pub fn is_empty(&self) -> bool {
        self.lists().iter().all(|list| list.is_empty())
            && self.platform.is_empty()
            && self.tags.is_empty()
            && self.event_meta.is_empty()
            && self.visitor_id == 0
            && self.session_id == 0
            && self.search.is_empty()
    }

    /// Structural equality, ignoring the order of list values and the context.
    pub fn equal(&self, other: &Filter) -> bool {
        let simple = self.client_id == other.client_id
            && self.tz() == other.tz()
            && self.from == other.from
            && self.to == other.to
            && self.imported_until == other.imported_until
            && self.period == other.period
            && self.platform == other.platform
            && self.visitor_id == other.visitor_id
            && self.session_id == other.session_id
            && self.offset == other.offset
            && self.limit == other.limit
            && self.custom_metric_key == other.custom_metric_key
            && self.custom_metric_type == other.custom_metric_type
            && self.include_time == other.include_time
            && self.include_title == other.include_title
            && self.include_time_on_page == other.include_time_on_page
            && self.include_cr == other.include_cr
            && self.weekday_mode == other.weekday_mode
            && self.max_time_on_page_seconds == other.max_time_on_page_seconds
            && self.sample == other.sample;

        if !simple {
            return false;
        }

        let lists_equal = self
            .lists()
            .iter()
            .zip(other.lists().iter())
            .all(|(a, b)| sorted(a) == sorted(b));

        if !lists_equal {
            return false;
        }

        let mut search = self.search.clone();
        let mut other_search = other.search.clone();
        search.sort_by(|a, b| (&a.input, a.field).cmp(&(&b.input, b.field)));
        other_search.sort_by(|a, b| (&a.input, a.field).cmp(&(&b.input, b.field)));

        let mut sort = self.sort.clone();
        let mut other_sort = other.sort.clone();
        sort.sort_by_key(|s| (s.direction, s.field));
        other_sort.sort_by_key(|s| (s.direction, s.field));

        search == other_search
            && sort == other_sort
            && self.tags == other.tags
            && self.event_meta == other.event_meta
    }

    /// Filter for the session correlation sub-query.
    pub(crate) fn for_session_join(&self) -> Filter {
        Filter {
            sort: Vec::new(),
            ..self.clone()
        }
    }

    /// Filter for the page view correlation sub-query.
    pub(crate) fn for_page_view_join(&self) -> Filter {
        Filter {
            sort: Vec::new(),
            ..self.clone()
        }
    }

    /// Filter for the inner event join. Path filters belong to the page view layer.
    pub(crate) fn for_event_join(&self) -> Filter {
        Filter {
            path: Vec::new(),
            any_path: Vec::new(),
            sort: Vec::new(),
            ..self.clone()
        }
    }

    /// Filter for the event left join. Event predicates are applied by the outer query.
    pub(crate) fn for_event_left_join(&self) -> Filter {
        Filter {
            event_name: Vec::new(),
            event_meta_key: Vec::new(),
            event_meta: BTreeMap::new(),
            sort: Vec::new(),
            ..self.clone()
        }
    }

    /// Time range only, without any dimension predicate.
    pub(crate) fn time_only(&self) -> Filter {
        Filter {
            ctx: self.ctx.clone(),
            client_id: self.client_id,
            timezone: self.timezone,
            from: self.from,
            to: self.to,
            period: self.period,
            include_time: self.include_time,
            weekday_mode: self.weekday_mode,
            ..Filter::default()
        }
    }

    /// Time range plus the imported split and sampling, for plain totals.
    pub(crate) fn totals_scope(&self) -> Filter {
        Filter {
            imported_until: self.imported_until,
            imported_from: self.imported_from,
            imported_to: self.imported_to,
            sample: self.sample,
            ..self.time_only()
        }
    }
}

impl PartialEq for Filter {
    fn eq(&self, other: &Self) -> bool {
        self.equal(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 15)
            .unwrap()
            .and_hms_opt(13, 37, 0)
            .unwrap()
    }

    fn past_day(n: i64) -> NaiveDateTime {
        to_date(now()) - Duration::days(n)
    }

    fn validated(mut filter: Filter) -> Filter {
        filter.validate_at(now());
        filter
    }

    #[test]
    fn defaults_timezone_and_keeps_missing_dates() {
        let filter = validated(Filter::new(0));
        assert_eq!(filter.timezone, Some(Tz::UTC));
        assert_eq!(filter.from, None);
        assert_eq!(filter.to, None);
        assert_eq!(filter.weekday_mode, WeekdayMode::MONDAY);
    }

    #[test]
    fn swaps_inverted_range_and_truncates_time() {
        let filter = validated(Filter {
            from: Some(past_day(2) + Duration::hours(5)),
            to: Some(past_day(5)),
            limit: 42,
            ..Filter::default()
        });
        assert_eq!(filter.from, Some(past_day(5)));
        assert_eq!(filter.to, Some(past_day(2)));
        assert_eq!(filter.limit, 42);
    }

    #[test]
    fn keeps_time_of_day_when_requested() {
        let from = past_day(2) + Duration::hours(5);
        let filter = validated(Filter {
            from: Some(from),
            include_time: true,
            ..Filter::default()
        });
        assert_eq!(filter.from, Some(from));
    }

    #[test]
    fn clamps_to_tomorrow() {
        let filter = validated(Filter {
            from: Some(past_day(2)),
            to: Some(past_day(-5)),
            ..Filter::default()
        });
        assert_eq!(filter.from, Some(past_day(2)));
        assert_eq!(filter.to, Some(past_day(-1)));
    }

    #[test]
    fn path_wins_over_pattern() {
        let filter = validated(Filter {
            limit: -42,
            offset: -1,
            path: vec!["/path".into()],
            path_pattern: vec!["pattern".into()],
            ..Filter::default()
        });
        assert_eq!(filter.limit, 0);
        assert_eq!(filter.offset, 0);
        assert_eq!(filter.path, vec!["/path"]);
        assert!(filter.path_pattern.is_empty());

        let filter = validated(Filter {
            path_pattern: vec!["pattern".into(), "pattern".into()],
            ..Filter::default()
        });
        assert_eq!(filter.path_pattern, vec!["pattern"]);
    }

    #[test]
    fn drops_malformed_country_codes() {
        let filter = validated(Filter {
            country: ["de", "gb", "!en", "invalid", "", "de"]
                .map(String::from)
                .to_vec(),
            ..Filter::default()
        });
        assert_eq!(filter.country, vec!["de", "gb", "!en"]);
    }

    #[test]
    fn removes_duplicates_in_order() {
        let filter = validated(Filter {
            path: ["/", "/", "/foo", "/Foo", "/bar", "/foo"]
                .map(String::from)
                .to_vec(),
            any_path: vec!["/a".into(), "/a".into()],
            ..Filter::default()
        });
        assert_eq!(filter.path, vec!["/", "/foo", "/Foo", "/bar"]);
        assert_eq!(filter.any_path, vec!["/a"]);
    }

    #[test]
    fn resets_invalid_options() {
        let filter = validated(Filter {
            custom_metric_type: "string".into(),
            weekday_mode: WeekdayMode(7),
            search: vec![Search {
                field: Field::Path,
                input: "  foo ".into(),
            }],
            ..Filter::default()
        });
        assert!(filter.custom_metric_type.is_empty());
        assert_eq!(filter.weekday_mode, WeekdayMode::MONDAY);
        assert_eq!(filter.search[0].input, "foo");

        let filter = validated(Filter {
            custom_metric_type: "float".into(),
            weekday_mode: WeekdayMode::SUNDAY,
            ..Filter::default()
        });
        assert_eq!(filter.custom_metric_type, "float");
        assert_eq!(filter.weekday_mode, WeekdayMode::SUNDAY);
    }

    #[test]
    fn imported_until_before_from_does_not_split() {
        let filter = validated(Filter {
            from: Some(past_day(30)),
            to: Some(past_day(5)),
            imported_until: Some(past_day(31)),
            ..Filter::default()
        });
        assert_eq!(filter.imported_until, Some(past_day(31)));
        assert_eq!(filter.imported_range(), None);
    }

    #[test]
    fn imported_range_covers_whole_period() {
        let filter = validated(Filter {
            from: Some(past_day(5)),
            to: Some(past_day(30)),
            imported_until: Some(past_day(3)),
            ..Filter::default()
        });
        assert_eq!(filter.from, Some(past_day(30)));
        assert_eq!(filter.to, Some(past_day(5)));
        assert_eq!(filter.imported_from, Some(past_day(30)));
        assert_eq!(filter.imported_to, Some(past_day(5)));
    }

    #[test]
    fn imported_range_splits_period() {
        let filter = validated(Filter {
            from: Some(past_day(30)),
            to: Some(past_day(5)),
            imported_until: Some(past_day(20)),
            ..Filter::default()
        });
        assert_eq!(filter.from, Some(past_day(20)));
        assert_eq!(filter.to, Some(past_day(5)));
        assert_eq!(filter.imported_from, Some(past_day(30)));
        assert_eq!(filter.imported_to, Some(past_day(21)));

        let filter = validated(Filter {
            from: Some(past_day(1)),
            to: Some(past_day(0)),
            imported_until: Some(past_day(0)),
            ..Filter::default()
        });
        assert_eq!(filter.from, Some(past_day(0)));
        assert_eq!(filter.to, Some(past_day(0)));
        assert_eq!(filter.imported_from, Some(past_day(1)));
        assert_eq!(filter.imported_to, Some(past_day(1)));
    }

    #[test]
    fn single_imported_day() {
        let filter = validated(Filter {
            from: Some(past_day(5)),
            to: Some(past_day(5)),
            imported_until: Some(past_day(4)),
            ..Filter::default()
        });
        assert_eq!(filter.from, Some(past_day(5)));
        assert_eq!(filter.to, Some(past_day(5)));
        assert_eq!(filter.imported_from, Some(past_day(5)));
        assert_eq!(filter.imported_to, Some(past_day(5)));
    }

    #[test]
    fn validation_is_idempotent() {
        let inputs = vec![
            Filter {
                from: Some(past_day(30)),
                to: Some(past_day(5)),
                imported_until: Some(past_day(20)),
                ..Filter::default()
            },
            Filter {
                from: Some(past_day(1)),
                to: Some(past_day(-3)),
                country: vec!["us".into(), "invalid".into(), "!gb".into(), "".into()],
                path: vec!["/".into(), "/".into()],
                path_pattern: vec!["x".into()],
                offset: -3,
                ..Filter::default()
            },
            Filter {
                from: Some(past_day(3) + Duration::minutes(12)),
                include_time: true,
                weekday_mode: WeekdayMode(-1),
                ..Filter::default()
            },
        ];

        for input in inputs {
            let once = validated(input);
            let twice = validated(once.clone());
            assert_eq!(once, twice);
            assert_eq!(once.imported_range(), twice.imported_range());
            if let (Some(from), Some(to)) = (once.from, once.to) {
                assert!(from <= to);
            }
        }
    }

    #[test]
    fn equal_ignores_list_order() {
        let mut meta = BTreeMap::new();
        meta.insert("foo".to_string(), "bar".to_string());
        let a = Filter {
            path: vec!["/foo".into(), "/bar".into()],
            event_name: vec!["event".into()],
            event_meta: meta.clone(),
            ..Filter::default()
        };
        let b = Filter {
            path: vec!["/bar".into(), "/foo".into()],
            event_name: vec!["event".into()],
            event_meta: meta,
            ..Filter::default()
        };
        let c = Filter {
            path: vec!["/foo".into()],
            ..Filter::default()
        };
        assert!(a.equal(&b));
        assert!(b.equal(&a));
        assert!(!c.equal(&a));
        assert!(!a.equal(&c));
        assert_ne!(b, c);
    }

    #[test]
    fn equal_ignores_search_and_sort_order() {
        let a = Filter {
            search: vec![
                Search { field: Field::Path, input: "a".into() },
                Search { field: Field::Referrer, input: "b".into() },
            ],
            sort: vec![
                Sort { field: Field::Visitors, direction: Direction::Desc },
                Sort { field: Field::Path, direction: Direction::Asc },
            ],
            ..Filter::default()
        };
        let mut b = a.clone();
        b.search.reverse();
        b.sort.reverse();
        assert!(a.equal(&b));
        b.sort[0].direction = Direction::Desc;
        assert!(!a.equal(&b));
    }

    #[test]
    fn empty_ignores_time_and_options() {
        let filter = Filter {
            from: Some(past_day(3)),
            include_cr: true,
            limit: 10,
            ..Filter::default()
        };
        assert!(filter.is_empty());
        assert!(!Filter { platform: "mobile".into(), ..Filter::default() }.is_empty());
        assert!(!Filter { visitor_id: 1, ..Filter::default() }.is_empty());
        assert!(!Filter { any_path: vec!["/".into()], ..Filter::default() }.is_empty());
    }

    #[test]
    fn scoped_copies_clear_their_fields() {
        let filter = Filter {
            client_id: 7,
            path: vec!["/".into()],
            any_path: vec!["/a".into()],
            event_name: vec!["signup".into()],
            event_meta_key: vec!["plan".into()],
            country: vec!["de".into()],
            sort: vec![Sort { field: Field::Path, direction: Direction::Asc }],
            ..Filter::default()
        };

        let join = filter.for_event_join();
        assert!(join.path.is_empty() && join.any_path.is_empty() && join.sort.is_empty());
        assert_eq!(join.event_name, filter.event_name);

        let left = filter.for_event_left_join();
        assert!(left.event_name.is_empty() && left.event_meta_key.is_empty());
        assert_eq!(left.path, filter.path);

        let sessions = filter.for_session_join();
        assert!(sessions.sort.is_empty());
        assert_eq!(sessions.country, filter.country);

        let time = filter.time_only();
        assert_eq!(time.client_id, 7);
        assert!(time.is_empty());
    }
}
