use chrono::{Duration, Utc};

use crate::derived::{self, growth};
use crate::error::{Result, TallyError};
use crate::fields::{Field, ImportedTable};
use crate::filter::{Filter, Period};
use crate::models::{
    ActiveVisitorStats, Growth, GrowthStats, ReferrerStats, TotalVisitorStats,
    TotalVisitorsPageViewsStats, VisitorHourStats, VisitorMinuteStats, VisitorStats,
    VisitorWeekdayHourStats,
};
use crate::query_builder::QuerySpec;

use super::Analyzer;

/// Visitor, session and page view counts.
#[derive(Debug, Clone, Copy)]
pub struct Visitors<'a> {
    analyzer: &'a Analyzer,
}

const SUMMARY: &[Field] = &[
    Field::Visitors,
    Field::Sessions,
    Field::Views,
    Field::Bounces,
    Field::BounceRate,
];

const SUMMARY_IMPORTED: &[Field] = &[
    Field::Visitors,
    Field::Views,
    Field::Sessions,
    Field::Bounces,
];

/// Adds the conversion rate and custom metric columns the filter asks for.
fn with_optional(filter: &Filter, mut fields: Vec<Field>, cr: Field) -> Vec<Field> {
    if filter.include_cr {
        fields.push(cr);
    }
    if !filter.event_name.is_empty() && filter.custom_metric().is_some() {
        fields.push(Field::EventMetaCustomMetricAvg);
        fields.push(Field::EventMetaCustomMetricTotal);
    }
    fields
}

/// Per-bucket fields: the bucket first, then the summary.
fn bucketed(filter: &Filter, bucket: Field) -> Vec<Field> {
    let mut fields = vec![bucket];
    fields.extend_from_slice(SUMMARY);
    with_optional(filter, fields, Field::CrPeriod)
}

impl<'a> Visitors<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    /// Active visitors per hostname and path over the last `duration`, plus their total.
    pub async fn active(
        &self,
        filter: Option<&Filter>,
        duration: Duration,
    ) -> Result<(Vec<ActiveVisitorStats>, i64)> {
        let mut filter = self.analyzer.get_filter(filter);
        filter.from = Some(Utc::now().naive_utc() - duration);
        filter.include_time = true;

        let mut fields = vec![Field::Hostname, Field::Path];
        let mut group_by = fields.clone();
        let mut order_by = vec![Field::Visitors, Field::Hostname, Field::Path];
        if filter.include_title {
            fields.push(Field::Title);
            group_by.push(Field::Title);
            order_by.push(Field::Title);
        }
        fields.push(Field::Visitors);

        let spec = QuerySpec::new(&fields)
            .group_by(&group_by)
            .order_by(&order_by);
        let stats = self.analyzer.select(&filter, &spec).await?;
        let total = self
            .analyzer
            .build(&filter, &QuerySpec::new(&[Field::Visitors]));
        let count = self.analyzer.count(&filter, &total).await?;
        Ok((stats, count))
    }

    /// Visitors, sessions, views, bounces and the optional rates for the whole period.
    pub async fn total(&self, filter: Option<&Filter>) -> Result<TotalVisitorStats> {
        let filter = self.analyzer.get_filter(filter);
        let fields = with_optional(&filter, SUMMARY.to_vec(), Field::Cr);
        let spec = QuerySpec::new(&fields).imported(ImportedTable::Visitors, SUMMARY_IMPORTED);
        self.analyzer.select_one(&filter, &spec).await
    }

    /// Unique visitors, ignoring every dimension predicate.
    pub async fn total_visitors(&self, filter: Option<&Filter>) -> Result<i64> {
        self.total_of(filter, Field::Visitors).await
    }

    /// Page views, ignoring every dimension predicate.
    pub async fn total_page_views(&self, filter: Option<&Filter>) -> Result<i64> {
        self.total_of(filter, Field::Views).await
    }

    /// Sessions, ignoring every dimension predicate.
    pub async fn total_sessions(&self, filter: Option<&Filter>) -> Result<i64> {
        self.total_of(filter, Field::Sessions).await
    }

    async fn total_of(&self, filter: Option<&Filter>, field: Field) -> Result<i64> {
        let filter = self.analyzer.get_filter(filter).totals_scope();
        let statement = self.analyzer.build(
            &filter,
            &QuerySpec::new(&[field]).imported(ImportedTable::Visitors, &[field]),
        );
        self.analyzer.count(&filter, &statement).await
    }

    /// Visitors and views with their growth against the previous period.
    pub async fn total_visitors_page_views(
        &self,
        filter: Option<&Filter>,
    ) -> Result<TotalVisitorsPageViewsStats> {
        let filter = self.analyzer.get_filter(filter);
        if filter.from.is_none() || filter.to.is_none() {
            return Err(TallyError::NoPeriodOrDay);
        }

        let fields = [Field::Visitors, Field::Views];
        let spec = QuerySpec::new(&fields).imported(ImportedTable::Visitors, &fields);
        let mut previous_filter = filter.clone();
        derived::previous_period(&mut previous_filter);

        let (current, previous): (TotalVisitorsPageViewsStats, TotalVisitorsPageViewsStats) =
            futures::try_join!(
                self.analyzer.select_one(&filter, &spec),
                self.analyzer.select_one(&previous_filter, &spec),
            )?;

        Ok(TotalVisitorsPageViewsStats {
            visitors: current.visitors,
            views: current.views,
            visitors_growth: growth(current.visitors as f64, previous.visitors as f64),
            views_growth: growth(current.views as f64, previous.views as f64),
        })
    }

    /// Visitor statistics per day, week, month or year, as set by the filter period.
    pub async fn by_period(&self, filter: Option<&Filter>) -> Result<Vec<VisitorStats>> {
        let filter = self.analyzer.get_filter(filter);
        let fields = bucketed(&filter, Field::Day);
        let spec = QuerySpec::new(&fields)
            .group_by(&[Field::Day])
            .order_by(&[Field::Day, Field::Visitors])
            .imported(
                ImportedTable::Visitors,
                &[
                    Field::Day,
                    Field::Visitors,
                    Field::Sessions,
                    Field::Views,
                    Field::Bounces,
                ],
            );
        let mut stats: Vec<VisitorStats> = self.analyzer.select(&filter, &spec).await?;

        // The bucket column is always named after days.
        for row in &mut stats {
            match filter.period {
                Period::Day => {}
                Period::Week => row.week = row.day.take(),
                Period::Month => row.month = row.day.take(),
                Period::Year => row.year = row.day.take(),
            }
        }
        Ok(stats)
    }

    pub async fn by_hour(&self, filter: Option<&Filter>) -> Result<Vec<VisitorHourStats>> {
        let filter = self.analyzer.get_filter(filter);
        let fields = bucketed(&filter, Field::Hour);
        let spec = QuerySpec::new(&fields)
            .group_by(&[Field::Hour])
            .order_by(&[Field::Hour, Field::Visitors]);
        self.analyzer.select(&filter, &spec).await
    }

    pub async fn by_minute(&self, filter: Option<&Filter>) -> Result<Vec<VisitorMinuteStats>> {
        let filter = self.analyzer.get_filter(filter);
        let fields = bucketed(&filter, Field::Minute);
        let spec = QuerySpec::new(&fields)
            .group_by(&[Field::Minute])
            .order_by(&[Field::Minute, Field::Visitors]);
        self.analyzer.select(&filter, &spec).await
    }

    pub async fn by_weekday_and_hour(
        &self,
        filter: Option<&Filter>,
    ) -> Result<Vec<VisitorWeekdayHourStats>> {
        let filter = self.analyzer.get_filter(filter);
        let spec = QuerySpec::new(&[
            Field::Weekday,
            Field::Hour,
            Field::Visitors,
            Field::Sessions,
            Field::Views,
            Field::Bounces,
        ])
        .group_by(&[Field::Weekday, Field::Hour])
        .order_by(&[Field::Weekday, Field::Hour]);
        self.analyzer.select(&filter, &spec).await
    }

    /// Growth of every summary statistic against the previous period.
    ///
    /// Time spent is the event duration when events are filtered, the time on
    /// page when paths are, and the session duration otherwise.
    pub async fn growth(&self, filter: Option<&Filter>) -> Result<Growth> {
        let filter = self.analyzer.get_filter(filter);
        if filter.from.is_none() || filter.to.is_none() {
            return Err(TallyError::NoPeriodOrDay);
        }

        let fields = with_optional(&filter, SUMMARY.to_vec(), Field::Cr);
        let spec = QuerySpec::new(&fields).imported(ImportedTable::Visitors, SUMMARY_IMPORTED);
        let mut previous_filter = filter.clone();
        derived::previous_period(&mut previous_filter);

        let ((current, current_time), (previous, previous_time)) = futures::try_join!(
            self.period_stats(&filter, &spec),
            self.period_stats(&previous_filter, &spec),
        )?;

        Ok(Growth {
            visitors_growth: growth(current.visitors as f64, previous.visitors as f64),
            views_growth: growth(current.views as f64, previous.views as f64),
            sessions_growth: growth(current.sessions as f64, previous.sessions as f64),
            bounces_growth: growth(current.bounce_rate, previous.bounce_rate),
            time_spent_growth: growth(current_time as f64, previous_time as f64),
            cr_growth: growth(current.cr, previous.cr),
            custom_metric_avg_growth: growth(current.custom_metric_avg, previous.custom_metric_avg),
            custom_metric_total_growth: growth(
                current.custom_metric_total,
                previous.custom_metric_total,
            ),
        })
    }

    async fn period_stats(&self, filter: &Filter, spec: &QuerySpec) -> Result<(GrowthStats, i64)> {
        let stats = self.analyzer.select_one(filter, spec).await?;
        let time_spent = if !filter.event_name.is_empty() {
            self.total_event_duration(filter).await?
        } else if filter.path.is_empty() {
            self.total_session_duration(filter).await?
        } else {
            self.total_time_on_page(filter).await?
        };
        Ok((stats, time_spent))
    }

    /// Visitors and bounces per referrer.
    pub async fn referrer(&self, filter: Option<&Filter>) -> Result<Vec<ReferrerStats>> {
        let filter = self.analyzer.get_filter(filter);
        let mut fields = vec![
            Field::ReferrerName,
            Field::ReferrerIcon,
            Field::Visitors,
            Field::Sessions,
            Field::RelativeVisitors,
            Field::Bounces,
            Field::BounceRate,
        ];
        let mut group_by = vec![Field::ReferrerName];
        let mut order_by = vec![Field::Visitors, Field::ReferrerName];

        if !filter.referrer.is_empty() || !filter.referrer_name.is_empty() {
            fields.push(Field::Referrer);
            group_by.push(Field::Referrer);
            order_by.push(Field::Referrer);
        } else {
            fields.push(Field::AnyReferrer);
        }

        let spec = QuerySpec::new(&fields)
            .group_by(&group_by)
            .order_by(&order_by)
            .imported(
                ImportedTable::Referrer,
                &[
                    Field::ReferrerName,
                    Field::Visitors,
                    Field::Sessions,
                    Field::Bounces,
                ],
            );
        self.analyzer.select(&filter, &spec).await
    }

    /// Sum of session durations, including imported history.
    ///
    /// Like the other totals below, it expects a validated filter.
    pub async fn total_session_duration(&self, filter: &Filter) -> Result<i64> {
        let statement = derived::total_session_duration_query(filter, self.analyzer.dialect());
        let mut total = self.analyzer.count(filter, &statement).await?;
        let imported =
            derived::total_imported_session_duration_query(filter, self.analyzer.dialect());
        if let Some(statement) = imported {
            total += self.analyzer.count(filter, &statement).await?;
        }
        Ok(total)
    }

    /// Sum of the time between each page view and the next one of the same session.
    pub async fn total_time_on_page(&self, filter: &Filter) -> Result<i64> {
        let statement = derived::total_time_on_page_query(filter, self.analyzer.dialect());
        self.analyzer.count(filter, &statement).await
    }

    pub async fn total_event_duration(&self, filter: &Filter) -> Result<i64> {
        let statement = derived::total_event_duration_query(filter, self.analyzer.dialect());
        self.analyzer.count(filter, &statement).await
    }
}
