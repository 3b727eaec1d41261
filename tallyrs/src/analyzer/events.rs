use crate::error::Result;
use crate::fields::Field;
use crate::filter::Filter;
use crate::models::{EventListStats, EventStats};
use crate::query_builder::QuerySpec;

use super::Analyzer;

/// Custom event statistics.
#[derive(Debug, Clone, Copy)]
pub struct Events<'a> {
    analyzer: &'a Analyzer,
}

impl<'a> Events<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    /// Count, visitors, views, conversion rate and average duration per event name.
    pub async fn events(&self, filter: Option<&Filter>) -> Result<Vec<EventStats>> {
        let filter = self.analyzer.get_filter(filter);
        let spec = QuerySpec::new(&[
            Field::EventName,
            Field::Count,
            Field::Visitors,
            Field::Views,
            Field::Cr,
            Field::EventTimeSpent,
            Field::EventMetaKeys,
        ])
        .group_by(&[Field::EventName])
        .order_by(&[Field::Visitors, Field::EventName]);
        self.analyzer.select(&filter, &spec).await
    }

    /// [`events`](Self::events) grouped by the value of the first meta key.
    ///
    /// Empty unless the filter names an event and a meta key.
    pub async fn breakdown(&self, filter: Option<&Filter>) -> Result<Vec<EventStats>> {
        let filter = self.analyzer.get_filter(filter);
        if filter.event_name.is_empty() || filter.event_meta_key.is_empty() {
            return Ok(Vec::new());
        }

        let spec = QuerySpec::new(&[
            Field::EventName,
            Field::Count,
            Field::Visitors,
            Field::Views,
            Field::Cr,
            Field::EventTimeSpent,
            Field::EventMetaValues,
        ])
        .group_by(&[Field::EventName, Field::EventMetaValues])
        .order_by(&[Field::Visitors, Field::EventMetaValues]);
        self.analyzer.select(&filter, &spec).await
    }

    /// Events with their metadata as key-value pairs.
    pub async fn list(&self, filter: Option<&Filter>) -> Result<Vec<EventListStats>> {
        let filter = self.analyzer.get_filter(filter);
        let spec = QuerySpec::new(&[
            Field::EventName,
            Field::EventMeta,
            Field::Visitors,
            Field::Count,
        ])
        .group_by(&[Field::EventName, Field::EventMeta])
        .order_by(&[Field::Count, Field::EventName]);
        self.analyzer.select(&filter, &spec).await
    }
}
