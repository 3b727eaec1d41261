use crate::error::Result;
use crate::fields::Field;
use crate::filter::Filter;
use crate::models::TagStats;
use crate::query_builder::QuerySpec;

use super::Analyzer;

/// Page view tag statistics.
#[derive(Debug, Clone, Copy)]
pub struct Tags<'a> {
    analyzer: &'a Analyzer,
}

impl<'a> Tags<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    /// Visitors and views per tag key.
    pub async fn keys(&self, filter: Option<&Filter>) -> Result<Vec<TagStats>> {
        let filter = self.analyzer.get_filter(filter);
        let spec = QuerySpec::new(&[
            Field::TagKey,
            Field::Visitors,
            Field::Views,
            Field::RelativeVisitors,
            Field::RelativeViews,
        ])
        .group_by(&[Field::TagKey])
        .order_by(&[Field::Visitors, Field::TagKey]);
        self.analyzer.select(&filter, &spec).await
    }

    /// Visitors and views per value of the first tag key of the filter.
    ///
    /// Empty when the filter has no tag key.
    pub async fn breakdown(&self, filter: Option<&Filter>) -> Result<Vec<TagStats>> {
        let filter = self.analyzer.get_filter(filter);
        let Some(key) = filter.tag.first().cloned() else {
            return Ok(Vec::new());
        };

        let spec = QuerySpec::new(&[
            Field::TagValue,
            Field::Visitors,
            Field::Views,
            Field::RelativeVisitors,
            Field::RelativeViews,
        ])
        .group_by(&[Field::TagValue])
        .order_by(&[Field::Visitors, Field::TagValue]);
        let mut stats: Vec<TagStats> = self.analyzer.select(&filter, &spec).await?;
        for row in &mut stats {
            row.key.clone_from(&key);
        }
        Ok(stats)
    }
}
