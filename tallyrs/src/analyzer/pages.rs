use std::collections::HashMap;

use crate::derived;
use crate::error::Result;
use crate::fields::{Field, ImportedTable};
use crate::filter::Filter;
use crate::models::{
    AvgTimeSpentStats, EntryStats, ExitStats, HostnameStats, PageStats, TotalVisitorSessionStats,
};
use crate::query_builder::QuerySpec;

use super::Analyzer;

/// Page, entry page, exit page and hostname statistics.
#[derive(Debug, Clone, Copy)]
pub struct Pages<'a> {
    analyzer: &'a Analyzer,
}

/// `path` followed by `title` when titles are requested.
fn with_title(filter: &Filter, path: Field, title: Field) -> Vec<Field> {
    if filter.include_title {
        vec![path, title]
    } else {
        vec![path]
    }
}

impl<'a> Pages<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    pub async fn hostname(&self, filter: Option<&Filter>) -> Result<Vec<HostnameStats>> {
        let filter = self.analyzer.get_filter(filter);
        let spec = QuerySpec::new(&[
            Field::Hostname,
            Field::Visitors,
            Field::Views,
            Field::Sessions,
            Field::Bounces,
            Field::RelativeVisitors,
            Field::RelativeViews,
            Field::BounceRate,
        ])
        .group_by(&[Field::Hostname])
        .order_by(&[Field::Visitors, Field::Hostname]);
        self.analyzer.select(&filter, &spec).await
    }

    /// Visitors, views and bounces per path, optionally with the title and
    /// the average time on page.
    pub async fn by_path(&self, filter: Option<&Filter>) -> Result<Vec<PageStats>> {
        let filter = self.analyzer.get_filter(filter);
        let group_by = with_title(&filter, Field::Path, Field::Title);
        let mut fields = group_by.clone();
        fields.extend_from_slice(&[
            Field::Visitors,
            Field::Sessions,
            Field::RelativeVisitors,
            Field::Views,
            Field::RelativeViews,
            Field::Bounces,
            Field::BounceRate,
        ]);
        let mut order_by = vec![Field::Visitors];
        order_by.extend_from_slice(&group_by);

        let spec = QuerySpec::new(&fields)
            .group_by(&group_by)
            .order_by(&order_by)
            .imported(
                ImportedTable::Page,
                &[
                    Field::Path,
                    Field::Visitors,
                    Field::Sessions,
                    Field::Views,
                    Field::Bounces,
                ],
            );
        let mut stats: Vec<PageStats> = self.analyzer.select(&filter, &spec).await?;

        if filter.include_time_on_page && !stats.is_empty() {
            let paths: Vec<String> = stats.iter().map(|s| s.path.clone()).collect();
            let times = self.time_on_page_by_path(&filter, &paths).await?;
            for row in &mut stats {
                row.average_time_spent_seconds = times.get(&row.path).copied().unwrap_or_default();
            }
        }
        Ok(stats)
    }

    /// Sessions entering on each path, optionally with the average time on page.
    ///
    /// `visitors` and `sessions` count everyone who viewed the path, not only
    /// the sessions that entered on it.
    pub async fn entry(&self, filter: Option<&Filter>) -> Result<Vec<EntryStats>> {
        let filter = self.analyzer.get_filter(filter);
        let group_by = with_title(&filter, Field::EntryPath, Field::EntryTitle);
        let mut fields = group_by.clone();
        fields.extend_from_slice(&[
            Field::Visitors,
            Field::Sessions,
            Field::Entries,
            Field::EntryRate,
        ]);
        let mut order_by = vec![Field::Entries];
        order_by.extend_from_slice(&group_by);

        let spec = QuerySpec::new(&fields)
            .group_by(&group_by)
            .order_by(&order_by)
            .imported(
                ImportedTable::EntryPage,
                &[
                    Field::EntryPath,
                    Field::Visitors,
                    Field::Sessions,
                    Field::Entries,
                ],
            );
        let mut stats: Vec<EntryStats> = self.analyzer.select(&filter, &spec).await?;
        let paths: Vec<String> = stats.iter().map(|s| s.path.clone()).collect();

        let totals = self.path_totals(&filter, &paths).await?;
        for row in &mut stats {
            if let Some(total) = totals.get(&row.path) {
                row.visitors = total.visitors;
                row.sessions = total.sessions;
            }
        }

        if filter.include_time_on_page && !stats.is_empty() {
            let times = self.time_on_page_by_path(&filter, &paths).await?;
            for row in &mut stats {
                row.average_time_spent_seconds = times.get(&row.path).copied().unwrap_or_default();
            }
        }
        Ok(stats)
    }

    /// Sessions leaving on each path. `visitors` and `sessions` are the
    /// path's totals, as for [`entry`](Self::entry).
    pub async fn exit(&self, filter: Option<&Filter>) -> Result<Vec<ExitStats>> {
        let filter = self.analyzer.get_filter(filter);
        let group_by = with_title(&filter, Field::ExitPath, Field::ExitTitle);
        let mut fields = group_by.clone();
        fields.extend_from_slice(&[
            Field::Visitors,
            Field::Sessions,
            Field::Exits,
            Field::ExitRate,
        ]);
        let mut order_by = vec![Field::Exits];
        order_by.extend_from_slice(&group_by);

        let spec = QuerySpec::new(&fields)
            .group_by(&group_by)
            .order_by(&order_by)
            .imported(
                ImportedTable::ExitPage,
                &[
                    Field::ExitPath,
                    Field::Visitors,
                    Field::Sessions,
                    Field::Exits,
                ],
            );
        let mut stats: Vec<ExitStats> = self.analyzer.select(&filter, &spec).await?;
        let paths: Vec<String> = stats.iter().map(|s| s.path.clone()).collect();

        let totals = self.path_totals(&filter, &paths).await?;
        for row in &mut stats {
            if let Some(total) = totals.get(&row.path) {
                row.visitors = total.visitors;
                row.sessions = total.sessions;
            }
        }
        Ok(stats)
    }

    /// Visitors, views and sessions of each of `paths`. Entry, exit and tag
    /// predicates of the filter don't apply.
    async fn path_totals(
        &self,
        filter: &Filter,
        paths: &[String],
    ) -> Result<HashMap<String, TotalVisitorSessionStats>> {
        if paths.is_empty() {
            return Ok(HashMap::new());
        }
        let mut filter = filter.clone();
        filter.path = paths.to_vec();
        filter.path_pattern.clear();
        filter.entry_path.clear();
        filter.exit_path.clear();
        filter.tag.clear();
        filter.tags.clear();
        filter.search.clear();
        filter.sort.clear();
        filter.limit = 0;
        filter.offset = 0;

        let spec = QuerySpec::new(&[Field::Path, Field::Views, Field::Visitors, Field::Sessions])
            .group_by(&[Field::Path])
            .order_by(&[Field::Visitors, Field::Path])
            .imported(
                ImportedTable::Page,
                &[Field::Path, Field::Views, Field::Visitors, Field::Sessions],
            );
        let stats: Vec<TotalVisitorSessionStats> = self.analyzer.select(&filter, &spec).await?;
        Ok(stats.into_iter().map(|s| (s.path.clone(), s)).collect())
    }

    /// Average time on page for each of `paths`. Paths without a following
    /// page view in the period are missing from the result.
    pub async fn avg_time_on_page(
        &self,
        filter: Option<&Filter>,
        paths: &[String],
    ) -> Result<Vec<AvgTimeSpentStats>> {
        let filter = self.analyzer.get_filter(filter);
        self.avg_time_on_page_validated(&filter, paths).await
    }

    async fn avg_time_on_page_validated(
        &self,
        filter: &Filter,
        paths: &[String],
    ) -> Result<Vec<AvgTimeSpentStats>> {
        if paths.is_empty() {
            return Ok(Vec::new());
        }
        let statement = derived::avg_time_on_page_query(filter, paths, self.analyzer.dialect());
        self.analyzer.fetch(filter, &statement).await
    }

    async fn time_on_page_by_path(
        &self,
        filter: &Filter,
        paths: &[String],
    ) -> Result<HashMap<String, i64>> {
        let stats = self.avg_time_on_page_validated(filter, paths).await?;
        Ok(stats
            .into_iter()
            .map(|s| (s.path, s.average_time_spent_seconds))
            .collect())
    }
}
