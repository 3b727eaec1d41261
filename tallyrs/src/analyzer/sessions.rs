use crate::error::Result;
use crate::fields::Field;
use crate::filter::Filter;
use crate::models::{EventRow, PageViewRow, SessionStats, SessionStep};
use crate::query_builder::QuerySpec;

use super::Analyzer;

/// Individual sessions and what happened in them.
#[derive(Debug, Clone, Copy)]
pub struct Sessions<'a> {
    analyzer: &'a Analyzer,
}

/// Interleaves page views and events by time. Page views go first on ties.
fn merge_steps(page_views: Vec<PageViewRow>, events: Vec<EventRow>) -> Vec<SessionStep> {
    let mut steps = Vec::with_capacity(page_views.len() + events.len());
    let mut page_views = page_views.into_iter().peekable();
    let mut events = events.into_iter().peekable();

    loop {
        let take_event = match (page_views.peek(), events.peek()) {
            (Some(page_view), Some(event)) => event.time < page_view.time,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (None, None) => break,
        };
        let step = if take_event {
            events.next().map(SessionStep::Event)
        } else {
            page_views.next().map(SessionStep::PageView)
        };
        steps.extend(step);
    }
    steps
}

impl<'a> Sessions<'a> {
    pub(super) fn new(analyzer: &'a Analyzer) -> Self {
        Self { analyzer }
    }

    /// One row per session with its entry and exit path, views and duration.
    pub async fn list(&self, filter: Option<&Filter>) -> Result<Vec<SessionStats>> {
        let filter = self.analyzer.get_filter(filter);
        let keys = [
            Field::VisitorId,
            Field::SessionId,
            Field::EntryPath,
            Field::ExitPath,
        ];
        let mut fields = vec![Field::SessionsAll];
        fields.extend_from_slice(&keys);
        fields.extend_from_slice(&[Field::Views, Field::SessionDurationAvg]);

        let spec = QuerySpec::new(&fields)
            .group_by(&keys)
            .order_by(&[Field::VisitorId, Field::SessionId]);
        self.analyzer.select(&filter, &spec).await
    }

    /// Page views and events of the session named by the filter, in time order.
    ///
    /// Empty unless the filter sets both the visitor and the session.
    pub async fn breakdown(&self, filter: Option<&Filter>) -> Result<Vec<SessionStep>> {
        let filter = self.analyzer.get_filter(filter);
        if filter.visitor_id == 0 || filter.session_id == 0 {
            return Ok(Vec::new());
        }

        let page_views = QuerySpec::new(&[
            Field::PageViewsAll,
            Field::VisitorId,
            Field::SessionId,
            Field::Time,
            Field::Hostname,
            Field::Path,
            Field::Title,
        ])
        .order_by(&[Field::Time]);
        let events = QuerySpec::new(&[
            Field::EventsAll,
            Field::VisitorId,
            Field::SessionId,
            Field::Time,
            Field::EventName,
            Field::EventPath,
            Field::EventTitle,
            Field::EventMeta,
        ])
        .order_by(&[Field::Time]);

        let (page_views, events) = futures::try_join!(
            self.analyzer.select::<PageViewRow>(&filter, &page_views),
            self.analyzer.select::<EventRow>(&filter, &events),
        )?;
        Ok(merge_steps(page_views, events))
    }
}
