//! Table selection and join planning.

use crate::fields::{contains, contains_any, Field, Table};
use crate::filter::Filter;

use super::{QueryBuilder, QuerySpec};

/// Fields that can only be answered from page views.
const PAGE_VIEW_FIELDS: &[Field] = &[
    Field::PageViewsAll,
    Field::Path,
    Field::Entries,
    Field::Exits,
    Field::Hour,
    Field::Minute,
    Field::TagKeysRaw,
    Field::TagValuesRaw,
    Field::TagKey,
    Field::TagValue,
];

impl Filter {
    /// The fact table a query for `fields` reads from.
    pub fn table(&self, fields: &[Field]) -> Table {
        let tag_field = contains_any(fields, &[Field::TagKey, Field::TagValue]);
        let all_sessions = contains(fields, Field::SessionsAll);

        let page_view_requested = !self.path.is_empty()
            || !self.path_pattern.is_empty()
            || !self.tags.is_empty()
            || !self.tag.is_empty()
            || contains_any(fields, PAGE_VIEW_FIELDS)
            || self.search_contains(Field::Path);
        let custom_metric_incomplete =
            self.custom_metric_type.is_empty() || self.custom_metric_key.is_empty();

        if page_view_requested && (custom_metric_incomplete || tag_field) && !all_sessions {
            return Table::PageViews;
        }

        if contains_any(fields, &[Field::EntryPath, Field::ExitPath]) {
            return Table::Sessions;
        }

        let event_requested = !self.event_name.is_empty()
            || contains_any(fields, &[Field::EventName, Field::EventsAll])
            || !custom_metric_incomplete;
        if event_requested && !all_sessions {
            return Table::Events;
        }

        Table::Sessions
    }
}

impl QueryBuilder {
    /// Chooses the primary table and the joins needed to answer `spec`.
    pub fn plan(filter: &Filter, spec: &QuerySpec) -> QueryBuilder {
        let fields = spec.fields.as_slice();
        let table = filter.table(fields);

        let mut q = QueryBuilder::new(table, filter.clone(), fields.to_vec());
        q.group_by = spec.group_by.clone();
        q.order_by = spec.order_by.clone();
        q.search = filter.search.clone();
        q.offset = filter.offset;
        q.limit = filter.limit;
        q.final_read = contains(fields, Field::SessionsAll);
        q.imported = spec.imported.clone();

        let event_fields = contains_any(fields, &[Field::EventName, Field::EventsAll])
            || filter.custom_metric_requested();
        let tag_fields = contains_any(fields, &[Field::TagKey, Field::TagValue]);

        if event_fields && !tag_fields {
            q.table = Table::Events;
            q.include_event_filter = true;
            q.join = join_sessions(filter, Table::Events, fields);
        } else if table == Table::Events {
            q.table = Table::Sessions;
            q.fields.retain(|f| *f != Field::Path);
            q.include_event_filter = true;
            q.left_join = Some(Box::new(left_join_events(filter, fields)));
        } else if table == Table::PageViews {
            q.join = join_sessions(filter, Table::PageViews, fields);
            join_or_left_join_events(&mut q, filter, fields);
        } else {
            q.join = join_page_views(filter, fields);
            join_or_left_join_events(&mut q, filter, fields);
        }

        q.join_third = join_unique_visitors_by_period(filter, fields);
        q
    }
}

fn join_sessions(filter: &Filter, table: Table, fields: &[Field]) -> Option<Box<QueryBuilder>> {
    let needed = !filter.entry_path.is_empty()
        || !filter.exit_path.is_empty()
        || contains(fields, Field::Bounces)
        || (table == Table::Events && contains(fields, Field::Views))
        || contains_any(fields, &[Field::EntryPath, Field::ExitPath]);
    if !needed {
        return None;
    }

    let mut join_fields = vec![Field::VisitorId, Field::SessionId];
    if !filter.entry_path.is_empty()
        || contains(fields, Field::EntryPath)
        || filter.search_contains(Field::EntryPath)
    {
        join_fields.push(Field::EntryPath);
        if filter.include_title {
            join_fields.push(Field::EntryTitle);
        }
    }
    if !filter.exit_path.is_empty()
        || contains(fields, Field::ExitPath)
        || filter.search_contains(Field::ExitPath)
    {
        join_fields.push(Field::ExitPath);
        if filter.include_title {
            join_fields.push(Field::ExitTitle);
        }
    }
    let group_by = join_fields.clone();
    if contains(fields, Field::Bounces) {
        join_fields.push(Field::Bounces);
    }
    if contains(fields, Field::Views) {
        join_fields.push(Field::Views);
    }

    let mut child = QueryBuilder::new(Table::Sessions, filter.for_session_join(), join_fields);
    child.group_by = group_by;
    child.final_read = contains(fields, Field::SessionsAll);
    Some(Box::new(child))
}

fn join_page_views(filter: &Filter, fields: &[Field]) -> Option<Box<QueryBuilder>> {
    let path_filtered = !filter.path.is_empty()
        || !filter.path_pattern.is_empty()
        || !filter.any_path.is_empty();
    let needed = path_filtered
        || !filter.tag.is_empty()
        || !filter.tags.is_empty()
        || filter.search_contains(Field::Path)
        || contains_any(
            fields,
            &[
                Field::TagKey,
                Field::TagValue,
                Field::TagKeysRaw,
                Field::TagValuesRaw,
            ],
        );
    if !needed {
        return None;
    }

    let mut join_fields = vec![Field::VisitorId, Field::SessionId];
    if path_filtered || contains(fields, Field::Path) || filter.search_contains(Field::Path) {
        join_fields.push(Field::Path);
    }
    if contains_any(fields, &[Field::TagKey, Field::TagKeysRaw]) {
        join_fields.push(Field::TagKeysRaw);
    }
    if contains_any(fields, &[Field::TagValue, Field::TagValuesRaw]) {
        join_fields.push(Field::TagValuesRaw);
    }

    let mut child = QueryBuilder::new(Table::PageViews, filter.for_page_view_join(), join_fields);
    child.group_by = child.fields.clone();
    Some(Box::new(child))
}

fn join_or_left_join_events(q: &mut QueryBuilder, filter: &Filter, fields: &[Field]) {
    if filter.has_negated_event_name() {
        q.include_event_filter = true;
        q.left_join = Some(Box::new(left_join_events(filter, fields)));
    } else {
        q.join_second = join_events(filter, fields);
    }
}

fn join_events(filter: &Filter, fields: &[Field]) -> Option<Box<QueryBuilder>> {
    if filter.event_name.is_empty() && !contains(fields, Field::EventName) {
        return None;
    }

    let mut join_fields = vec![Field::VisitorId, Field::SessionId];
    for field in [
        Field::Hour,
        Field::Minute,
        Field::EventName,
        Field::EventPath,
        Field::EventTitle,
    ] {
        if contains(fields, field) {
            join_fields.push(field);
        }
    }

    if filter.custom_metric().is_some() {
        join_fields.push(Field::EventMetaKeysRaw);
        join_fields.push(Field::EventMetaValuesRaw);
    } else {
        if contains_any(
            fields,
            &[
                Field::EventMetaKeysRaw,
                Field::EventMetaKeys,
                Field::EventMeta,
                Field::EventMetaValues,
            ],
        ) {
            join_fields.push(Field::EventMetaKeysRaw);
        }
        if contains_any(
            fields,
            &[
                Field::EventMetaValuesRaw,
                Field::EventMetaValues,
                Field::EventMeta,
            ],
        ) {
            join_fields.push(Field::EventMetaValuesRaw);
        }
    }

    let mut child = QueryBuilder::new(Table::Events, filter.for_event_join(), join_fields);
    child.group_by = child.fields.clone();
    Some(Box::new(child))
}

fn left_join_events(filter: &Filter, fields: &[Field]) -> QueryBuilder {
    let mut join_fields = vec![Field::VisitorId, Field::SessionId, Field::EventName];
    if !filter.event_meta.is_empty() || contains_any(fields, &[Field::EventMeta, Field::EventMetaValues]) {
        join_fields.push(Field::EventMetaKeysRaw);
        join_fields.push(Field::EventMetaValuesRaw);
    } else if !filter.event_meta_key.is_empty() || contains(fields, Field::EventMetaKeys) {
        join_fields.push(Field::EventMetaKeysRaw);
    }
    for field in [Field::EventPath, Field::EventTitle] {
        if contains(fields, field) {
            join_fields.push(field);
        }
    }

    let mut child = QueryBuilder::new(Table::Events, filter.for_event_left_join(), join_fields);
    child.group_by = child.fields.clone();
    child
}

fn join_unique_visitors_by_period(filter: &Filter, fields: &[Field]) -> Option<Box<QueryBuilder>> {
    if !contains(fields, Field::CrPeriod) {
        return None;
    }

    let bucket = if contains(fields, Field::Day) {
        Field::Day
    } else if contains(fields, Field::Minute) {
        Field::Minute
    } else {
        Field::Hour
    };

    let mut child = QueryBuilder::new(
        Table::Sessions,
        filter.time_only(),
        vec![bucket, Field::VisitorsRaw],
    );
    child.group_by = vec![bucket];
    child.order_by = vec![bucket];
    child.sample = filter.sample;
    Some(Box::new(child))
}
