//! Filter validation, equality and emptiness through the public API.

use chrono::{NaiveDate, NaiveDateTime};
use tally::{Direction, Field, Filter, QueryContext, Search, Sort, WeekdayMode};

fn day(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .expect("valid date")
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 15)
        .and_then(|date| date.and_hms_opt(14, 30, 0))
        .expect("valid time")
}

#[test]
fn country_codes_keep_two_letter_and_negated_values() {
    let mut filter = Filter {
        country: ["de", "gb", "!en", "invalid", ""]
            .into_iter()
            .map(String::from)
            .collect(),
        ..Filter::default()
    };
    filter.validate_at(now());
    assert_eq!(filter.country.len(), 3);
    assert_eq!(filter.country, vec!["de", "gb", "!en"]);
}

/// A spread of filters touching every validation step.
fn generated_filters() -> Vec<Filter> {
    let ranges = [
        (None, None),
        (Some(day(2024, 6, 1)), Some(day(2024, 6, 10))),
        (Some(day(2024, 6, 10)), Some(day(2024, 6, 1))),
        (Some(day(2024, 6, 15)), Some(day(2024, 6, 15))),
        (Some(day(2024, 6, 1)), Some(day(2025, 1, 1))),
    ];
    let imported = [None, Some(day(2024, 6, 5)), Some(day(2024, 5, 1)), Some(day(2024, 6, 12))];
    let mut filters = Vec::new();

    for (i, (from, to)) in ranges.iter().enumerate() {
        for (j, until) in imported.iter().enumerate() {
            let mut filter = Filter::new(i as i64);
            filter.from = *from;
            filter.to = *to;
            filter.imported_until = *until;
            filter.include_time = j % 2 == 1;
            filter.path = vec!["/".into(), "/".into(), "/blog".into()];
            filter.path_pattern = if i % 2 == 0 { vec!["^/a".into()] } else { vec![] };
            filter.country = vec!["DE".into(), "fr".into(), "france".into()];
            filter.offset = -(i as i64);
            filter.limit = j as i64 - 2;
            filter.weekday_mode = WeekdayMode(i as i32);
            filter.custom_metric_type = if j == 0 { "float".into() } else { "money".into() };
            filter.search = vec![Search {
                field: Field::Path,
                input: "  blog ".into(),
            }];
            filters.push(filter);
        }
    }
    filters
}

#[test]
fn validation_is_idempotent() {
    for filter in generated_filters() {
        let mut once = filter.clone();
        once.validate_at(now());
        let mut twice = once.clone();
        twice.validate_at(now());
        assert_eq!(once, twice, "second validation changed {once:?}");
        assert_eq!(once.imported_range(), twice.imported_range());
    }
}

#[test]
fn validated_filters_satisfy_the_invariants() {
    let tomorrow = day(2024, 6, 16);
    for mut filter in generated_filters() {
        filter.validate_at(now());
        if let (Some(from), Some(to)) = (filter.from, filter.to) {
            assert!(from <= to);
        }
        if let Some(to) = filter.to {
            assert!(to <= tomorrow);
        }
        if let Some((imported_from, imported_to)) = filter.imported_range() {
            let until = filter.imported_until.expect("split requires a cutoff");
            assert!(imported_from <= imported_to);
            assert!(imported_to < until);
        }
        assert!(filter.path_pattern.is_empty() || filter.path.is_empty());
        assert_eq!(filter.path, vec!["/", "/blog"]);
        assert!(filter.offset >= 0 && filter.limit >= 0);
        assert!(filter.weekday_mode == WeekdayMode::MONDAY || filter.weekday_mode == WeekdayMode::SUNDAY);
        assert!(filter.custom_metric_type.is_empty() || filter.custom_metric_type == "float");
        assert_eq!(filter.search[0].input, "blog");
        assert!(filter.timezone.is_some());
    }
}

#[test]
fn imported_boundaries() {
    let mut before = Filter::new(1);
    before.from = Some(day(2024, 6, 1));
    before.to = Some(day(2024, 6, 10));
    before.imported_until = Some(day(2024, 5, 20));
    before.validate_at(now());
    assert_eq!(before.imported_from, None);
    assert_eq!(before.imported_to, None);

    let mut single = Filter::new(1);
    single.from = Some(day(2024, 6, 1));
    single.to = Some(day(2024, 6, 1));
    single.imported_until = Some(day(2024, 6, 2));
    single.validate_at(now());
    assert_eq!(single.imported_range(), Some((day(2024, 6, 1), day(2024, 6, 1))));
}

#[test]
fn equality_ignores_order_and_context() {
    let (ctx, _handle) = QueryContext::cancellable();
    let a = Filter {
        path: vec!["/a".into(), "/b".into()],
        sort: vec![
            Sort {
                field: Field::Visitors,
                direction: Direction::Desc,
            },
            Sort {
                field: Field::Path,
                direction: Direction::Asc,
            },
        ],
        ..Filter::new(3)
    };
    let b = Filter {
        path: vec!["/b".into(), "/a".into()],
        sort: a.sort.iter().rev().cloned().collect(),
        ..Filter::new(3)
    }
    .with_context(ctx);
    assert!(a.equal(&b));

    let c = Filter {
        path: vec!["/a".into()],
        ..a.clone()
    };
    assert_ne!(a, c);
}

#[test]
fn emptiness_only_looks_at_dimensions() {
    let mut filter = Filter::new(1).with_range(
        NaiveDate::from_ymd_opt(2024, 1, 1).expect("date"),
        NaiveDate::from_ymd_opt(2024, 1, 31).expect("date"),
    );
    filter.include_cr = true;
    filter.limit = 10;
    assert!(filter.is_empty());

    filter.tags.insert("author".into(), "ada".into());
    assert!(!filter.is_empty());
}
