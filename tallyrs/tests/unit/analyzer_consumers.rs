use chrono::NaiveDate;
use serde_json::json;
use tally::{Analyzer, Filter, QueryConfig, SqlValue, TallyError};

use crate::fake_store::{row, FakeStore};

fn first_week() -> Filter {
    Filter::new(1).with_range(
        NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
        NaiveDate::from_ymd_opt(2024, 5, 7).expect("date"),
    )
}

#[tokio::test]
async fn growth_compares_with_the_preceding_week() {
    let store = FakeStore::responding(|statement| {
        let current = statement.args.contains(&SqlValue::from("2024-05-01"));
        let (visitors, views) = if current { (150, 300) } else { (100, 400) };
        row(&[
            ("visitors", json!(visitors)),
            ("views", json!(views)),
            ("sessions", json!(visitors)),
            ("bounce_rate", json!(0.5)),
        ])
    });
    let analyzer = Analyzer::new(store.clone());

    let growth = analyzer
        .visitors()
        .growth(Some(&first_week()))
        .await
        .expect("growth");
    assert_eq!(growth.visitors_growth, 0.5);
    assert_eq!(growth.views_growth, -0.25);
    assert_eq!(growth.bounces_growth, 0.0);

    let statements = store.statements();
    assert!(statements
        .iter()
        .any(|s| s.args.contains(&SqlValue::from("2024-04-24"))
            && s.args.contains(&SqlValue::from("2024-04-30"))));
}

#[tokio::test]
async fn growth_needs_a_period() {
    let store = FakeStore::empty();
    let analyzer = Analyzer::new(store.clone());
    let err = analyzer
        .visitors()
        .growth(Some(&Filter::new(1)))
        .await
        .expect_err("no period");
    assert!(matches!(err, TallyError::NoPeriodOrDay));
    assert!(store.statements().is_empty());
}

#[tokio::test]
async fn breakdowns_without_their_keys_skip_the_store() {
    let store = FakeStore::empty();
    let analyzer = Analyzer::new(store.clone());

    let mut events_only = first_week();
    events_only.event_name = vec!["signup".into()];

    assert!(analyzer.tags().breakdown(None).await.expect("tags").is_empty());
    assert!(analyzer
        .events()
        .breakdown(Some(&events_only))
        .await
        .expect("events")
        .is_empty());
    assert!(analyzer.sessions().breakdown(None).await.expect("sessions").is_empty());
    assert!(analyzer
        .pages()
        .avg_time_on_page(None, &[])
        .await
        .expect("time on page")
        .is_empty());
    assert!(store.statements().is_empty());
}

#[tokio::test]
async fn default_client_and_sampling_come_from_config() {
    let store = FakeStore::empty();
    let config = QueryConfig {
        default_client_id: 42,
        sample: 10_000,
        ..QueryConfig::default()
    };
    let analyzer = Analyzer::with_config(store.clone(), &config).expect("valid config");

    analyzer.visitors().total(None).await.expect("total");

    let statements = store.statements();
    assert_eq!(statements.len(), 1);
    assert_eq!(statements[0].args.first(), Some(&SqlValue::Int(42)));
    assert!(statements[0].sql.contains("SAMPLE 10000"));
}

#[tokio::test]
async fn time_on_page_is_merged_into_page_rows() {
    let store = FakeStore::responding(|statement| {
        if statement.sql.contains("ROWS BETWEEN") {
            row(&[
                ("path", json!("/pricing")),
                ("average_time_spent_seconds", json!(42)),
            ])
        } else {
            row(&[("path", json!("/pricing")), ("visitors", json!(3))])
        }
    });
    let analyzer = Analyzer::new(store.clone());

    let mut filter = first_week();
    filter.include_time_on_page = true;
    let pages = analyzer.pages().by_path(Some(&filter)).await.expect("pages");

    assert_eq!(pages.len(), 1);
    assert_eq!(pages[0].visitors, 3);
    assert_eq!(pages[0].average_time_spent_seconds, 42);
    let statements = store.statements();
    assert_eq!(statements.len(), 2);
    assert!(statements[1].args.contains(&SqlValue::from("/pricing")));
}

#[tokio::test]
async fn tag_breakdown_labels_rows_with_the_key() {
    let store = FakeStore::responding(|_| {
        row(&[("tag_value", json!("ada")), ("visitors", json!(2))])
    });
    let analyzer = Analyzer::new(store.clone());

    let mut filter = first_week();
    filter.tag = vec!["author".into()];
    let stats = analyzer.tags().breakdown(Some(&filter)).await.expect("tags");

    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].key, "author");
    assert_eq!(stats[0].value, "ada");
}

#[tokio::test]
async fn totals_ignore_dimension_filters() {
    let store = FakeStore::responding(|_| row(&[("visitors", json!(9))]));
    let analyzer = Analyzer::new(store.clone());

    let mut filter = first_week();
    filter.path = vec!["/pricing".into()];
    filter.country = vec!["de".into()];

    assert_eq!(analyzer.visitors().total_visitors(Some(&filter)).await.expect("total"), 9);
    let statements = store.statements();
    assert!(statements[0].sql.contains("FROM `session` `t`"));
    assert!(!statements[0].sql.contains("country_code"));
    assert!(!statements[0].args.contains(&SqlValue::from("/pricing")));
}

#[tokio::test]
async fn active_visitors_look_back_from_now() {
    let store = FakeStore::responding(|statement| {
        if statement.sql.contains("GROUP BY") {
            row(&[
                ("hostname", json!("example.com")),
                ("path", json!("/")),
                ("visitors", json!(4)),
            ])
        } else {
            row(&[("visitors", json!(5))])
        }
    });
    let analyzer = Analyzer::new(store.clone());

    let (stats, total) = analyzer
        .visitors()
        .active(None, chrono::Duration::minutes(10))
        .await
        .expect("active");
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].visitors, 4);
    assert_eq!(total, 5);
    // time of day precision for the look-back window
    assert!(store.statements()[0].sql.contains("`t`.`time` >= toDateTime(?)"));
}

#[tokio::test]
async fn array_options_without_a_range_skip_the_store() {
    let store = FakeStore::empty();
    let analyzer = Analyzer::new(store.clone());
    let options = analyzer.options();

    assert!(options.tag_keys(None).await.expect("tag keys").is_empty());
    assert!(options.tag_values(None).await.expect("tag values").is_empty());
    assert!(options
        .event_metadata_keys(None)
        .await
        .expect("meta keys")
        .is_empty());
    assert!(options
        .event_metadata_values(None)
        .await
        .expect("meta values")
        .is_empty());
    assert!(store.statements().is_empty());
}

#[tokio::test]
async fn attribute_statistics_order_by_visitors_then_attribute() {
    let store = FakeStore::responding(|_| {
        row(&[
            ("utm_campaign", json!("spring")),
            ("visitors", json!(3)),
            ("relative_visitors", json!(0.75)),
        ])
    });
    let analyzer = Analyzer::new(store.clone());

    let campaigns = analyzer.utm().campaign(Some(&first_week())).await.expect("campaigns");
    assert_eq!(campaigns.len(), 1);
    assert_eq!(campaigns[0].value, "spring");
    assert_eq!(campaigns[0].relative_visitors, 0.75);

    let statements = store.statements();
    assert_eq!(statements.len(), 1);
    assert!(statements[0]
        .sql
        .ends_with("ORDER BY `visitors` DESC, `utm_campaign` ASC"));
    assert!(statements[0].sql.contains("FROM `session` `t`"));
}
