use std::sync::Arc;

use tally::models::PageStats;
use tally::{
    build_query, open_duckdb, Analyzer, DuckDbDialect, DuckDbStore, Field, Filter, QuerySpec,
    Store, TallyConfig, TallyError,
};

/// Page views of two visitors and the versions of their sessions.
///
/// Visitor 1 enters on `/`, visitor 2 on `/bar`. Each session was updated
/// twice, so only the last of three signed versions is live.
const VISITS: &str = r#"
INSERT INTO page_view (client_id, visitor_id, session_id, "time", path) VALUES
    (0, 1, 0, TIMESTAMP '2024-05-01 00:00:00', '/'),
    (0, 1, 0, TIMESTAMP '2024-05-01 00:02:00', '/foo'),
    (0, 1, 0, TIMESTAMP '2024-05-01 00:02:02', '/foo'),
    (0, 1, 0, TIMESTAMP '2024-05-01 00:02:23', '/bar'),
    (0, 2, 0, TIMESTAMP '2024-05-01 00:00:00', '/bar'),
    (0, 2, 0, TIMESTAMP '2024-05-01 00:00:16', '/foo'),
    (0, 2, 0, TIMESTAMP '2024-05-01 00:00:24', '/');
INSERT INTO "session" (client_id, visitor_id, session_id, "time", sign, entry_path, exit_path, page_views) VALUES
    (0, 1, 0, TIMESTAMP '2024-05-01 00:00:00', 1, '/', '/', 1),
    (0, 2, 0, TIMESTAMP '2024-05-01 00:00:00', 1, '/bar', '/bar', 1),
    (0, 1, 0, TIMESTAMP '2024-05-01 00:00:00', -1, '/', '/', 1),
    (0, 1, 0, TIMESTAMP '2024-05-01 00:02:00', 1, '/', '/foo', 2),
    (0, 2, 0, TIMESTAMP '2024-05-01 00:00:00', -1, '/bar', '/bar', 1),
    (0, 2, 0, TIMESTAMP '2024-05-01 00:00:16', 1, '/bar', '/foo', 2),
    (0, 1, 0, TIMESTAMP '2024-05-01 00:02:00', -1, '/', '/foo', 2),
    (0, 1, 0, TIMESTAMP '2024-05-01 00:02:23', 1, '/', '/bar', 3),
    (0, 2, 0, TIMESTAMP '2024-05-01 00:00:16', -1, '/bar', '/foo', 2),
    (0, 2, 0, TIMESTAMP '2024-05-01 00:00:24', 1, '/bar', '/', 3);
"#;

/// One session whose page views were each followed by the next after `duration_seconds`.
const LONG_SESSION: &str = r#"
INSERT INTO page_view (client_id, visitor_id, session_id, "time", path, duration_seconds) VALUES
    (0, 7, 3, TIMESTAMP '2024-05-02 12:00:00', '/', 0),
    (0, 7, 3, TIMESTAMP '2024-05-02 12:03:00', '/a', 180),
    (0, 7, 3, TIMESTAMP '2024-05-02 12:05:00', '/b', 120),
    (0, 7, 3, TIMESTAMP '2024-05-02 12:15:00', '/c', 600),
    (0, 7, 3, TIMESTAMP '2024-05-02 12:25:00', '/d', 600);
"#;

/// Days 04-29 and earlier were imported. Visitor 3's live session on 04-29
/// duplicates that history and must not be counted next to it.
const IMPORTED: &str = r#"
INSERT INTO page_view (client_id, visitor_id, session_id, "time", path) VALUES
    (0, 3, 0, TIMESTAMP '2024-04-29 10:00:00', '/');
INSERT INTO "session" (client_id, visitor_id, session_id, "time", sign, entry_path, exit_path, page_views) VALUES
    (0, 3, 0, TIMESTAMP '2024-04-29 10:00:00', 1, '/', '/', 1);
INSERT INTO imported_visitors (client_id, "date", visitors, views, sessions) VALUES
    (0, DATE '2024-04-29', 3, 5, 4);
INSERT INTO imported_entry_page (client_id, "date", entry_path, visitors, sessions, entries) VALUES
    (0, DATE '2024-04-29', '/bar', 2, 3, 3),
    (0, DATE '2024-04-29', '/', 1, 1, 1);
INSERT INTO imported_exit_page (client_id, "date", exit_path, visitors, sessions, exits) VALUES
    (0, DATE '2024-04-29', '/', 2, 3, 3),
    (0, DATE '2024-04-29', '/foo', 1, 1, 1);
"#;

/// Four single-page sessions on 2024-05-03 with different devices, locations and campaigns.
const AUDIENCE: &str = r#"
INSERT INTO "session" (client_id, visitor_id, session_id, "time", sign, entry_path, exit_path, page_views, hostname, language, country_code, region, city, browser, browser_version, os, os_version, desktop, mobile, screen_class, utm_source, utm_medium) VALUES
    (0, 11, 1, TIMESTAMP '2024-05-03 09:00:00', 1, '/', '/', 1, 'example.com', 'en', 'gb', 'England', 'London', 'Firefox', '125.0', 'Linux', '', 1, 0, 'XL', 'newsletter', 'email'),
    (0, 12, 1, TIMESTAMP '2024-05-03 10:00:00', 1, '/blog', '/blog', 1, 'example.com', 'en', 'us', 'California', 'San Francisco', 'Chrome', '124.0', 'Android', '14', 0, 1, 'S', 'newsletter', 'email'),
    (0, 13, 1, TIMESTAMP '2024-05-03 11:00:00', 1, '/blog/rust', '/blog/rust', 1, 'blog.example.com', 'de', 'de', 'Bavaria', 'Munich', 'Chrome', '124.0', 'Windows', '10', 1, 0, 'XL', '', ''),
    (0, 14, 1, TIMESTAMP '2024-05-03 12:00:00', 1, '/', '/', 1, 'example.com', '', '', '', '', '', '', '', '', 0, 0, '', 'ads', 'cpc');
INSERT INTO page_view (client_id, visitor_id, session_id, "time", path, tag_keys, tag_values) VALUES
    (0, 11, 1, TIMESTAMP '2024-05-03 09:00:00', '/', ['author'], ['ada']),
    (0, 12, 1, TIMESTAMP '2024-05-03 10:00:00', '/blog', ['author', 'type'], ['grace', 'post']),
    (0, 13, 1, TIMESTAMP '2024-05-03 11:00:00', '/blog/rust', [], []),
    (0, 14, 1, TIMESTAMP '2024-05-03 12:00:00', '/', [], []);
INSERT INTO "event" (client_id, visitor_id, session_id, "time", event_name, event_meta_keys, event_meta_values) VALUES
    (0, 11, 1, TIMESTAMP '2024-05-03 09:00:10', 'signup', ['plan'], ['pro']),
    (0, 12, 1, TIMESTAMP '2024-05-03 10:00:10', 'signup', ['plan', 'trial'], ['free', 'yes']),
    (0, 13, 1, TIMESTAMP '2024-05-03 11:00:10', 'download', ['file'], ['guide.pdf']);
"#;

fn date(month: u32, day: u32) -> chrono::NaiveDate {
    chrono::NaiveDate::from_ymd_opt(2024, month, day).expect("date")
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

async fn seeded(fixtures: &str) -> anyhow::Result<(Arc<DuckDbStore>, Analyzer)> {
    let store = DuckDbStore::open_in_memory()?;
    store.create_schema().await?;
    store.execute_batch(fixtures).await?;
    let store = Arc::new(store);
    let analyzer = Analyzer::new(store.clone());
    Ok((store, analyzer))
}

async fn visitors_per_path(
    store: &DuckDbStore,
    analyzer: &Analyzer,
    filter: Option<&Filter>,
    order_by: &[Field],
) -> anyhow::Result<Vec<(String, i64)>> {
    let filter = analyzer.get_filter(filter);
    let spec = QuerySpec::new(&[Field::Path, Field::Visitors])
        .group_by(&[Field::Path])
        .order_by(order_by);
    let statement = build_query(&filter, &spec, &DuckDbDialect);
    let rows: Vec<PageStats> = store.query(&statement).await?.decode()?;
    Ok(rows.into_iter().map(|r| (r.path, r.visitors)).collect())
}

#[tokio::test]
async fn counts_visitors_per_path() -> anyhow::Result<()> {
    let (store, analyzer) = seeded(VISITS).await?;
    let stats = visitors_per_path(&store, &analyzer, None, &[Field::Visitors, Field::Path]).await?;
    assert_eq!(
        stats,
        vec![
            ("/".to_string(), 2),
            ("/bar".to_string(), 2),
            ("/foo".to_string(), 2)
        ]
    );
    Ok(())
}

#[tokio::test]
async fn entry_path_restricts_to_matching_sessions() -> anyhow::Result<()> {
    let (store, analyzer) = seeded(VISITS).await?;
    let filter = Filter {
        entry_path: vec!["/".into()],
        ..Filter::default()
    };
    let stats = visitors_per_path(&store, &analyzer, Some(&filter), &[Field::Path]).await?;
    assert_eq!(
        stats,
        vec![
            ("/".to_string(), 1),
            ("/bar".to_string(), 1),
            ("/foo".to_string(), 1)
        ]
    );
    Ok(())
}

#[tokio::test]
async fn path_and_entry_path_combine() -> anyhow::Result<()> {
    let (store, analyzer) = seeded(VISITS).await?;
    let filter = Filter {
        path: vec!["/foo".into()],
        entry_path: vec!["/".into()],
        ..Filter::default()
    };
    let stats = visitors_per_path(&store, &analyzer, Some(&filter), &[Field::Path]).await?;
    assert_eq!(stats, vec![("/foo".to_string(), 1)]);
    Ok(())
}

#[tokio::test]
async fn totals_collapse_session_versions() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(VISITS).await?;
    let total = analyzer.visitors().total(None).await?;
    assert_eq!(total.visitors, 2);
    assert_eq!(total.views, 6);
    assert_eq!(total.sessions, 2);
    assert_eq!(total.bounces, 0);
    Ok(())
}

#[tokio::test]
async fn entry_pages_count_live_sessions() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(VISITS).await?;
    let entries = analyzer.pages().entry(None).await?;
    let mut paths: Vec<(String, i64)> = entries.into_iter().map(|e| (e.path, e.entries)).collect();
    paths.sort();
    assert_eq!(paths, vec![("/".to_string(), 1), ("/bar".to_string(), 1)]);
    Ok(())
}

#[tokio::test]
async fn time_on_page_is_capped_before_summing() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(LONG_SESSION).await?;
    let filter = Filter {
        max_time_on_page_seconds: 200,
        ..Filter::default()
    };
    let filter = analyzer.get_filter(Some(&filter));
    assert_eq!(analyzer.visitors().total_time_on_page(&filter).await?, 700);

    let uncapped = analyzer.get_filter(None);
    assert_eq!(
        analyzer.visitors().total_time_on_page(&uncapped).await?,
        180 + 120 + 600 + 600
    );
    Ok(())
}

#[tokio::test]
async fn average_time_on_requested_paths() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(LONG_SESSION).await?;
    let filter = Filter {
        max_time_on_page_seconds: 200,
        ..Filter::default()
    };
    let paths = vec!["/".to_string(), "/b".to_string(), "/d".to_string()];
    let mut stats = analyzer
        .pages()
        .avg_time_on_page(Some(&filter), &paths)
        .await?;
    stats.sort_by(|a, b| a.path.cmp(&b.path));

    // the last page of a session has no time on page
    let times: Vec<(&str, i64)> = stats
        .iter()
        .map(|s| (s.path.as_str(), s.average_time_spent_seconds))
        .collect();
    assert_eq!(times, vec![("/", 180), ("/b", 200)]);
    Ok(())
}

#[tokio::test]
async fn session_breakdown_lists_page_views_in_order() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(LONG_SESSION).await?;
    let filter = Filter {
        visitor_id: 7,
        session_id: 3,
        ..Filter::default()
    };
    let steps = analyzer.sessions().breakdown(Some(&filter)).await?;
    assert_eq!(steps.len(), 5);
    assert!(steps.windows(2).all(|w| w[0].time() <= w[1].time()));
    Ok(())
}

#[tokio::test]
async fn cancelled_queries_return_cancelled() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(VISITS).await?;
    let (ctx, handle) = tally::QueryContext::cancellable();
    handle.cancel();
    let filter = Filter::default().with_context(ctx);
    let err = analyzer
        .visitors()
        .total(Some(&filter))
        .await
        .expect_err("cancelled");
    assert!(matches!(err, TallyError::Cancelled));
    Ok(())
}

#[tokio::test]
async fn open_duckdb_creates_the_schema() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let analyzer = open_duckdb(dir.path().join("stats.duckdb"), &TallyConfig::default()).await?;
    let total = analyzer.visitors().total(None).await?;
    assert_eq!(total.visitors, 0);
    assert!(analyzer.events().events(None).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn buckets_visitors_by_day_month_and_hour() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(VISITS).await?;
    let days = analyzer.visitors().by_period(None).await?;
    assert_eq!(days.len(), 1);
    assert_eq!(days[0].day, chrono::NaiveDate::from_ymd_opt(2024, 5, 1));
    assert_eq!(days[0].visitors, 2);

    let filter = Filter {
        period: tally::Period::Month,
        ..Filter::default()
    };
    let months = analyzer.visitors().by_period(Some(&filter)).await?;
    assert_eq!(months.len(), 1);
    assert_eq!(months[0].day, None);
    assert_eq!(months[0].month, chrono::NaiveDate::from_ymd_opt(2024, 5, 1));

    let hours = analyzer.visitors().by_hour(None).await?;
    assert_eq!(hours.len(), 1);
    assert_eq!((hours[0].hour, hours[0].visitors), (0, 2));
    Ok(())
}

#[tokio::test]
async fn entry_and_exit_pages_report_path_totals() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(VISITS).await?;

    let exits = analyzer.pages().exit(None).await?;
    let exits: Vec<(&str, i64, i64, i64)> = exits
        .iter()
        .map(|e| (e.path.as_str(), e.visitors, e.sessions, e.exits))
        .collect();
    assert_eq!(exits, vec![("/", 2, 2, 1), ("/bar", 2, 2, 1)]);

    let entries = analyzer.pages().entry(None).await?;
    assert_eq!(entries.len(), 2);
    for entry in &entries {
        assert_eq!((entry.visitors, entry.sessions, entry.entries), (2, 2, 1));
        assert_close(entry.entry_rate, 0.5);
    }

    // totals ignore the entry path that narrows the entries
    let filter = Filter {
        entry_path: vec!["/".into()],
        ..Filter::default()
    };
    let entries = analyzer.pages().entry(Some(&filter)).await?;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].path, "/");
    assert_eq!((entries[0].visitors, entries[0].entries), (2, 1));
    Ok(())
}

#[tokio::test]
async fn totals_of_an_empty_range_are_zero() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(VISITS).await?;
    let filter = Filter::new(0).with_range(date(6, 1), date(6, 2));

    let total = analyzer.visitors().total(Some(&filter)).await?;
    assert_eq!(total.visitors, 0);
    assert_eq!(total.views, 0);
    assert_eq!(total.bounces, 0);
    assert_close(total.bounce_rate, 0.0);

    assert!(analyzer.pages().by_path(Some(&filter)).await?.is_empty());
    assert!(analyzer.pages().entry(Some(&filter)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn imported_entry_and_exit_pages_merge_with_live_rows() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(&format!("{VISITS}{IMPORTED}")).await?;
    let filter = Filter {
        imported_until: Some(date(4, 30).and_hms_opt(0, 0, 0).expect("time")),
        ..Filter::new(0).with_range(date(4, 29), date(5, 1))
    };

    // live sessions from 04-30 on plus four imported ones
    let entries = analyzer.pages().entry(Some(&filter)).await?;
    let merged: Vec<(&str, i64)> = entries.iter().map(|e| (e.path.as_str(), e.entries)).collect();
    assert_eq!(merged, vec![("/bar", 4), ("/", 2)]);
    assert_close(entries[0].entry_rate, 4.0 / 6.0);
    assert_close(entries[1].entry_rate, 2.0 / 6.0);

    let exits = analyzer.pages().exit(Some(&filter)).await?;
    let merged: Vec<(&str, i64)> = exits.iter().map(|e| (e.path.as_str(), e.exits)).collect();
    assert_eq!(merged, vec![("/", 4), ("/bar", 1), ("/foo", 1)]);
    assert_close(exits[0].exit_rate, 4.0 / 6.0);
    assert_close(exits[2].exit_rate, 1.0 / 6.0);
    Ok(())
}

#[tokio::test]
async fn imported_rows_are_skipped_when_the_filter_cannot_apply() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(&format!("{VISITS}{IMPORTED}")).await?;
    let filter = Filter {
        imported_until: Some(date(4, 30).and_hms_opt(0, 0, 0).expect("time")),
        language: vec!["!fr".into()],
        ..Filter::new(0).with_range(date(4, 29), date(5, 1))
    };

    // imported tables have no language, and the live rows still start at 04-30
    let entries = analyzer.pages().entry(Some(&filter)).await?;
    let live: Vec<(&str, i64)> = entries.iter().map(|e| (e.path.as_str(), e.entries)).collect();
    assert_eq!(live, vec![("/", 1), ("/bar", 1)]);
    for entry in &entries {
        assert_close(entry.entry_rate, 0.5);
    }
    Ok(())
}

#[tokio::test]
async fn demographics_group_visitors_by_location() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(AUDIENCE).await?;
    let demographics = analyzer.demographics();

    let languages = demographics.languages(None).await?;
    let languages: Vec<(&str, i64)> = languages
        .iter()
        .map(|l| (l.language.as_str(), l.visitors))
        .collect();
    assert_eq!(languages, vec![("en", 2), ("", 1), ("de", 1)]);

    let countries = demographics.countries(None).await?;
    assert_eq!(countries.len(), 4);
    assert_eq!(countries[1].country_code, "de");
    assert_close(countries[1].relative_visitors, 0.25);

    let regions = demographics.regions(None).await?;
    assert_eq!(
        (regions[2].country_code.as_str(), regions[2].region.as_str()),
        ("gb", "England")
    );

    let cities = demographics.cities(None).await?;
    let cities: Vec<&str> = cities.iter().map(|c| c.city.as_str()).collect();
    assert_eq!(cities, vec!["", "Munich", "London", "San Francisco"]);
    Ok(())
}

#[tokio::test]
async fn device_statistics_group_visitors_by_client() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(AUDIENCE).await?;
    let device = analyzer.device();

    let platforms = device.platform(None).await?;
    let platforms: Vec<(&str, i64)> = platforms
        .iter()
        .map(|p| (p.platform.as_str(), p.visitors))
        .collect();
    assert_eq!(platforms, vec![("desktop", 2), ("mobile", 1), ("unknown", 1)]);

    let browsers = device.browser(None).await?;
    assert_eq!(browsers[0].browser, "Chrome");
    assert_eq!(browsers[0].visitors, 2);
    assert_close(browsers[0].relative_visitors, 0.5);

    let versions = device.os_version(None).await?;
    let versions: Vec<(&str, &str)> = versions
        .iter()
        .map(|v| (v.os.as_str(), v.os_version.as_str()))
        .collect();
    assert_eq!(
        versions,
        vec![("", ""), ("Android", "14"), ("Linux", ""), ("Windows", "10")]
    );

    let screens = device.screen_class(None).await?;
    assert_eq!((screens[0].screen_class.as_str(), screens[0].visitors), ("XL", 2));
    Ok(())
}

#[tokio::test]
async fn utm_statistics_group_visitors_by_parameter() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(AUDIENCE).await?;
    let sources = analyzer.utm().source(None).await?;
    let sources: Vec<(&str, i64)> = sources.iter().map(|s| (s.value.as_str(), s.visitors)).collect();
    assert_eq!(sources, vec![("newsletter", 2), ("", 1), ("ads", 1)]);

    let filter = Filter {
        country: vec!["us".into()],
        ..Filter::default()
    };
    let mediums = analyzer.utm().medium(Some(&filter)).await?;
    assert_eq!(mediums.len(), 1);
    assert_eq!((mediums[0].value.as_str(), mediums[0].visitors), ("email", 1));
    Ok(())
}

#[tokio::test]
async fn filter_options_list_distinct_values() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(AUDIENCE).await?;
    let options = analyzer.options();

    assert_eq!(options.languages(None).await?, vec!["de", "en"]);
    assert_eq!(options.countries(None).await?, vec!["de", "gb", "us"]);
    assert_eq!(options.utm_sources(None).await?, vec!["ads", "newsletter"]);
    assert_eq!(options.event_names(None).await?, vec!["download", "signup"]);
    assert_eq!(
        options.hostnames(None).await?,
        vec!["blog.example.com", "example.com"]
    );
    assert_eq!(options.pages(None).await?, vec!["/", "/blog", "/blog/rust"]);

    let search = Filter {
        search: vec![tally::Search {
            field: Field::Path,
            input: "blog".into(),
        }],
        ..Filter::default()
    };
    assert_eq!(options.pages(Some(&search)).await?, vec!["/blog", "/blog/rust"]);

    let other_day = Filter::new(0).with_range(date(5, 4), date(5, 5));
    assert!(options.languages(Some(&other_day)).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn array_options_need_a_range_or_a_key() -> anyhow::Result<()> {
    let (_store, analyzer) = seeded(AUDIENCE).await?;
    let options = analyzer.options();
    let day = Filter::new(0).with_range(date(5, 3), date(5, 3));

    assert!(options.event_metadata_keys(None).await?.is_empty());
    assert_eq!(
        options.event_metadata_keys(Some(&day)).await?,
        vec!["file", "plan", "trial"]
    );
    let signups = Filter {
        event_name: vec!["signup".into()],
        ..Filter::default()
    };
    assert_eq!(
        options.event_metadata_keys(Some(&signups)).await?,
        vec!["plan", "trial"]
    );
    let plan = Filter {
        event_meta_key: vec!["plan".into()],
        ..Filter::default()
    };
    assert_eq!(
        options.event_metadata_values(Some(&plan)).await?,
        vec!["free", "pro"]
    );

    assert!(options.tag_keys(None).await?.is_empty());
    assert_eq!(options.tag_keys(Some(&day)).await?, vec!["author", "type"]);
    assert!(options.tag_values(None).await?.is_empty());
    let author = Filter {
        tag: vec!["author".into()],
        ..Filter::default()
    };
    assert_eq!(options.tag_values(Some(&author)).await?, vec!["ada", "grace"]);
    Ok(())
}
