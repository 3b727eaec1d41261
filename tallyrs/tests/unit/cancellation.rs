use std::time::Duration;

use tally::{Analyzer, Filter, QueryContext, TallyError};

use crate::fake_store::FakeStore;

#[tokio::test]
async fn cancelled_context_fails_before_the_store_answers() {
    let store = FakeStore::empty();
    let analyzer = Analyzer::new(store);
    let (ctx, handle) = QueryContext::cancellable();
    handle.cancel();

    let filter = Filter::new(1).with_context(ctx);
    let err = analyzer
        .pages()
        .by_path(Some(&filter))
        .await
        .expect_err("cancelled");
    assert!(matches!(err, TallyError::Cancelled));
}

#[tokio::test]
async fn cancelling_interrupts_a_running_query() {
    let analyzer = Analyzer::new(FakeStore::slow(Duration::from_secs(30)));
    let (ctx, handle) = QueryContext::cancellable();
    let filter = Filter::new(1).with_context(ctx);

    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.cancel();
    });
    let err = analyzer
        .visitors()
        .total(Some(&filter))
        .await
        .expect_err("cancelled");
    canceller.await.expect("join");
    assert!(matches!(err, TallyError::Cancelled));
}

#[tokio::test]
async fn slow_queries_time_out() {
    let analyzer = Analyzer::new(FakeStore::slow(Duration::from_secs(30)));
    let filter = Filter::new(1).with_context(QueryContext::default().with_timeout(Duration::from_millis(20)));

    let err = analyzer
        .events()
        .events(Some(&filter))
        .await
        .expect_err("timeout");
    assert!(matches!(err, TallyError::Timeout(limit) if limit == Duration::from_millis(20)));
}

#[tokio::test]
async fn one_failing_branch_fails_the_whole_comparison() {
    let analyzer = Analyzer::new(FakeStore::slow(Duration::from_secs(30)));
    let mut filter = Filter::new(1).with_range(
        chrono::NaiveDate::from_ymd_opt(2024, 5, 1).expect("date"),
        chrono::NaiveDate::from_ymd_opt(2024, 5, 7).expect("date"),
    );
    filter.ctx = QueryContext::default().with_timeout(Duration::from_millis(20));

    let err = analyzer
        .visitors()
        .total_visitors_page_views(Some(&filter))
        .await
        .expect_err("timeout");
    assert!(matches!(err, TallyError::Timeout(_)));
}
