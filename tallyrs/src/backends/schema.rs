//! Tables the generated SQL reads.
//!
//! `session` is sign-versioned: a change to a session is a row with sign -1
//! cancelling the previous version plus a row with sign 1 for the new one.
//! The imported tables hold daily aggregates from a previous analytics system.

/// DuckDB DDL for every table, in creation order.
pub const DUCKDB_TABLES: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS "session" (
    client_id BIGINT NOT NULL DEFAULT 0,
    visitor_id UBIGINT NOT NULL,
    session_id UINTEGER NOT NULL,
    "time" TIMESTAMP NOT NULL,
    "start" TIMESTAMP,
    sign TINYINT NOT NULL DEFAULT 1,
    duration_seconds INTEGER NOT NULL DEFAULT 0,
    hostname VARCHAR NOT NULL DEFAULT '',
    entry_path VARCHAR NOT NULL DEFAULT '',
    entry_title VARCHAR NOT NULL DEFAULT '',
    exit_path VARCHAR NOT NULL DEFAULT '',
    exit_title VARCHAR NOT NULL DEFAULT '',
    page_views INTEGER NOT NULL DEFAULT 0,
    is_bounce TINYINT NOT NULL DEFAULT 0,
    language VARCHAR NOT NULL DEFAULT '',
    country_code VARCHAR NOT NULL DEFAULT '',
    region VARCHAR NOT NULL DEFAULT '',
    city VARCHAR NOT NULL DEFAULT '',
    referrer VARCHAR NOT NULL DEFAULT '',
    referrer_name VARCHAR NOT NULL DEFAULT '',
    referrer_icon VARCHAR NOT NULL DEFAULT '',
    channel VARCHAR NOT NULL DEFAULT '',
    os VARCHAR NOT NULL DEFAULT '',
    os_version VARCHAR NOT NULL DEFAULT '',
    browser VARCHAR NOT NULL DEFAULT '',
    browser_version VARCHAR NOT NULL DEFAULT '',
    desktop TINYINT NOT NULL DEFAULT 0,
    mobile TINYINT NOT NULL DEFAULT 0,
    screen_class VARCHAR NOT NULL DEFAULT '',
    utm_source VARCHAR NOT NULL DEFAULT '',
    utm_medium VARCHAR NOT NULL DEFAULT '',
    utm_campaign VARCHAR NOT NULL DEFAULT '',
    utm_content VARCHAR NOT NULL DEFAULT '',
    utm_term VARCHAR NOT NULL DEFAULT ''
)"#,
    r#"CREATE TABLE IF NOT EXISTS page_view (
    client_id BIGINT NOT NULL DEFAULT 0,
    visitor_id UBIGINT NOT NULL,
    session_id UINTEGER NOT NULL,
    "time" TIMESTAMP NOT NULL,
    duration_seconds INTEGER NOT NULL DEFAULT 0,
    hostname VARCHAR NOT NULL DEFAULT '',
    path VARCHAR NOT NULL DEFAULT '',
    title VARCHAR NOT NULL DEFAULT '',
    language VARCHAR NOT NULL DEFAULT '',
    country_code VARCHAR NOT NULL DEFAULT '',
    region VARCHAR NOT NULL DEFAULT '',
    city VARCHAR NOT NULL DEFAULT '',
    referrer VARCHAR NOT NULL DEFAULT '',
    referrer_name VARCHAR NOT NULL DEFAULT '',
    referrer_icon VARCHAR NOT NULL DEFAULT '',
    channel VARCHAR NOT NULL DEFAULT '',
    os VARCHAR NOT NULL DEFAULT '',
    os_version VARCHAR NOT NULL DEFAULT '',
    browser VARCHAR NOT NULL DEFAULT '',
    browser_version VARCHAR NOT NULL DEFAULT '',
    desktop TINYINT NOT NULL DEFAULT 0,
    mobile TINYINT NOT NULL DEFAULT 0,
    screen_class VARCHAR NOT NULL DEFAULT '',
    utm_source VARCHAR NOT NULL DEFAULT '',
    utm_medium VARCHAR NOT NULL DEFAULT '',
    utm_campaign VARCHAR NOT NULL DEFAULT '',
    utm_content VARCHAR NOT NULL DEFAULT '',
    utm_term VARCHAR NOT NULL DEFAULT '',
    tag_keys VARCHAR[] NOT NULL DEFAULT [],
    tag_values VARCHAR[] NOT NULL DEFAULT []
)"#,
    r#"CREATE TABLE IF NOT EXISTS "event" (
    client_id BIGINT NOT NULL DEFAULT 0,
    visitor_id UBIGINT NOT NULL,
    session_id UINTEGER NOT NULL,
    "time" TIMESTAMP NOT NULL,
    event_name VARCHAR NOT NULL,
    event_meta_keys VARCHAR[] NOT NULL DEFAULT [],
    event_meta_values VARCHAR[] NOT NULL DEFAULT [],
    duration_seconds INTEGER NOT NULL DEFAULT 0,
    hostname VARCHAR NOT NULL DEFAULT '',
    path VARCHAR NOT NULL DEFAULT '',
    title VARCHAR NOT NULL DEFAULT '',
    language VARCHAR NOT NULL DEFAULT '',
    country_code VARCHAR NOT NULL DEFAULT '',
    region VARCHAR NOT NULL DEFAULT '',
    city VARCHAR NOT NULL DEFAULT '',
    referrer VARCHAR NOT NULL DEFAULT '',
    referrer_name VARCHAR NOT NULL DEFAULT '',
    referrer_icon VARCHAR NOT NULL DEFAULT '',
    channel VARCHAR NOT NULL DEFAULT '',
    os VARCHAR NOT NULL DEFAULT '',
    os_version VARCHAR NOT NULL DEFAULT '',
    browser VARCHAR NOT NULL DEFAULT '',
    browser_version VARCHAR NOT NULL DEFAULT '',
    desktop TINYINT NOT NULL DEFAULT 0,
    mobile TINYINT NOT NULL DEFAULT 0,
    screen_class VARCHAR NOT NULL DEFAULT '',
    utm_source VARCHAR NOT NULL DEFAULT '',
    utm_medium VARCHAR NOT NULL DEFAULT '',
    utm_campaign VARCHAR NOT NULL DEFAULT '',
    utm_content VARCHAR NOT NULL DEFAULT '',
    utm_term VARCHAR NOT NULL DEFAULT ''
)"#,
    r#"CREATE TABLE IF NOT EXISTS imported_visitors (
    client_id BIGINT NOT NULL DEFAULT 0,
    "date" DATE NOT NULL,
    visitors INTEGER NOT NULL DEFAULT 0,
    views INTEGER NOT NULL DEFAULT 0,
    sessions INTEGER NOT NULL DEFAULT 0,
    bounces INTEGER NOT NULL DEFAULT 0,
    session_duration INTEGER NOT NULL DEFAULT 0
)"#,
    r#"CREATE TABLE IF NOT EXISTS imported_page (
    client_id BIGINT NOT NULL DEFAULT 0,
    "date" DATE NOT NULL,
    path VARCHAR NOT NULL,
    visitors INTEGER NOT NULL DEFAULT 0,
    views INTEGER NOT NULL DEFAULT 0,
    sessions INTEGER NOT NULL DEFAULT 0,
    bounces INTEGER NOT NULL DEFAULT 0
)"#,
    r#"CREATE TABLE IF NOT EXISTS imported_entry_page (
    client_id BIGINT NOT NULL DEFAULT 0,
    "date" DATE NOT NULL,
    entry_path VARCHAR NOT NULL,
    visitors INTEGER NOT NULL DEFAULT 0,
    sessions INTEGER NOT NULL DEFAULT 0,
    entries INTEGER NOT NULL DEFAULT 0
)"#,
    r#"CREATE TABLE IF NOT EXISTS imported_exit_page (
    client_id BIGINT NOT NULL DEFAULT 0,
    "date" DATE NOT NULL,
    exit_path VARCHAR NOT NULL,
    visitors INTEGER NOT NULL DEFAULT 0,
    sessions INTEGER NOT NULL DEFAULT 0,
    exits INTEGER NOT NULL DEFAULT 0
)"#,
    r#"CREATE TABLE IF NOT EXISTS imported_referrer (
    client_id BIGINT NOT NULL DEFAULT 0,
    "date" DATE NOT NULL,
    referrer VARCHAR NOT NULL,
    visitors INTEGER NOT NULL DEFAULT 0,
    sessions INTEGER NOT NULL DEFAULT 0,
    bounces INTEGER NOT NULL DEFAULT 0
)"#,
];
