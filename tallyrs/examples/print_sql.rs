use std::env;

use tally::{build_query, ClickHouseDialect, Dialect, Field, Filter, QuerySpec};

fn usage() {
    eprintln!("Usage: print_sql <fields> [group_by] [--duckdb]");
    eprintln!("Example: cargo run --example print_sql -- path,visitors,views path");
}

fn parse_fields(list: &str) -> anyhow::Result<Vec<Field>> {
    list.split(',')
        .filter(|name| !name.is_empty())
        .map(|name| Ok(serde_json::from_value(serde_json::Value::from(name))?))
        .collect()
}

#[cfg(feature = "duckdb")]
fn duckdb_dialect() -> anyhow::Result<Box<dyn Dialect>> {
    Ok(Box::new(tally::DuckDbDialect))
}

#[cfg(not(feature = "duckdb"))]
fn duckdb_dialect() -> anyhow::Result<Box<dyn Dialect>> {
    anyhow::bail!("built without the duckdb feature")
}

fn main() -> anyhow::Result<()> {
    let mut args = env::args().skip(1).collect::<Vec<_>>();
    let duckdb = args.iter().any(|a| a == "--duckdb");
    args.retain(|a| a != "--duckdb");
    if args.is_empty() {
        usage();
        std::process::exit(1);
    }

    let fields = parse_fields(&args[0])?;
    let group_by = match args.get(1) {
        Some(list) => parse_fields(list)?,
        None => Vec::new(),
    };

    let mut filter = Filter::new(1);
    filter.validate();
    let spec = QuerySpec::new(&fields)
        .group_by(&group_by)
        .order_by(&group_by);

    let dialect: Box<dyn Dialect> = if duckdb {
        duckdb_dialect()?
    } else {
        Box::new(ClickHouseDialect)
    };

    let statement = build_query(&filter, &spec, dialect.as_ref());
    println!("{}", statement.sql);
    println!("-- args: {:?}", statement.args);
    Ok(())
}
