// Unit-style tests of the analyzer against a fake store that records statements.
mod analyzer_consumers;
mod cancellation;
mod fake_store;
