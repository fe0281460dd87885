//! Tests for memoizing functions that return `Result`

use std::cell::Cell;

use memora::{cache, registry, MemoError};

thread_local! {
    static LOAD_CALLS: Cell<u32> = const { Cell::new(0) };
}

#[derive(Debug, Clone, PartialEq)]
enum LoadError {
    NotFound(u32),
    Key(MemoError),
}

impl From<MemoError> for LoadError {
    fn from(err: MemoError) -> Self {
        LoadError::Key(err)
    }
}

#[cache(stats = true)]
fn load(id: u32) -> Result<String, LoadError> {
    LOAD_CALLS.with(|c| c.set(c.get() + 1));
    if id == 0 {
        return Err(LoadError::NotFound(id));
    }
    Ok(format!("record-{}", id))
}

#[cache]
fn checked_ratio(numerator: f64, denominator: f64) -> Result<f64, LoadError> {
    Ok(numerator / denominator)
}

#[cache(capacity = 1, stats = true, name = "parse_port")]
fn parse_port(text: &str) -> Result<u16, LoadError> {
    text.parse().map_err(|_| LoadError::NotFound(0))
}

#[test]
fn test_ok_values_are_cached() {
    assert_eq!(load(1), Ok("record-1".to_string()));
    assert_eq!(load(1), Ok("record-1".to_string()));

    assert_eq!(LOAD_CALLS.with(Cell::get), 1);
    let info = registry::info("load").unwrap();
    assert_eq!(info.hits, Some(1));
    assert_eq!(info.len, 1);
}

#[test]
fn test_errors_are_not_cached() {
    assert_eq!(load(0), Err(LoadError::NotFound(0)));
    assert_eq!(load(0), Err(LoadError::NotFound(0)));

    assert_eq!(LOAD_CALLS.with(Cell::get), 2);
    let info = registry::info("load").unwrap();
    assert_eq!(info.hits, Some(0));
    assert_eq!(info.misses, Some(2));
    assert_eq!(info.len, 0);
}

#[test]
fn test_unhashable_argument_is_returned_as_error() {
    match checked_ratio(1.0, f64::NAN) {
        Err(LoadError::Key(MemoError::UnhashableArgument { argument, .. })) => {
            assert_eq!(argument, "#1");
        }
        other => panic!("unexpected result: {:?}", other),
    }

    assert_eq!(checked_ratio(1.0, 4.0), Ok(0.25));
    assert_eq!(registry::info("checked_ratio").unwrap().len, 1);
}

#[test]
fn test_result_with_bounded_cache() {
    assert_eq!(parse_port("8080"), Ok(8080));
    assert!(parse_port("http").is_err());
    assert_eq!(parse_port("8080"), Ok(8080));
    assert_eq!(parse_port("443"), Ok(443));

    let info = registry::info("parse_port").unwrap();
    assert_eq!(info.hits, Some(1));
    assert_eq!(info.misses, Some(3));
    assert_eq!(info.len, 1);
}
