//! Tests for the runtime decorator API

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;

use memora::{
    cache, cache_with, CacheConfig, CacheKey, CacheOptions, Callable, CallableKind, Capacity,
    ClassRef, Decorator, FnMeta, MemoError, WrappedCallable,
};

#[test]
fn test_cache_with_default_options() {
    let decorator = cache_with(CacheOptions::new()).unwrap();
    assert_eq!(decorator.capacity(), Capacity::Unbounded);
    assert!(!decorator.config().track_stats);
}

#[test]
fn test_invalid_configuration_is_rejected() {
    let err = cache_with(CacheOptions::new().bounded(0).track_stats(true)).unwrap_err();
    assert!(matches!(err, MemoError::InvalidConfiguration(_)));
    assert!(err.is_configuration_error());

    let err = "-3".parse::<Capacity>().unwrap_err();
    assert!(err.to_string().starts_with("invalid configuration"));
}

#[test]
fn test_capacity_from_text() {
    let config = CacheConfig {
        capacity: "unbounded".parse().unwrap(),
        track_stats: true,
    };
    let decorator = cache_with(CacheOptions::from_config(config)).unwrap();
    assert_eq!(decorator.capacity(), Capacity::Unbounded);

    let bounded: Capacity = "64".parse().unwrap();
    assert_eq!(bounded, Capacity::Bounded(64));
}

#[test]
fn test_lru_scenario() {
    let decorator = cache_with(CacheOptions::new().bounded(2).track_stats(true)).unwrap();
    let square = decorator.apply(|x: &(u64,)| x.0 * x.0);

    for x in [1, 1, 2, 2, 3] {
        square.call((x,)).unwrap();
    }

    let cache = square.cache().unwrap();
    assert_eq!(cache.hits(), Some(2));
    assert_eq!(cache.misses(), Some(3));

    let expected: HashMap<CacheKey, u64> = HashMap::from([
        (CacheKey::of(&(2u64,)).unwrap(), 4),
        (CacheKey::of(&(3u64,)).unwrap(), 9),
    ]);
    assert_eq!(*cache, expected);
}

#[test]
fn test_lru_scenario_with_two_arguments() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let decorator = cache_with(CacheOptions::new().bounded(2).track_stats(true)).unwrap();
    let add = decorator.apply(move |args: &(u32, u32)| {
        counter.set(counter.get() + 1);
        args.0 + args.1
    });

    for (a, b) in [(1, 2), (1, 2), (2, 2), (2, 2), (5, 5)] {
        add.call((a, b)).unwrap();
    }
    assert_eq!(calls.get(), 3);

    {
        let cache = add.cache().unwrap();
        assert_eq!(cache.hits(), Some(2));
        assert_eq!(cache.misses(), Some(3));

        let expected: HashMap<CacheKey, u32> = HashMap::from([
            (CacheKey::of(&(2u32, 2u32)).unwrap(), 4),
            (CacheKey::of(&(5u32, 5u32)).unwrap(), 10),
        ]);
        assert_eq!(*cache, expected);
    }

    // (1, 2) was evicted and is computed again
    assert_eq!(add.call((1, 2)).unwrap(), 3);
    assert_eq!(calls.get(), 4);
    assert_eq!(add.cache().unwrap().misses(), Some(4));
}

#[test]
fn test_custom_key_function() {
    let decorator = cache_with(
        CacheOptions::new()
            .track_stats(true)
            .key_fn(|args: &(u64, u64)| args.0),
    )
    .unwrap();
    let product = decorator.apply(|args: &(u64, u64)| args.0 * args.1);

    assert_eq!(product.call((3, 100_000)).unwrap(), 300_000);
    for y in 0..9 {
        assert_eq!(product.call((3, y)).unwrap(), 300_000);
    }

    let cache = product.cache().unwrap();
    assert_eq!(cache.hits(), Some(9));
    assert_eq!(cache.misses(), Some(1));
    assert_eq!(*cache, HashMap::from([(3u64, 300_000u64)]));
}

#[test]
fn test_disabled_cache_forwards_every_call() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let decorator = cache_with(CacheOptions::new().bounded(0)).unwrap();
    let double = decorator.apply(move |x: &(u32,)| {
        counter.set(counter.get() + 1);
        x.0 * 2
    });

    for _ in 0..3 {
        assert_eq!(double.call((4,)).unwrap(), 8);
    }
    assert_eq!(calls.get(), 3);
    assert!(!double.is_caching());
    assert!(double.cache().is_none());
    assert!(double.info().is_none());
}

#[test]
fn test_stats_untracked_by_default() {
    let shout = cache(|s: &(String,)| s.0.to_uppercase());
    shout.call(("hey".to_string(),)).unwrap();
    shout.call(("hey".to_string(),)).unwrap();

    let info = shout.info().unwrap();
    assert_eq!(info.hits, None);
    assert_eq!(info.misses, None);
    assert_eq!(info.len, 1);
}

#[test]
fn test_only_ok_results_are_cached() {
    let calls = Rc::new(Cell::new(0));
    let counter = Rc::clone(&calls);
    let parse = Decorator::default().apply_fallible(move |s: &(String,)| {
        counter.set(counter.get() + 1);
        s.0.parse::<i64>()
            .map_err(|e| MemoError::InvalidConfiguration(e.to_string()))
    });

    assert!(parse.call(("x".to_string(),)).is_err());
    assert!(parse.call(("x".to_string(),)).is_err());
    assert_eq!(parse.call(("42".to_string(),)).unwrap(), 42);
    assert_eq!(parse.call(("42".to_string(),)).unwrap(), 42);

    assert_eq!(calls.get(), 3);
    assert_eq!(parse.cache().unwrap().len(), 1);
}

#[test]
fn test_unhashable_argument_fails_only_that_call() {
    let half = cache(|x: &(f64,)| x.0 / 2.0);
    let err = half.call((f64::NAN,)).unwrap_err();
    assert!(matches!(err, MemoError::UnhashableArgument { .. }));

    assert_eq!(half.call((3.0,)).unwrap(), 1.5);
    assert_eq!(half.cache().unwrap().len(), 1);
}

#[test]
fn test_wrappers_do_not_share_stores() {
    let decorator = cache_with(CacheOptions::new().track_stats(true)).unwrap();
    let inc = decorator.apply(|x: &(i32,)| x.0 + 1);
    let dec = decorator.apply(|x: &(i32,)| x.0 - 1);

    assert_eq!(inc.call((10,)).unwrap(), 11);
    assert_eq!(dec.call((10,)).unwrap(), 9);
    assert_eq!(inc.cache().unwrap().misses(), Some(1));
    assert_eq!(dec.cache().unwrap().misses(), Some(1));
}

#[test]
fn test_recursive_memoized_closure() {
    use std::cell::RefCell;

    type Fib = memora::Memoized<(u32,), u64>;

    let calls = Rc::new(Cell::new(0));
    let slot: Rc<RefCell<Option<Fib>>> = Rc::new(RefCell::new(None));
    let inner = Rc::clone(&slot);
    let counter = Rc::clone(&calls);

    let fib: Fib = cache(move |n: &(u32,)| {
        counter.set(counter.get() + 1);
        if n.0 < 2 {
            return n.0 as u64;
        }
        let guard = inner.borrow();
        let this = guard.as_ref().unwrap();
        this.call((n.0 - 1,)).unwrap() + this.call((n.0 - 2,)).unwrap()
    });
    *slot.borrow_mut() = Some(fib);

    let guard = slot.borrow();
    let fib = guard.as_ref().unwrap();
    assert_eq!(fib.call((30,)).unwrap(), 832_040);
    assert_eq!(calls.get(), 31);
}

struct Celsius;
struct Kelvin;

#[test]
fn test_class_bound_wrapper() {
    let decorator = cache_with(CacheOptions::new().track_stats(true)).unwrap();
    let unit = decorator.class_bound(|class: &ClassRef, args: &(i32,)| {
        Ok::<_, MemoError>(format!("{} {}", args.0, class.name().rsplit("::").next().unwrap_or("")))
    });

    assert_eq!(unit.call::<Celsius>((20,)).unwrap(), "20 Celsius");
    assert_eq!(unit.call::<Kelvin>((20,)).unwrap(), "20 Kelvin");
    assert_eq!(unit.call_on(&Celsius, (20,)).unwrap(), "20 Celsius");

    let info = unit.info().unwrap();
    assert_eq!((info.hits, info.misses, info.len), (Some(1), Some(2), 2));
}

#[test]
fn test_instance_independent_wrapper() {
    let decorator = cache_with(CacheOptions::new().track_stats(true)).unwrap();
    let area = decorator.instance_independent(|r: &(u32,)| Ok::<_, MemoError>(r.0 * r.0 * 3));

    assert_eq!(area.call_on(&Celsius, (2,)).unwrap(), 12);
    assert_eq!(area.call_on(&Kelvin, (2,)).unwrap(), 12);
    assert_eq!(area.call((2,)).unwrap(), 12);
    assert_eq!(area.cache().unwrap().hits(), Some(2));
}

#[test]
fn test_wrap_preserves_kind_and_metadata() {
    let decorator = Decorator::default();

    let kind: CallableKind = "staticmethod".parse().unwrap();
    let callable = Callable::<(u8,), u8, MemoError>::new(kind, |x: &(u8,)| Ok(x.0 * 2))
        .unwrap()
        .with_meta(FnMeta::new("double").with_doc("Doubles a byte."));
    let wrapped = decorator.wrap(callable);

    assert_eq!(wrapped.kind(), CallableKind::InstanceIndependent);
    assert_eq!(wrapped.name(), "double");
    assert_eq!(wrapped.doc(), Some("Doubles a byte."));
    match &wrapped {
        WrappedCallable::InstanceIndependent(inner) => assert_eq!(inner.call((4,)).unwrap(), 8),
        other => panic!("unexpected wrapper: {:?}", other),
    }

    let class = Callable::<(u8,), String, MemoError>::class_bound(|c: &ClassRef, x: &(u8,)| {
        Ok(format!("{}:{}", c.name(), x.0))
    });
    let wrapped = decorator.wrap(class);
    assert_eq!(wrapped.kind(), CallableKind::ClassBound);
    assert!(wrapped.as_class_bound().is_some());
    assert!(wrapped.as_plain().is_none());
}

#[test]
fn test_class_bound_kind_needs_class_argument() {
    let err = Callable::<(u8,), u8, MemoError>::new(CallableKind::ClassBound, |x: &(u8,)| Ok(x.0))
        .unwrap_err();
    assert!(matches!(err, MemoError::UnsupportedCallableKind(_)));

    let err = "property".parse::<CallableKind>().unwrap_err();
    assert!(err.to_string().starts_with("unsupported callable kind"));
}

fn cube(x: &(i64,)) -> i64 {
    x.0 * x.0 * x.0
}

#[test]
fn test_wrapped_function_reports_its_name() {
    let memoized = cache(cube);
    assert_eq!(memoized.name(), "cube");
    assert_eq!(memoized.call((3,)).unwrap(), 27);

    let renamed = cache(cube).rename("cubed").describe("Raises to the third power.");
    assert_eq!(renamed.name(), "cubed");
    assert_eq!(renamed.doc(), Some("Raises to the third power."));
}
