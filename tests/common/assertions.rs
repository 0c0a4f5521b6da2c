//! Domain-specific assertion macros for solrdoc harnesses.
//!
//! These wrap `pretty_assertions` and add context-rich failure messages that
//! make it clear which projected key or query clause was off.

/// Assert that a projected dictionary carries `key` with the expected value.
///
/// ```rust
/// assert_projected!(dict, "title", "Hello");
/// ```
#[macro_export]
macro_rules! assert_projected {
    ($dict:expr, $key:expr, $($value:tt)+) => {{
        let dict: &serde_json::Map<String, serde_json::Value> = &$dict;
        let key: &str = $key;
        let expected = serde_json::json!($($value)+);
        match dict.get(key) {
            Some(actual) if *actual == expected => {}
            Some(actual) => panic!(
                "assert_projected! failed:\n  dict[{:?}]\n  expected: {}\n  actual:   {}",
                key, expected, actual
            ),
            None => panic!(
                "assert_projected! failed: key {:?} not projected.\n  Available keys: {:?}",
                key,
                dict.keys().collect::<Vec<_>>()
            ),
        }
    }};
}

/// Assert that a projected dictionary has exactly the given keys, in any
/// order.
#[macro_export]
macro_rules! assert_keys {
    ($dict:expr, [$($key:expr),* $(,)?]) => {{
        let dict: &serde_json::Map<String, serde_json::Value> = &$dict;
        let mut actual: Vec<&str> = dict.keys().map(String::as_str).collect();
        actual.sort_unstable();
        let mut expected: Vec<&str> = vec![$($key),*];
        expected.sort_unstable();
        pretty_assertions::assert_eq!(actual, expected, "projected keys differ");
    }};
}

/// Assert that a rendered query fragment contains every clause given.
#[macro_export]
macro_rules! assert_clauses {
    ($fragment:expr, $($clause:expr),+ $(,)?) => {{
        let fragment: &str = &$fragment;
        $(
            if !fragment.contains($clause) {
                panic!(
                    "assert_clauses! failed: {:?} missing from\n  {}",
                    $clause, fragment
                );
            }
        )+
    }};
}
