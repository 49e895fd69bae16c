//! Decides whether a subscription's filter set applies to a notification.
//!
//! Matching is OR across a subscription's filters and AND within a
//! single filter's parameters. Parameter keys may be dotted paths
//! addressing nested payload values. Comparison is deliberately lenient:
//! strings compare case-insensitively, sequences match by containment or
//! ordered equality, and as a last resort the expected value is coerced
//! into the actual value's type.
//!
//! Pure functions over borrowed inputs; safe for concurrent calls.

use serde_json::Value;

use crate::types::{Filter, Notification, Subscription};

/// Returns true if `notification` should be delivered to `subscription`.
///
/// An empty filter list matches everything: wildcard subscriptions are
/// rejected at registration, but once a subscription is stored without
/// filters this engine accepts all notifications for it.
pub fn matches(subscription: &Subscription, notification: &Notification) -> bool {
    if subscription.filters.is_empty() {
        return true;
    }

    // Fewest constraints first, so the cheapest clause short-circuits
    // the OR. Match semantics do not depend on this order.
    let mut candidates: Vec<&Filter> = subscription
        .filters
        .iter()
        .filter(|f| f.trigger == notification.trigger_id)
        .collect();
    candidates.sort_by_key(|f| f.parameters.len());

    candidates.iter().any(|f| filter_matches(f, notification))
}

fn filter_matches(filter: &Filter, notification: &Notification) -> bool {
    if filter.parameters.is_empty() {
        return true;
    }

    let root = Value::Object(notification.payload.clone());
    filter
        .parameters
        .iter()
        .all(|(path, expected)| parameter_matches(path, expected, &root))
}

/// Resolve a dotted path against the payload and compare the value found
/// there with `expected`.
///
/// An empty path segment (a trailing dot, or the key itself being empty)
/// short-circuits to a comparison against the current resolution root.
/// A missing intermediate value matches only a null expectation.
fn parameter_matches(path: &str, expected: &Value, root: &Value) -> bool {
    let mut current = root;

    for segment in path.split('.') {
        if segment.is_empty() {
            return value_matches(expected, Some(current));
        }
        match current {
            Value::Object(map) => match map.get(segment) {
                Some(next) => current = next,
                None => return value_matches(expected, None),
            },
            _ => return value_matches(expected, None),
        }
    }

    value_matches(expected, Some(current))
}

/// Comparison rules, applied in order:
/// 1. both null (or absent) match; one null does not
/// 2. textual actual: case-insensitive against the expected rendering
/// 3. sequence actual: containment, then ordered equality
/// 4. direct equality (numeric-aware)
/// 5. coerce the expected rendering into the actual's type
fn value_matches(expected: &Value, actual: Option<&Value>) -> bool {
    let Some(actual) = actual else {
        return expected.is_null();
    };

    match (expected.is_null(), actual.is_null()) {
        (true, true) => return true,
        (true, false) | (false, true) => return false,
        (false, false) => {}
    }

    if let Value::String(actual_text) = actual {
        return render(expected).to_lowercase() == actual_text.to_lowercase();
    }

    if let Value::Array(items) = actual {
        if items.iter().any(|item| values_equal(item, expected)) {
            return true;
        }
        if let Value::Array(expected_items) = expected {
            return items.len() == expected_items.len()
                && items
                    .iter()
                    .zip(expected_items)
                    .all(|(a, e)| values_equal(a, e));
        }
        return false;
    }

    if values_equal(expected, actual) {
        return true;
    }

    coerced_matches(expected, actual)
}

/// Equality that treats `2` and `2.0` as the same number.
fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Last-resort match: parse the expected value's string rendering into
/// the actual value's runtime type. Parse failures are a non-match,
/// never an error.
fn coerced_matches(expected: &Value, actual: &Value) -> bool {
    let rendered = render(expected);
    match actual {
        Value::Number(n) => rendered
            .trim()
            .parse::<f64>()
            .is_ok_and(|parsed| Some(parsed) == n.as_f64()),
        Value::Bool(b) => rendered
            .trim()
            .to_lowercase()
            .parse::<bool>()
            .is_ok_and(|parsed| parsed == *b),
        _ => false,
    }
}

/// String rendering of a value for comparison and coercion. Strings
/// render without quotes; everything else renders as its JSON text.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
