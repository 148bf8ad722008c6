//! JSON-RPC 2.0 envelope shapes and id canonicalization.
//!
//! The wrapper treats MCP as opaque JSON-RPC: it never validates method
//! names or params shapes beyond what is needed to pair a request with its
//! response.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A JSON-RPC 2.0 request envelope, as observed on the client→child stream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcRequest {
    /// Protocol marker, expected to be `"2.0"`; not enforced by the proxy.
    pub jsonrpc: Option<String>,
    /// Request id; absent or `null` marks a notification.
    #[serde(default)]
    pub id: Option<Value>,
    /// The RPC method name.
    pub method: String,
    /// The RPC parameters, in whatever shape the caller sent.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A JSON-RPC 2.0 response envelope, as observed on the child→client stream.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JsonRpcResponse {
    /// Protocol marker, expected to be `"2.0"`; not enforced by the proxy.
    pub jsonrpc: Option<String>,
    /// Request id this response is paired to.
    #[serde(default)]
    pub id: Option<Value>,
    /// The success result, present iff `error` is absent.
    #[serde(default)]
    pub result: Option<Value>,
    /// The error object, present iff `result` is absent.
    #[serde(default)]
    pub error: Option<Value>,
}

/// Canonicalizes a JSON-RPC id for use as a request-store key.
///
/// String and numeric ids are kept in disjoint namespaces (`{id:"1"}` must
/// never match `{id:1}`), while all numeric representations of the same
/// value collapse to one key (`{id:1}` and `{id:1.0}` must match). `null`
/// and any non-scalar id are never keyed and return `None`.
#[must_use]
pub fn canonicalize_id(id: &Value) -> Option<String> {
    match id {
        Value::String(s) => Some(format!("s:{s}")),
        Value::Number(n) => canonicalize_number(n).map(|digits| format!("n:{digits}")),
        _ => None,
    }
}

fn canonicalize_number(n: &serde_json::Number) -> Option<String> {
    if let Some(i) = n.as_i64() {
        return Some(i.to_string());
    }
    if let Some(u) = n.as_u64() {
        return Some(u.to_string());
    }
    n.as_f64().map(|f| {
        if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e18 {
            // Safe: guarded by the magnitude and fractional checks above.
            #[allow(
                clippy::cast_possible_truncation,
                reason = "integer-valued float below 1e18 round-trips exactly"
            )]
            let as_int = f as i64;
            as_int.to_string()
        } else {
            n.to_string()
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn integer_and_float_ids_match() {
        assert_eq!(canonicalize_id(&json!(1)), canonicalize_id(&json!(1.0)));
    }

    #[test]
    fn string_and_number_ids_never_match() {
        assert_ne!(canonicalize_id(&json!("1")), canonicalize_id(&json!(1)));
    }

    #[test]
    fn null_is_never_keyed() {
        assert_eq!(canonicalize_id(&json!(null)), None);
    }

    #[test]
    fn non_scalar_id_is_unkeyed() {
        assert_eq!(canonicalize_id(&json!([1, 2])), None);
        assert_eq!(canonicalize_id(&json!({"a": 1})), None);
    }

    #[test]
    fn fractional_numbers_keep_decimal_form() {
        let key = canonicalize_id(&json!(1.5)).expect("numeric id");
        assert!(key.ends_with("1.5"));
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Canonicalizing is idempotent: re-canonicalizing the canonical
        /// string's own namespace tag never changes which bucket an id
        /// falls in.
        #[test]
        fn integer_id_canonicalization_is_stable(i in any::<i64>()) {
            let key = canonicalize_id(&serde_json::json!(i));
            let key_again = canonicalize_id(&serde_json::json!(i));
            prop_assert_eq!(key, key_again);
        }

        /// An integer id and its string rendering never collapse to the
        /// same key, for any integer value.
        #[test]
        fn integer_and_its_string_form_never_match(i in any::<i64>()) {
            let numeric = canonicalize_id(&serde_json::json!(i));
            let stringy = canonicalize_id(&serde_json::json!(i.to_string()));
            prop_assert_ne!(numeric, stringy);
        }

        /// Two distinct i64 ids never canonicalize to the same key.
        #[test]
        fn distinct_integers_never_collide(a in any::<i64>(), b in any::<i64>()) {
            prop_assume!(a != b);
            prop_assert_ne!(canonicalize_id(&serde_json::json!(a)), canonicalize_id(&serde_json::json!(b)));
        }

        /// An integer id and the equal-valued float id always canonicalize
        /// to the same key, as long as the float round-trips exactly.
        #[test]
        fn integer_and_equal_float_collide(i in -1_000_000_i64..1_000_000) {
            #[allow(clippy::cast_precision_loss, reason = "bounded range round-trips exactly through f64")]
            let f = i as f64;
            prop_assert_eq!(canonicalize_id(&serde_json::json!(i)), canonicalize_id(&serde_json::json!(f)));
        }

        /// Arbitrary strings always canonicalize into the string namespace,
        /// distinct from every numeric id.
        #[test]
        fn string_id_never_matches_any_integer(s in "[a-zA-Z0-9]{0,16}", i in any::<i64>()) {
            prop_assert_ne!(canonicalize_id(&serde_json::json!(s)), canonicalize_id(&serde_json::json!(i)));
        }
    }
}
