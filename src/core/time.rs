//! Shared timestamp, identifier, and envelope helpers.

use chrono::{NaiveDate, SecondsFormat, Utc};
use serde_json::Value as JsonValue;
use ulid::Ulid;

/// RFC 3339 UTC timestamp with second precision (e.g. `2026-08-24T10:15:30Z`).
pub fn now_ts() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Current UTC calendar date for planting/harvest stamps.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// New record identifier with a subsystem prefix, e.g. `ITM_01J...`.
pub fn new_record_id(prefix: &str) -> String {
    format!("{}_{}", prefix, Ulid::new())
}

/// Standard command response envelope shape used across CLI surfaces.
pub fn command_envelope(cmd: &str, status: &str, extra: JsonValue) -> JsonValue {
    let mut base = serde_json::json!({
        "ts": now_ts(),
        "cmd": cmd,
        "status": status
    });
    if let (Some(base_obj), Some(extra_obj)) = (base.as_object_mut(), extra.as_object()) {
        for (k, v) in extra_obj {
            base_obj.insert(k.clone(), v.clone());
        }
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_ts_is_rfc3339() {
        let ts = now_ts();
        assert!(chrono::DateTime::parse_from_rfc3339(&ts).is_ok());
        assert!(ts.ends_with('Z'));
    }

    #[test]
    fn test_new_record_id_is_prefixed_and_unique() {
        let a = new_record_id("ITM");
        let b = new_record_id("ITM");
        assert!(a.starts_with("ITM_"));
        assert_ne!(a, b);
        assert!(Ulid::from_string(a.trim_start_matches("ITM_")).is_ok());
    }

    #[test]
    fn test_command_envelope_basic() {
        let envelope = command_envelope("ledger.buy", "ok", serde_json::json!({"seq": 3}));
        assert_eq!(envelope["cmd"], "ledger.buy");
        assert_eq!(envelope["status"], "ok");
        assert_eq!(envelope["seq"], 3);
        assert!(envelope["ts"].is_string());
    }
}
