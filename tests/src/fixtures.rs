//! Request bodies and response helpers.

use rust_decimal::Decimal;
use serde_json::{json, Value};

/// Live teaching session at `rate` per minute with the default ceiling.
pub fn teaching_session(rate: &str) -> Value {
    json!({
        "resource_kind": "teaching",
        "resource_id": "guitar-basics",
        "payer": "student-1",
        "rate_per_minute": rate,
    })
}

/// Same shape the web client sends: legacy field names.
pub fn legacy_teaching_session(rate: &str) -> Value {
    json!({
        "teacher_id": "guitar-basics",
        "student_id": "student-1",
        "rate_per_unit_time": rate,
    })
}

/// Legacy video body: no `resource_kind`, the id field names the kind.
pub fn legacy_video_session(rate: &str) -> Value {
    json!({
        "video_id": "intro-to-sql",
        "user_id": "student-2",
        "rate_per_unit_time": rate,
    })
}

/// Video session with an explicit ceiling.
pub fn video_session(rate: &str, ceiling_minutes: u32) -> Value {
    json!({
        "resource_kind": "video",
        "resource_id": "intro-to-sql",
        "payer": "student-2",
        "rate_per_minute": rate,
        "lock_ceiling_minutes": ceiling_minutes,
    })
}

pub fn end_session(session_id: &str) -> Value {
    json!({ "session_id": session_id })
}

pub fn cancel_session(session_id: &str, reason: Option<&str>) -> Value {
    match reason {
        Some(reason) => json!({ "session_id": session_id, "reason": reason }),
        None => json!({ "session_id": session_id }),
    }
}

/// Reads a money field, accepting string or number encodings.
pub fn money(body: &Value, field: &str) -> Decimal {
    match &body[field] {
        Value::String(s) => s
            .parse()
            .unwrap_or_else(|_| panic!("{} is not a decimal: {}", field, s)),
        Value::Number(n) => n
            .to_string()
            .parse()
            .unwrap_or_else(|_| panic!("{} is not a decimal: {}", field, n)),
        other => panic!("{} missing or not money: {:?}", field, other),
    }
}

/// Reads a string field.
pub fn text<'a>(body: &'a Value, field: &str) -> &'a str {
    body[field]
        .as_str()
        .unwrap_or_else(|| panic!("{} missing from {}", field, body))
}
