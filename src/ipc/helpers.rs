use serde_json::json;

use crate::accounts::Account;
use crate::grades;
use crate::ipc::types::Request;
use crate::tracker::Tracker;

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params.get(key).and_then(|v| v.as_str())
}

pub fn param_index(req: &Request, key: &str) -> Option<usize> {
    req.params
        .get(key)
        .and_then(|v| v.as_u64())
        .and_then(|n| usize::try_from(n).ok())
}

/// Missing or non-boolean counts as "not confirmed".
pub fn param_bool(req: &Request, key: &str) -> bool {
    req.params.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

/// Largest credit value accepted from a request, in either direction.
pub const MAX_CREDITS: i64 = 1000;

/// Credits from the grade form: a JSON number, or text read like a
/// leading-integer parse ("3", " 4 credits", "-2"). `None` if no digits lead
/// or the value is beyond `MAX_CREDITS`.
pub fn parse_credits(value: &serde_json::Value) -> Option<i64> {
    raw_credits(value).filter(|c| (-MAX_CREDITS..=MAX_CREDITS).contains(c))
}

fn raw_credits(value: &serde_json::Value) -> Option<i64> {
    match value {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        serde_json::Value::String(s) => leading_int(s),
        _ => None,
    }
}

fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: &str = {
        let end = rest
            .char_indices()
            .find(|(_, c)| !c.is_ascii_digit())
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        &rest[..end]
    };
    if digits.is_empty() {
        return None;
    }
    let n: i64 = digits.parse().ok()?;
    Some(if negative { -n } else { n })
}

/// Account view for the presentation layer. Passwords never leave the sidecar.
pub fn account_json(account: &Account) -> serde_json::Value {
    json!({
        "username": account.username,
        "role": account.role.as_str(),
        "approved": account.approved,
        "isAdmin": account.is_admin(),
    })
}

pub fn session_json(tracker: &Tracker) -> serde_json::Value {
    let session = tracker.session();
    json!({
        "loggedIn": session.account().is_some(),
        "account": session.account().map(account_json),
        "isAdmin": session.is_admin(),
        "readOnly": session.read_only(),
    })
}

/// Everything the grade screen renders: the semester tabs, the current
/// semester's rows with their per-row points, and the edit mode.
pub fn record_json(tracker: &Tracker) -> serde_json::Value {
    let record = tracker.record();
    let semesters: Vec<serde_json::Value> = record
        .semesters()
        .iter()
        .enumerate()
        .map(|(i, sem)| {
            json!({
                "semester": i + 1,
                "year": sem.year,
                "subjectCount": sem.subjects.len(),
            })
        })
        .collect();
    let current = record.current();
    let subjects: Vec<serde_json::Value> = current
        .subjects
        .iter()
        .enumerate()
        .map(|(i, s)| {
            json!({
                "index": i,
                "name": s.name,
                "grade": s.grade,
                "credits": s.credits,
                "gradePoints": grades::points_for(&s.grade),
                "points": s.quality_points(),
            })
        })
        .collect();
    json!({
        "semesters": semesters,
        "currentSemester": record.current_semester(),
        "year": current.year,
        "subjects": subjects,
        "readOnly": tracker.session().read_only(),
        "pendingSave": tracker.pending_save(),
    })
}
