use crate::grades;
use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::helpers::{param_bool, param_index, param_str, parse_credits, record_json};
use crate::ipc::types::{AppState, Request};
use crate::record::{RecordError, SubjectField};
use crate::tracker::{Tracker, TrackerError};
use serde_json::json;

/// The tracker, but only while someone is logged in; grade data is per user.
fn session_tracker<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Tracker, serde_json::Value> {
    let Some(tracker) = state.tracker.as_mut() else {
        return Err(no_workspace(&req.id));
    };
    if tracker.session().account().is_none() {
        return Err(err(&req.id, "not_logged_in", "login required", None));
    }
    Ok(tracker)
}

fn record_err(id: &str, e: RecordError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

fn tracker_err(id: &str, e: TrackerError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

fn handle_record_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    ok(&req.id, record_json(tracker))
}

fn handle_subjects_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    tracker.add_subject();
    ok(&req.id, record_json(tracker))
}

fn handle_subjects_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(index) = param_index(req, "index") else {
        return err(&req.id, "bad_params", "missing params.index", None);
    };
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match tracker.delete_subject(index) {
        Ok(_) => ok(&req.id, record_json(tracker)),
        Err(e) => record_err(&req.id, e),
    }
}

fn subject_field(req: &Request) -> Result<SubjectField, serde_json::Value> {
    let Some(field) = param_str(req, "field") else {
        return Err(err(&req.id, "bad_params", "missing params.field", None));
    };
    let Some(value) = req.params.get("value") else {
        return Err(err(&req.id, "bad_params", "missing params.value", None));
    };
    match field {
        "name" => match value.as_str() {
            Some(s) => Ok(SubjectField::Name(s.to_string())),
            None => Err(err(&req.id, "bad_params", "name must be a string", None)),
        },
        "grade" => match value.as_str() {
            Some(g) if grades::is_known(g) => Ok(SubjectField::Grade(g.to_string())),
            _ => Err(err(
                &req.id,
                "bad_params",
                "grade must be one of the scale symbols",
                Some(json!({ "value": value })),
            )),
        },
        "credits" => match parse_credits(value) {
            Some(c) => Ok(SubjectField::Credits(c)),
            None => Err(err(
                &req.id,
                "bad_params",
                "credits must be a number",
                Some(json!({ "value": value })),
            )),
        },
        other => Err(err(
            &req.id,
            "bad_params",
            format!("unknown field: {other}"),
            None,
        )),
    }
}

fn handle_subjects_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(index) = param_index(req, "index") else {
        return err(&req.id, "bad_params", "missing params.index", None);
    };
    let field = match subject_field(req) {
        Ok(f) => f,
        Err(resp) => return resp,
    };
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match tracker.update_subject(index, field) {
        Ok(()) => ok(&req.id, record_json(tracker)),
        Err(e) => record_err(&req.id, e),
    }
}

fn handle_semesters_switch(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(semester) = param_index(req, "semester") else {
        return err(&req.id, "bad_params", "missing params.semester", None);
    };
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match tracker.switch_semester(semester) {
        Ok(()) => ok(&req.id, record_json(tracker)),
        Err(e) => record_err(&req.id, e),
    }
}

fn handle_semesters_add(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    tracker.add_new_semester();
    ok(&req.id, record_json(tracker))
}

fn handle_semesters_clear(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    tracker.clear_current_semester();
    ok(&req.id, record_json(tracker))
}

fn handle_record_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let confirmed = param_bool(req, "confirmed");
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match tracker.reset_all(confirmed) {
        Ok(()) => ok(&req.id, record_json(tracker)),
        Err(e) => record_err(&req.id, e),
    }
}

fn handle_record_save(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match tracker.save_now() {
        Ok(saved) => ok(&req.id, json!({ "saved": saved })),
        Err(e) => err(&req.id, "storage_failed", format!("{e:#}"), None),
    }
}

fn handle_record_clear_saved(state: &mut AppState, req: &Request) -> serde_json::Value {
    let confirmed = param_bool(req, "confirmed");
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match tracker.clear_saved_data(confirmed) {
        Ok(()) => ok(&req.id, record_json(tracker)),
        Err(e) => tracker_err(&req.id, e),
    }
}

fn handle_gpa_semester(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let gpa = tracker.record().compute_sgpa();
    ok(
        &req.id,
        json!({
            "semester": gpa.semester,
            "year": gpa.year,
            "sgpa": gpa.sgpa,
            "sgpaText": format!("{:.2}", gpa.sgpa),
            "totalCredits": gpa.total_credits,
            "totalPoints": gpa.total_points,
        }),
    )
}

fn handle_gpa_cumulative(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match session_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let gpa = tracker.record().compute_cgpa();
    ok(
        &req.id,
        json!({
            "cgpa": gpa.cgpa,
            "cgpaText": format!("{:.2}", gpa.cgpa),
            "totalCredits": gpa.total_credits,
            "totalPoints": gpa.total_points,
            "semestersWithSubjects": gpa.semesters_with_subjects,
            "totalSubjects": gpa.total_subjects,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "record.get" => Some(handle_record_get(state, req)),
        "subjects.add" => Some(handle_subjects_add(state, req)),
        "subjects.delete" => Some(handle_subjects_delete(state, req)),
        "subjects.update" => Some(handle_subjects_update(state, req)),
        "semesters.switch" => Some(handle_semesters_switch(state, req)),
        "semesters.add" => Some(handle_semesters_add(state, req)),
        "semesters.clear" => Some(handle_semesters_clear(state, req)),
        "record.reset" => Some(handle_record_reset(state, req)),
        "record.save" => Some(handle_record_save(state, req)),
        "record.clearSaved" => Some(handle_record_clear_saved(state, req)),
        "gpa.semester" => Some(handle_gpa_semester(state, req)),
        "gpa.cumulative" => Some(handle_gpa_cumulative(state, req)),
        _ => None,
    }
}
