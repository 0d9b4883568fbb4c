use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::helpers::{account_json, param_index};
use crate::ipc::types::{AppState, Request};
use crate::tracker::Tracker;
use serde_json::json;

fn admin_tracker<'a>(
    state: &'a mut AppState,
    req: &Request,
) -> Result<&'a mut Tracker, serde_json::Value> {
    let Some(tracker) = state.tracker.as_mut() else {
        return Err(no_workspace(&req.id));
    };
    if tracker.session().account().is_none() {
        return Err(err(&req.id, "not_logged_in", "login required", None));
    }
    if !tracker.session().is_admin() {
        return Err(err(&req.id, "forbidden", "admin session required", None));
    }
    Ok(tracker)
}

fn handle_users_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match admin_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let users: Vec<serde_json::Value> = tracker
        .accounts()
        .list()
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let mut row = account_json(a);
            row["index"] = json!(i);
            row["canToggle"] = json!(!a.is_admin());
            row
        })
        .collect();
    ok(&req.id, json!({ "users": users }))
}

fn handle_toggle_approval(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(index) = param_index(req, "index") else {
        return err(&req.id, "bad_params", "missing params.index", None);
    };
    let tracker = match admin_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    match tracker.accounts().toggle_approval(index) {
        Ok(account) => ok(&req.id, json!({ "account": account_json(&account) })),
        Err(e) => err(&req.id, e.code(), e.to_string(), None),
    }
}

fn handle_login_logs(state: &mut AppState, req: &Request) -> serde_json::Value {
    let tracker = match admin_tracker(state, req) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let logs: Vec<serde_json::Value> = tracker
        .storage()
        .load_login_logs()
        .iter()
        .map(|entry| {
            json!({
                "username": entry.username,
                "time": entry.timestamp.to_rfc3339(),
            })
        })
        .collect();
    ok(&req.id, json!({ "logs": logs }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "admin.users.list" => Some(handle_users_list(state, req)),
        "admin.users.toggleApproval" => Some(handle_toggle_approval(state, req)),
        "admin.loginLogs" => Some(handle_login_logs(state, req)),
        _ => None,
    }
}
