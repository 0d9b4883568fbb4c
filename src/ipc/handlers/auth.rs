use crate::accounts::AccountError;
use crate::ipc::error::{err, no_workspace, ok};
use crate::ipc::helpers::{account_json, param_str, record_json, session_json};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn account_err(id: &str, e: AccountError) -> serde_json::Value {
    err(id, e.code(), e.to_string(), None)
}

fn credentials(req: &Request) -> Result<(&str, &str), serde_json::Value> {
    let Some(username) = param_str(req, "username") else {
        return Err(err(&req.id, "bad_params", "missing params.username", None));
    };
    let Some(password) = param_str(req, "password") else {
        return Err(err(&req.id, "bad_params", "missing params.password", None));
    };
    Ok((username, password))
}

fn handle_register(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return no_workspace(&req.id);
    };
    let (username, password) = match credentials(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    match tracker.register(username, password) {
        Ok(account) => {
            // Students wait for an admin before they can log in.
            let message = if account.approved {
                "Registration successful! You can now login."
            } else {
                "Registration successful! Please wait for admin approval."
            };
            ok(
                &req.id,
                json!({ "account": account_json(&account), "message": message }),
            )
        }
        Err(e) => account_err(&req.id, e),
    }
}

fn handle_login(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return no_workspace(&req.id);
    };
    let (username, password) = match credentials(req) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let (username, password) = (username.trim(), password.trim());
    if username.is_empty() || password.is_empty() {
        return account_err(&req.id, AccountError::InvalidInput);
    }
    match tracker.login(username, password) {
        Ok(_) => ok(
            &req.id,
            json!({
                "session": session_json(tracker),
                "record": record_json(tracker),
            }),
        ),
        Err(e) => account_err(&req.id, e),
    }
}

fn handle_logout(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_mut() else {
        return no_workspace(&req.id);
    };
    match tracker.logout() {
        Ok(()) => ok(&req.id, session_json(tracker)),
        Err(e) => err(&req.id, "storage_failed", format!("{e:#}"), None),
    }
}

fn handle_session_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(tracker) = state.tracker.as_ref() else {
        return no_workspace(&req.id);
    };
    ok(&req.id, session_json(tracker))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "auth.register" => Some(handle_register(state, req)),
        "auth.login" => Some(handle_login(state, req)),
        "auth.logout" => Some(handle_logout(state, req)),
        "session.get" => Some(handle_session_get(state, req)),
        _ => None,
    }
}
