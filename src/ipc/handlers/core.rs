use crate::config;
use crate::grades;
use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use crate::store::Storage;
use crate::tracker::Tracker;
use serde_json::json;
use std::path::PathBuf;
use tracing::info;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "loggedIn": state
                .tracker
                .as_ref()
                .is_some_and(|t| t.session().account().is_some()),
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match Storage::open_workspace(&path) {
        Ok(storage) => {
            // Pending edits belong to the workspace being left.
            state.flush();
            let settings = config::load_workspace_settings(&path);
            let tracker = Tracker::open(storage, &settings);
            let username = tracker.session().username().map(str::to_string);
            let path_str = path.to_string_lossy().to_string();
            info!(
                target: "gradebookd",
                path = %path_str,
                resumed = ?username,
                "workspace selected"
            );
            state.workspace = Some(path);
            state.tracker = Some(tracker);
            ok(
                &req.id,
                json!({
                    "workspacePath": path_str,
                    "resumedUser": username,
                }),
            )
        }
        Err(e) => err(&req.id, "db_open_failed", format!("{e:?}"), None),
    }
}

fn handle_grades_scale(req: &Request) -> serde_json::Value {
    let scale: Vec<serde_json::Value> = grades::GRADE_SCALE
        .iter()
        .map(|(symbol, points)| json!({ "grade": symbol, "points": points }))
        .collect();
    ok(
        &req.id,
        json!({ "scale": scale, "defaultGrade": grades::DEFAULT_GRADE }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "grades.scale" => Some(handle_grades_scale(req)),
        _ => None,
    }
}
