mod test_support;

use serde_json::json;
use test_support::{
    request_err, request_ok, select_workspace, shutdown, spawn_sidecar, stored_value, temp_dir,
};

#[test]
fn semester_and_cumulative_gpa_follow_edits() {
    let workspace = temp_dir("gradebook-gpa");
    let (child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "reg",
        "auth.register",
        json!({ "username": "admin", "password": "root" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "login",
        "auth.login",
        json!({ "username": "admin", "password": "root" }),
    );

    // Starter row is {O, 4}.
    let sgpa = request_ok(&mut stdin, &mut reader, "1", "gpa.semester", json!({}));
    assert_eq!(sgpa["sgpaText"].as_str(), Some("10.00"));
    assert_eq!(sgpa["totalCredits"].as_i64(), Some(4));
    let cgpa = request_ok(&mut stdin, &mut reader, "2", "gpa.cumulative", json!({}));
    assert_eq!(cgpa["cgpaText"].as_str(), Some("10.00"));

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "subjects.update",
        json!({ "index": 0, "field": "grade", "value": "A" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "subjects.update",
        json!({ "index": 0, "field": "credits", "value": 3 }),
    );
    let sgpa = request_ok(&mut stdin, &mut reader, "5", "gpa.semester", json!({}));
    assert_eq!(sgpa["sgpaText"].as_str(), Some("8.00"));
    assert_eq!(sgpa["totalPoints"].as_i64(), Some(24));

    let _ = request_ok(&mut stdin, &mut reader, "6", "semesters.add", json!({}));
    let empty = request_ok(&mut stdin, &mut reader, "7", "gpa.semester", json!({}));
    assert_eq!(empty["semester"].as_u64(), Some(2));
    assert_eq!(empty["sgpaText"].as_str(), Some("0.00"));

    let _ = request_ok(&mut stdin, &mut reader, "8", "subjects.add", json!({}));
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "subjects.update",
        json!({ "index": 0, "field": "grade", "value": "B" }),
    );
    let sgpa = request_ok(&mut stdin, &mut reader, "10", "gpa.semester", json!({}));
    assert_eq!(sgpa["sgpaText"].as_str(), Some("6.00"));

    // (8*3 + 6*4) / 7
    let cgpa = request_ok(&mut stdin, &mut reader, "11", "gpa.cumulative", json!({}));
    assert_eq!(cgpa["cgpaText"].as_str(), Some("6.86"));
    assert_eq!(cgpa["totalCredits"].as_i64(), Some(7));
    assert_eq!(cgpa["semestersWithSubjects"].as_u64(), Some(2));
    assert_eq!(cgpa["totalSubjects"].as_u64(), Some(2));

    shutdown(child, stdin);
}

#[test]
fn invalid_edits_are_rejected_without_changing_the_record() {
    let workspace = temp_dir("gradebook-gpa-invalid");
    let (child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "reg",
        "auth.register",
        json!({ "username": "admin", "password": "root" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "login",
        "auth.login",
        json!({ "username": "admin", "password": "root" }),
    );

    let cases = [
        (json!({ "index": 0, "field": "grade", "value": "Z" }), "bad_params"),
        (json!({ "index": 0, "field": "credits", "value": "many" }), "bad_params"),
        (json!({ "index": 0, "field": "colour", "value": "red" }), "bad_params"),
        (json!({ "index": 0, "field": "name" }), "bad_params"),
        (json!({ "index": 5, "field": "name", "value": "x" }), "not_found"),
    ];
    for (i, (params, code)) in cases.into_iter().enumerate() {
        assert_eq!(
            request_err(&mut stdin, &mut reader, &format!("u{i}"), "subjects.update", params),
            code
        );
    }
    assert_eq!(
        request_err(&mut stdin, &mut reader, "d", "subjects.delete", json!({ "index": 3 })),
        "not_found"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "s0", "semesters.switch", json!({ "semester": 0 })),
        "not_found"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "s2", "semesters.switch", json!({ "semester": 2 })),
        "not_found"
    );

    let record = request_ok(&mut stdin, &mut reader, "get", "record.get", json!({}));
    assert_eq!(record["currentSemester"].as_u64(), Some(1));
    assert_eq!(record["subjects"][0]["grade"].as_str(), Some("O"));
    assert_eq!(record["subjects"][0]["credits"].as_i64(), Some(4));

    let _ = request_ok(&mut stdin, &mut reader, "del", "subjects.delete", json!({ "index": 0 }));
    let record = request_ok(&mut stdin, &mut reader, "get2", "record.get", json!({}));
    assert_eq!(record["subjects"].as_array().map(|a| a.len()), Some(0));

    shutdown(child, stdin);
}

#[test]
fn destructive_operations_need_confirmation() {
    let workspace = temp_dir("gradebook-gpa-reset");
    let (child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "reg",
        "auth.register",
        json!({ "username": "admin", "password": "root" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "login",
        "auth.login",
        json!({ "username": "admin", "password": "root" }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "1", "semesters.add", json!({}));
    let _ = request_ok(&mut stdin, &mut reader, "2", "subjects.add", json!({}));

    let cleared = request_ok(&mut stdin, &mut reader, "3", "semesters.clear", json!({}));
    assert_eq!(cleared["subjects"].as_array().map(|a| a.len()), Some(0));
    assert_eq!(cleared["semesters"].as_array().map(|a| a.len()), Some(2));

    assert_eq!(
        request_err(&mut stdin, &mut reader, "4", "record.reset", json!({})),
        "confirmation_required"
    );
    assert_eq!(
        request_err(&mut stdin, &mut reader, "5", "record.clearSaved", json!({ "confirmed": false })),
        "confirmation_required"
    );
    let still = request_ok(&mut stdin, &mut reader, "6", "record.get", json!({}));
    assert_eq!(still["semesters"].as_array().map(|a| a.len()), Some(2));

    let reset = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "record.reset",
        json!({ "confirmed": true }),
    );
    assert_eq!(reset["semesters"].as_array().map(|a| a.len()), Some(1));
    assert_eq!(reset["currentSemester"].as_u64(), Some(1));
    assert_eq!(reset["subjects"].as_array().map(|a| a.len()), Some(0));
    assert_eq!(reset["pendingSave"].as_bool(), Some(false));

    let cgpa = request_ok(&mut stdin, &mut reader, "8", "gpa.cumulative", json!({}));
    assert_eq!(cgpa["cgpaText"].as_str(), Some("0.00"));

    let after = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "record.clearSaved",
        json!({ "confirmed": true }),
    );
    assert_eq!(after["semesters"].as_array().map(|a| a.len()), Some(1));

    shutdown(child, stdin);
}

#[test]
fn oversized_credits_are_refused_and_pending_edits_survive() {
    let workspace = temp_dir("gradebook-gpa-huge-credits");
    let (child, mut stdin, mut reader) = spawn_sidecar();
    select_workspace(&mut stdin, &mut reader, &workspace);
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "reg",
        "auth.register",
        json!({ "username": "admin", "password": "root" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "login",
        "auth.login",
        json!({ "username": "admin", "password": "root" }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "subjects.update",
        json!({ "index": 0, "field": "name", "value": "Pending" }),
    );

    for (i, value) in [json!("9223372036854775807"), json!(i64::MAX), json!(1001)]
        .into_iter()
        .enumerate()
    {
        assert_eq!(
            request_err(
                &mut stdin,
                &mut reader,
                &format!("c{i}"),
                "subjects.update",
                json!({ "index": 0, "field": "credits", "value": value }),
            ),
            "bad_params"
        );
    }

    let record = request_ok(&mut stdin, &mut reader, "2", "record.get", json!({}));
    assert_eq!(record["subjects"][0]["name"].as_str(), Some("Pending"));
    assert_eq!(record["subjects"][0]["credits"].as_i64(), Some(4));
    let sgpa = request_ok(&mut stdin, &mut reader, "3", "gpa.semester", json!({}));
    assert_eq!(sgpa["sgpaText"].as_str(), Some("10.00"));

    shutdown(child, stdin);

    let raw = stored_value(&workspace, "marks_admin").expect("flushed record");
    let snapshot: serde_json::Value = serde_json::from_str(&raw).expect("snapshot json");
    assert_eq!(snapshot["semesters"][0]["subjects"][0]["name"].as_str(), Some("Pending"));
}
