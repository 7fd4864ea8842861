// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orphaned lock recovery specs

use crate::prelude::*;

fn course_with_open_attempt(id: u64) -> Value {
    let mut course = active_course(id);
    let mut history = history_of(&[200, 200, 200]);
    history["attempts"].as_array_mut().unwrap().push(json!({
        "id": 4,
        "start_time": chrono::Utc::now() - chrono::Duration::minutes(30),
    }));
    history["last_id"] = json!(4);
    course["history"] = history;
    course
}

#[test]
fn dead_owner_lock_is_cleared_and_course_redispatched() {
    let temp = State::empty();
    temp.course(course_with_open_attempt(1));
    temp.lock(1, "crashed-worker");

    temp.cud()
        .args(&["--once"])
        .passes()
        .stdout_has("orphans=1")
        // Recovered courses always go to the short queue
        .stdout_has("short=1");

    let course = temp.course_json(1);
    let attempts = course["history"]["attempts"].as_array().unwrap();
    let stale = attempts.iter().find(|a| a["id"] == 4).unwrap();
    assert_eq!(stale["orphan_lock_failure"], true);
    assert_eq!(stale["outcome"], "failed");

    let jobs = temp.spool("short_update");
    assert_eq!(jobs.len(), 1);
    assert_ne!(jobs[0]["token"], "crashed-worker");
    assert!(temp
        .diagnostic_events()
        .contains(&"orphan_lock_cleared".to_string()));
}

#[test]
fn live_owner_lock_is_left_alone() {
    let temp = State::empty();
    temp.course(course_with_open_attempt(1));
    temp.lock(1, "busy-worker");
    temp.heartbeat("busy-worker");

    temp.cud()
        .args(&["--once"])
        .passes()
        .stdout_has("orphans=0")
        .stdout_has("in_flight=1");

    assert_eq!(temp.lock_json(1).unwrap()["token"], "busy-worker");
    assert!(temp.spool("short_update").is_empty());
    assert!(!temp
        .diagnostic_events()
        .contains(&"orphan_lock_cleared".to_string()));
}

#[test]
fn orphan_is_recovered_only_once() {
    let temp = State::empty();
    temp.course(course_with_open_attempt(1));
    temp.lock(1, "crashed-worker");

    temp.cud().args(&["--once"]).passes().stdout_has("orphans=1");
    let token = temp.spool("short_update")[0]["token"]
        .as_str()
        .unwrap()
        .to_string();
    temp.heartbeat(&token);

    temp.cud().args(&["--once"]).passes().stdout_has("orphans=0");
    assert_eq!(temp.spool("short_update").len(), 1);
}

#[test]
fn corrupt_lock_file_is_cleared_and_course_dispatched() {
    let temp = State::empty();
    temp.course(active_course(1));
    temp.file("locks/1.lock", "not json");

    temp.cud()
        .args(&["--once"])
        .passes()
        .stdout_has("short=1")
        .stdout_has("failed=0");

    assert_eq!(temp.spool("short_update").len(), 1);
    assert!(temp.lock_json(1).is_some());
    assert!(temp
        .diagnostic_events()
        .contains(&"corrupt_lock_cleared".to_string()));
}
