// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dispatch specs: which courses are enqueued, and to which queue

use crate::prelude::*;

#[test]
fn empty_state_runs_an_empty_pass() {
    let temp = State::empty();

    temp.cud()
        .args(&["--once"])
        .passes()
        .stdout_has("due=0")
        .stdout_has("short=0");

    assert_eq!(temp.diagnostic_events(), vec!["pass_summary"]);
}

#[test]
fn course_without_history_goes_to_short_queue() {
    let temp = State::empty();
    temp.course(active_course(1));

    temp.cud()
        .args(&["--once"])
        .passes()
        .stdout_has("due=1")
        .stdout_has("short=1");

    let jobs = temp.spool("short_update");
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0]["course_id"], 1);
    assert_eq!(temp.lock_json(1).unwrap()["token"], jobs[0]["token"]);

    let history = &temp.course_json(1)["history"]["attempts"];
    assert_eq!(history.as_array().unwrap().len(), 1);
    assert_eq!(history[0]["id"], jobs[0]["attempt_id"]);
}

#[test]
fn ninety_second_average_goes_to_medium_queue() {
    let temp = State::empty();
    let mut course = active_course(2);
    course["history"] = history_of(&[80, 90, 100]);
    temp.course(course);

    temp.cud().args(&["--once"]).passes().stdout_has("medium=1");

    assert!(temp.spool("short_update").is_empty());
    assert_eq!(temp.spool("medium_update").len(), 1);
}

#[test]
fn ended_unflagged_course_is_untouched() {
    let temp = State::empty();
    temp.course(ended_course(3));
    let before = temp.course_json(3);

    temp.cud().args(&["--once"]).passes().stdout_has("due=0");

    similar_asserts::assert_eq!(temp.course_json(3), before);
    assert!(temp.lock_json(3).is_none());
}

#[test]
fn flagged_ended_course_is_dispatched_and_flag_cleared() {
    let temp = State::empty();
    let mut course = ended_course(4);
    course["needs_update"] = json!(true);
    temp.course(course);

    temp.cud().args(&["--once"]).passes().stdout_has("short=1");

    assert_eq!(temp.course_json(4)["needs_update"], false);
}

#[test]
fn running_job_is_not_dispatched_twice() {
    let temp = State::empty();
    temp.course(active_course(5));

    temp.cud().args(&["--once"]).passes();
    let token = temp.spool("short_update")[0]["token"]
        .as_str()
        .unwrap()
        .to_string();
    temp.heartbeat(&token);

    temp.cud()
        .args(&["--once"])
        .passes()
        .stdout_has("in_flight=1")
        .stdout_has("short=0");

    assert_eq!(temp.spool("short_update").len(), 1);
    let history = &temp.course_json(5)["history"]["attempts"];
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[test]
fn queued_job_is_not_dispatched_twice() {
    let temp = State::empty();
    temp.course(active_course(6));

    temp.cud().args(&["--once"]).passes();
    // No worker has started: only the queued marker vouches for the job
    temp.cud()
        .args(&["--once"])
        .passes()
        .stdout_has("in_flight=1")
        .stdout_has("orphans=0");

    assert_eq!(temp.spool("short_update").len(), 1);
}

#[test]
fn unreadable_course_file_is_skipped() {
    let temp = State::empty();
    temp.file("courses/9.json", "{ not json");
    temp.course(active_course(1));

    temp.cud().args(&["--once"]).passes().stdout_has("short=1");
}
