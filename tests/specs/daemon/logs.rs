// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log specs

use crate::prelude::*;

#[test]
fn log_starts_with_startup_marker() {
    let temp = State::empty();
    temp.cud().args(&["--once"]).passes();

    let log = temp.log();
    assert!(log.starts_with("--- cud: starting (pid: "), "log:\n{log}");
}

#[test]
fn pass_summary_is_logged() {
    let temp = State::empty();
    temp.course(active_course(1));
    temp.cud().args(&["--once"]).passes();

    let log = temp.log();
    assert!(log.contains("pass_summary"), "log:\n{log}");
    assert!(log.contains("job enqueued"), "log:\n{log}");
}

#[test]
fn each_run_appends_a_marker() {
    let temp = State::empty();
    temp.cud().args(&["--once"]).passes();
    temp.cud().args(&["--once"]).passes();

    assert_eq!(temp.log().matches("cud: starting").count(), 2);
}

#[test]
fn diagnostics_carry_the_pass_id() {
    let temp = State::empty();
    temp.course(active_course(1));
    let out = temp.cud().args(&["--once"]).passes().stdout();

    let record = temp.diagnostics().pop().unwrap();
    let pass_id = record["pass_id"].as_str().unwrap();
    assert!(out.contains(pass_id), "stdout: {out}");
}
