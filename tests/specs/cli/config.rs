// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Configuration file specs

use crate::prelude::*;

#[test]
fn missing_config_file_fails_with_path() {
    let temp = State::empty();
    std::fs::remove_file(temp.config_path()).unwrap();

    temp.cud().args(&["--once"]).fails().stderr_has("cud.toml");
}

#[test]
fn zero_history_window_is_rejected() {
    let temp = State::empty();
    temp.config("[history]\nwindow = 0\n");

    temp.cud()
        .args(&["--once"])
        .fails()
        .stderr_has("history window must be at least 1");
}

#[test]
fn inverted_tier_thresholds_are_rejected() {
    let temp = State::empty();
    temp.config("[tiers]\nshort = \"20m\"\nmedium = \"5m\"\n");

    temp.cud().args(&["--once"]).fails();
    assert!(temp.spool("short_update").is_empty());
}

#[test]
fn unknown_section_is_rejected() {
    let temp = State::empty();
    temp.config("[scheduler]\ninterval = \"1m\"\n");

    temp.cud().args(&["--once"]).fails().stderr_has("scheduler");
}

#[test]
fn custom_thresholds_change_the_tier() {
    let temp = State::empty();
    // 90s average is Long when Medium ends at 80s
    temp.config("[tiers]\nshort = \"30s\"\nmedium = \"80s\"\n");
    let mut course = active_course(1);
    course["history"] = history_of(&[90, 90, 90]);
    temp.course(course);

    temp.cud().args(&["--once"]).passes().stdout_has("long=1");
    assert_eq!(temp.spool("long_update").len(), 1);
}
