// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! CLI help specs

use crate::prelude::*;

#[test]
fn help_lists_flags() {
    cud()
        .args(&["--help"])
        .passes()
        .stdout_has("--config")
        .stdout_has("--once");
}

#[test]
fn unknown_flag_fails() {
    cud().args(&["--bogus"]).fails().stderr_has("--bogus");
}
