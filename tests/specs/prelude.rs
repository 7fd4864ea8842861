// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared fixtures for cud specs

pub use serde_json::{json, Value};

use assert_cmd::Command;
use chrono::{DateTime, Duration, Utc};
use std::path::{Path, PathBuf};
use std::process::Output;
use tempfile::TempDir;

/// A temporary state directory with a config file pointing at it
pub struct State {
    dir: TempDir,
}

impl State {
    pub fn empty() -> Self {
        let state = Self {
            dir: TempDir::new().unwrap(),
        };
        state.config("");
        state
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root().join("state")
    }

    pub fn config_path(&self) -> PathBuf {
        self.root().join("cud.toml")
    }

    pub fn log_path(&self) -> PathBuf {
        self.root().join("logs").join("cud.log")
    }

    /// Write the config file; `extra` holds any sections besides `[paths]`
    pub fn config(&self, extra: &str) {
        let text = format!(
            "[paths]\nstate_dir = {:?}\nlog_path = {:?}\n\n{}",
            self.state_dir().display().to_string(),
            self.log_path().display().to_string(),
            extra
        );
        std::fs::write(self.config_path(), text).unwrap();
    }

    pub fn file(&self, rel: &str, contents: &str) {
        let path = self.state_dir().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    pub fn course(&self, course: Value) {
        let id = course["id"].as_u64().unwrap();
        self.file(&format!("courses/{id}.json"), &course.to_string());
    }

    pub fn course_json(&self, id: u64) -> Value {
        read_json(&self.state_dir().join(format!("courses/{id}.json")))
    }

    /// Seed a lock file as if `token`'s job held the course
    pub fn lock(&self, id: u64, token: &str) {
        let record = json!({
            "course_id": id,
            "token": token,
            "acquired_at": Utc::now() - Duration::minutes(30),
        });
        self.file(&format!("locks/{id}.lock"), &record.to_string());
    }

    pub fn lock_json(&self, id: u64) -> Option<Value> {
        let path = self.state_dir().join(format!("locks/{id}.lock"));
        path.exists().then(|| read_json(&path))
    }

    /// Mark the job owning `token` as alive
    pub fn heartbeat(&self, token: &str) {
        self.file(&format!("heartbeats/{token}"), "");
    }

    pub fn spool(&self, queue: &str) -> Vec<Value> {
        read_lines(&self.state_dir().join(format!("queues/{queue}.jsonl")))
    }

    pub fn diagnostics(&self) -> Vec<Value> {
        read_lines(&self.state_dir().join("diagnostics.jsonl"))
    }

    pub fn diagnostic_events(&self) -> Vec<String> {
        self.diagnostics()
            .iter()
            .map(|d| d["event"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.log_path()).unwrap_or_default()
    }

    /// `cud --config <state config>`
    pub fn cud(&self) -> CudCommand {
        let mut cmd = Command::cargo_bin("cud").unwrap();
        cmd.arg("--config").arg(self.config_path());
        CudCommand { cmd }
    }
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

fn read_lines(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn window(start: DateTime<Utc>, end: DateTime<Utc>) -> Value {
    json!({ "start": start, "end": end })
}

/// A course running now
pub fn active_course(id: u64) -> Value {
    let now = Utc::now();
    json!({
        "id": id,
        "slug": format!("Org/Course_{id}"),
        "window": window(now - Duration::days(1), now + Duration::days(7)),
    })
}

/// A course that ended last month
pub fn ended_course(id: u64) -> Value {
    let now = Utc::now();
    json!({
        "id": id,
        "slug": format!("Org/Old_{id}"),
        "window": window(now - Duration::days(60), now - Duration::days(30)),
    })
}

/// History of successful attempts each lasting `seconds`
pub fn history_of(seconds: &[i64]) -> Value {
    let base = Utc::now() - Duration::days(2);
    let attempts: Vec<Value> = seconds
        .iter()
        .enumerate()
        .map(|(i, secs)| {
            let start = base + Duration::hours(i as i64);
            json!({
                "id": i + 1,
                "start_time": start,
                "end_time": start + Duration::seconds(*secs),
                "outcome": "succeeded",
            })
        })
        .collect();
    json!({ "attempts": attempts, "last_id": seconds.len() })
}

/// `cud` with no arguments preset
pub fn cud() -> CudCommand {
    CudCommand {
        cmd: Command::cargo_bin("cud").unwrap(),
    }
}

pub struct CudCommand {
    cmd: Command,
}

impl CudCommand {
    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn passes(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        assert!(
            output.status.success(),
            "expected success, got {:?}\nstdout: {}\nstderr: {}",
            output.status,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        RunAssert { output }
    }

    pub fn fails(mut self) -> RunAssert {
        let output = self.cmd.output().unwrap();
        assert!(
            !output.status.success(),
            "expected failure\nstdout: {}",
            String::from_utf8_lossy(&output.stdout)
        );
        RunAssert { output }
    }
}

pub struct RunAssert {
    output: Output,
}

impl RunAssert {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    pub fn stdout_has(self, needle: &str) -> Self {
        let stdout = self.stdout();
        assert!(stdout.contains(needle), "stdout missing {needle:?}:\n{stdout}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        let stderr = self.stderr();
        assert!(stderr.contains(needle), "stderr missing {needle:?}:\n{stderr}");
        self
    }
}
