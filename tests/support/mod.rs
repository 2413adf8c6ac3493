//! Test support utilities for warren integration tests.
//!
//! Each test gets its own temporary project directory and home root. No
//! process-global state is mutated — child commands use `.current_dir()`
//! and `WARREN_HOME`, so tests can safely run in parallel.

#![allow(dead_code)]

use std::fs;
use std::process::Output;

use assert_cmd::Command;
use tempfile::TempDir;

/// Isolated test environment: a project dir and a home root.
pub struct Test {
    /// Temporary directory for the record file
    pub dir: TempDir,
    /// Temporary home root (identity and vault live here)
    pub home: TempDir,
}

impl Test {
    /// Create a new empty test environment.
    pub fn new() -> Self {
        Self {
            dir: TempDir::new().expect("failed to create temp dir"),
            home: TempDir::new().expect("failed to create temp home"),
        }
    }

    /// Create a test environment with a generated identity.
    pub fn with_identity() -> Self {
        let t = Self::new();
        let output = t.run(&["keygen"]);
        assert!(
            output.status.success(),
            "keygen failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        t
    }

    /// Create a warren command with correct environment variables.
    pub fn cmd(&self) -> Command {
        #[allow(deprecated)]
        let mut cmd = Command::cargo_bin("warren").expect("failed to find warren binary");
        cmd.env("WARREN_HOME", self.home.path());
        cmd.env_remove("WARREN_IDENTITY");
        cmd.current_dir(self.dir.path());
        cmd
    }

    /// Run warren with the given arguments and capture the output.
    pub fn run(&self, args: &[&str]) -> Output {
        self.cmd()
            .args(args)
            .output()
            .expect("failed to run warren")
    }

    /// Write the record file directly.
    pub fn write_record(&self, contents: &str) {
        fs::write(self.dir.path().join(".env"), contents).expect("failed to write record");
    }

    /// Read the record file back.
    pub fn read_record(&self) -> String {
        fs::read_to_string(self.dir.path().join(".env")).expect("failed to read record")
    }
}

/// Assert the command succeeded, printing stderr on failure.
pub fn assert_success(output: &Output) {
    assert!(
        output.status.success(),
        "command failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

/// Assert the command failed.
pub fn assert_failure(output: &Output) {
    assert!(
        !output.status.success(),
        "command unexpectedly succeeded: {}",
        String::from_utf8_lossy(&output.stdout)
    );
}

/// Stdout as a string.
pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

/// Stderr as a string.
pub fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}
