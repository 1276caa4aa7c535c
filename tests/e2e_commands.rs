//! E2E tests for the inspection commands: `list`, `configs`, `version`
//! and `completions`.

mod common;

use assert_cmd::Command;
use common::cli::{DhWorkspace, run_dh};
use common::fixtures::{TWO_CONFIGS, write_fixture, write_harness, write_simple};
use predicates::prelude::*;
use std::fs;

#[test]
fn e2e_list_json_reports_fixtures_and_broken() {
    let _log = common::test_log("e2e_list_json_reports_fixtures_and_broken");
    let ws = DhWorkspace::new();
    write_simple(&ws.root, "IntAdd_01", "echo 55\n");
    write_fixture(
        &ws.root,
        "loops/LoopSum_03",
        "entry_point: loops.LoopSum_03.Main\nargs: [10, true]\ntimeout_ms: 500\n",
        "echo 55\n",
    );
    write_fixture(&ws.root, "Broken_09", "timeout_ms: 0\nentry_point: X.Main\n", "");

    let run = run_dh(&ws, ["--json", "list", "--root", &ws.root_arg()], "list_json");
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);

    let doc = run.json();
    let fixtures = doc["fixtures"].as_array().unwrap();
    assert_eq!(fixtures.len(), 2);
    assert_eq!(fixtures[0]["id"], "IntAdd_01");
    assert_eq!(fixtures[1]["id"], "LoopSum_03");
    assert_eq!(fixtures[1]["category"], "loops");
    assert_eq!(fixtures[1]["args"], serde_json::json!(["10", "true"]));
    assert_eq!(fixtures[1]["timeout_ms"], 500);
    assert_eq!(doc["broken"][0]["id"], "Broken_09");
}

#[test]
fn e2e_list_does_not_need_configs() {
    let _log = common::test_log("e2e_list_does_not_need_configs");
    let ws = DhWorkspace::new();
    write_simple(&ws.root, "IntAdd_01", "echo 55\n");
    fs::create_dir_all(ws.root.join("Java_02")).unwrap();
    fs::write(
        ws.root.join("Java_02/Main.java"),
        "package opt.java;\npublic class Main {\n  public static void main(String[] args) {}\n}\n",
    )
    .unwrap();

    let run = run_dh(&ws, ["list", "--root", &ws.root_arg()], "list_text");
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);
    assert!(run.stdout.contains("IntAdd_01"));
    assert!(run.stdout.contains("opt.java.Main"), "stdout: {}", run.stdout);
    assert!(run.stdout.contains("2 fixture(s), 0 broken"));
}

#[test]
fn e2e_configs_shows_selection() {
    let _log = common::test_log("e2e_configs_shows_selection");
    let ws = DhWorkspace::new();
    write_harness(&ws.root, TWO_CONFIGS);

    let run = run_dh(
        &ws,
        ["--json", "configs", "--root", &ws.root_arg(), "--configs", "optimized"],
        "configs_json",
    );
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);

    let doc = run.json();
    let configs = doc["configs"].as_array().unwrap();
    assert_eq!(configs.len(), 2);
    assert_eq!(configs[0]["name"], "baseline");
    assert_eq!(configs[0]["selected"], false);
    assert_eq!(configs[1]["name"], "optimized");
    assert_eq!(configs[1]["order"], 0);
    assert_eq!(configs[1]["mode"], "optimized");
    assert_eq!(doc["timeout_ms"], 10_000);
}

#[test]
fn e2e_env_overrides_harness_file() {
    let _log = common::test_log("e2e_env_overrides_harness_file");
    let ws = DhWorkspace::new();
    write_harness(&ws.root, &format!("{TWO_CONFIGS}timeout-ms: 2000\n"));

    let run = common::cli::run_dh_with_env(
        &ws,
        ["--json", "configs", "--root", &ws.root_arg()],
        [("DH_TIMEOUT_MS", "3000")],
        "configs_env",
    );
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);
    assert_eq!(run.json()["timeout_ms"], 3000);
}

#[test]
fn e2e_version_json() {
    let _log = common::test_log("e2e_version_json");
    let ws = DhWorkspace::new();

    let run = run_dh(&ws, ["--json", "version"], "version");
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);
    let doc = run.json();
    assert_eq!(doc["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(doc["backends"], serde_json::json!(["process"]));
}

#[test]
fn e2e_version_text() {
    let _log = common::test_log("e2e_version_text");
    Command::new(assert_cmd::cargo::cargo_bin!("dh"))
        .arg("version")
        .env("NO_COLOR", "1")
        .assert()
        .success()
        .stdout(
            predicate::str::starts_with("dh version ")
                .and(predicate::str::contains(env!("CARGO_PKG_VERSION"))),
        );
}

#[test]
fn e2e_run_requires_root() {
    let _log = common::test_log("e2e_run_requires_root");
    Command::new(assert_cmd::cargo::cargo_bin!("dh"))
        .arg("run")
        .env_remove("DH_ROOT")
        .assert()
        .failure()
        .stderr(predicate::str::contains("--root"));
}

#[test]
fn e2e_completions_bash() {
    let _log = common::test_log("e2e_completions_bash");
    let ws = DhWorkspace::new();

    let run = run_dh(&ws, ["completions", "bash"], "completions_bash");
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);
    for needle in ["_dh", "run", "list", "configs", "--deadline-ms"] {
        assert!(run.stdout.contains(needle), "bash completions missing {needle}");
    }
}

#[test]
fn e2e_completions_to_file() {
    let _log = common::test_log("e2e_completions_to_file");
    let ws = DhWorkspace::new();
    let out = ws.temp_dir.path().join("_dh");

    let run = run_dh(
        &ws,
        ["completions", "zsh", "-o", out.to_str().unwrap()],
        "completions_file",
    );
    assert_eq!(run.code(), Some(0), "stderr: {}", run.stderr);
    assert!(fs::read_to_string(&out).unwrap().contains("#compdef dh"));
}
