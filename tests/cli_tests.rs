//! CLI tests for the `structfuzz` binary.
//!
//! Test coverage areas:
//! - Target listing (text and JSON)
//! - Running targets with run budgets and seeds
//! - Config file loading and validation
//! - Error reporting for unknown targets

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn structfuzz() -> Command {
    #[allow(deprecated)]
    Command::cargo_bin("structfuzz").unwrap()
}

fn run_json(args: &[&str]) -> serde_json::Value {
    let output = structfuzz().args(args).arg("--json").output().unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

// =============================================================================
// Listing
// =============================================================================

mod list_tests {
    use super::*;

    #[test]
    fn test_list_names_every_target() {
        structfuzz()
            .arg("list")
            .assert()
            .success()
            .stdout(predicate::str::contains("abc"))
            .stdout(predicate::str::contains("classify"))
            .stdout(predicate::str::contains("tree"))
            .stdout(predicate::str::contains("pair_list"));
    }

    #[test]
    fn test_list_json_includes_signatures() {
        let json = run_json(&["list"]);
        let targets = json.as_array().unwrap();
        assert_eq!(targets.len(), 4);
        let classify = targets.iter().find(|t| t["name"] == "classify").unwrap();
        assert_eq!(classify["parameters"], serde_json::json!(["Classifier", "i32", "i32"]));
    }
}

// =============================================================================
// Running
// =============================================================================

mod run_tests {
    use super::*;

    #[test]
    fn test_run_respects_iteration_budget() {
        let json = run_json(&["run", "abc", "-n", "300", "--seed", "5"]);
        assert_eq!(json["executions"], 300);
        assert_eq!(json["seed"], 5);
        assert_eq!(json["stop_reason"]["type"], "RunBudget");
        assert!(json["new_paths"].as_u64().unwrap() > 0);
    }

    #[test]
    fn test_same_seed_same_coverage() {
        let first = run_json(&["run", "pair_list", "-n", "200", "--seed", "9"]);
        let second = run_json(&["run", "pair_list", "-n", "200", "--seed", "9"]);
        assert_eq!(first["new_paths"], second["new_paths"]);
        assert_eq!(first["trie_nodes"], second["trie_nodes"]);
        assert_eq!(first["interesting_cases"], second["interesting_cases"]);
    }

    #[test]
    fn test_human_report() {
        structfuzz()
            .args(["run", "tree", "-n", "50"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Fuzz target: tree"))
            .stdout(predicate::str::contains("New paths:"))
            .stdout(predicate::str::contains("Trace profile:"));
    }

    #[test]
    fn test_unknown_target_fails() {
        structfuzz()
            .args(["run", "nope"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown target 'nope'"));
    }
}

// =============================================================================
// Config Files
// =============================================================================

mod config_tests {
    use super::*;

    #[test]
    fn test_config_file_seed_is_used() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fuzz.json");
        std::fs::write(&path, r#"{ "seed": 42, "recursion_tree_depth": 2 }"#).unwrap();

        let json = run_json(&["run", "tree", "-n", "20", "--config", path.to_str().unwrap()]);
        assert_eq!(json["seed"], 42);
        assert_eq!(json["executions"], 20);
    }

    #[test]
    fn test_seed_flag_overrides_config() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fuzz.json");
        std::fs::write(&path, r#"{ "seed": 42 }"#).unwrap();

        let json = run_json(&[
            "run",
            "classify",
            "-n",
            "20",
            "--config",
            path.to_str().unwrap(),
            "--seed",
            "3",
        ]);
        assert_eq!(json["seed"], 3);
    }

    #[test]
    fn test_invalid_probability_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fuzz.json");
        std::fs::write(&path, r#"{ "prob_seed_retrieving": 1.5 }"#).unwrap();

        structfuzz()
            .args(["run", "abc", "--config", path.to_str().unwrap()])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Invalid config file"));
    }

    #[test]
    fn test_missing_config_file_is_reported() {
        structfuzz()
            .args(["run", "abc", "--config", "/nonexistent/fuzz.json"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Failed to read config file"));
    }
}
