use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use repo_core::core_api::Engine;
use repo_core::document::SaveDocument;
use repo_core::storage::backup_path;
use serde_json::{Value, json};

const MINE: &str = "Item Mine Explosive";

fn workspace_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../..")
}

fn fixture_path(name: &str) -> PathBuf {
    workspace_root().join("tests/fixtures").join(name)
}

fn fixture_arg() -> String {
    fixture_path("editable.es3").to_string_lossy().to_string()
}

fn run_cli(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_repo-se"))
        .env_remove("REPO_SE_PASSPHRASE")
        .args(args)
        .output()
        .expect("failed to run repo-se CLI")
}

fn temp_output_path(prefix: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}_{}_{}.{ext}", std::process::id(), nanos))
}

fn cleanup(path: &Path) {
    let _ = fs::remove_file(path);
    let _ = fs::remove_file(backup_path(path));
}

#[test]
fn cli_prints_text_sheet_by_default() {
    let path = fixture_arg();
    let output = run_cli(&[&path]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("R.E.P.O. SAVE: R.E.P.O."));
    assert!(stdout.contains("alice (76561198000000001)"));
    assert!(stdout.contains("-> Item Mine Explosive/2"));
}

#[test]
fn cli_prints_game_info_pairs() {
    let path = fixture_arg();
    let output = run_cli(&["--game-info", &path]);
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert_eq!(lines.first(), Some(&"game.teamName=R.E.P.O."));
    assert!(lines.contains(&"game.currency=37"));
    assert!(lines.contains(&"game.date=2025-03-14"));
    assert!(lines.iter().all(|line| line.starts_with("game.")));
}

#[test]
fn cli_json_respects_selection() {
    let path = fixture_arg();
    let output = run_cli(&["--json", "--players", &path]);
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("stdout should be json");
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["players"]);
    assert_eq!(value["players"][1]["name"], json!("bob"));
}

#[test]
fn cli_full_json_has_all_sections() {
    let path = fixture_arg();
    let output = run_cli(&["--json", &path]);
    assert!(output.status.success());

    let value: Value = serde_json::from_slice(&output.stdout).expect("stdout should be json");
    let keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["game_info", "players", "items"]);
}

#[test]
fn cli_rejects_set_without_output() {
    let path = fixture_arg();
    let output = run_cli(&["--set", "game.currency=1", &path]);
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--output"));
}

#[test]
fn cli_rejects_output_without_edits() {
    let path = fixture_arg();
    let out = temp_output_path("repo_se_no_edits", "es3");
    let out_arg = out.to_string_lossy().to_string();
    let output = run_cli(&["--output", &out_arg, &path]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!out.exists());
}

#[test]
fn cli_rejects_unknown_edit_target() {
    let path = fixture_arg();
    let out = temp_output_path("repo_se_bad_target", "es3");
    let out_arg = out.to_string_lossy().to_string();
    let output = run_cli(&["--set", "team.name=x", "--output", &out_arg, &path]);
    assert_eq!(output.status.code(), Some(2));
    assert!(!out.exists());
}

#[test]
fn cli_reports_missing_item_as_error() {
    let path = fixture_arg();
    let out = temp_output_path("repo_se_missing_item", "es3");
    let out_arg = out.to_string_lossy().to_string();
    let output = run_cli(&["--set", "item.Item Nothing/1.item=2", "--output", &out_arg, &path]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Item Nothing"));
    assert!(!out.exists());
}

#[test]
fn cli_writes_edits_and_rotates_backup() {
    let out = temp_output_path("repo_se_edit", "es3");
    fs::copy(fixture_path("editable.es3"), &out).expect("fixture copy");
    let out_arg = out.to_string_lossy().to_string();
    let mine_edit = format!("item.{MINE}/2.item=9");

    let output = run_cli(&[
        "--set",
        &mine_edit,
        "--set",
        "game.currency=250",
        "--output",
        &out_arg,
        &out_arg,
    ]);
    assert!(output.status.success());
    assert_eq!(
        String::from_utf8_lossy(&output.stdout).trim(),
        format!("Wrote edited save to {}", out.display())
    );

    let backup = backup_path(&out);
    assert_eq!(
        fs::read(&backup).expect("backup should exist"),
        fs::read(fixture_path("editable.es3")).unwrap()
    );

    let session = Engine::new().open_path(&out).expect("edited save should open");
    let doc = session.document();
    assert_eq!(doc.entry("item", &format!("{MINE}/2")), Some(&json!(9)));
    assert_eq!(doc.entry("item", &format!("{MINE}/1")), Some(&json!(3)));
    assert_eq!(doc.entry("runStats", "currency"), Some(&json!(250)));
    assert_eq!(doc.field_value("saveVersion"), Some(&json!(7)));

    cleanup(&out);
}

#[test]
fn cli_export_then_import_round_trips_the_document() {
    let path = fixture_arg();
    let exported = temp_output_path("repo_se_export", "json");
    let exported_arg = exported.to_string_lossy().to_string();

    let output = run_cli(&["--export-json", &exported_arg, &path]);
    assert!(output.status.success());
    let exported_value: Value =
        serde_json::from_slice(&fs::read(&exported).unwrap()).expect("export should be json");
    let fixture_value: Value =
        serde_json::from_slice(&fs::read(fixture_path("editable.json")).unwrap()).unwrap();
    assert_eq!(exported_value, fixture_value);

    let container = temp_output_path("repo_se_import", "es3");
    let container_arg = container.to_string_lossy().to_string();
    let output = run_cli(&["--import-json", &exported_arg, "--output", &container_arg]);
    assert!(output.status.success());

    let reopened = Engine::new()
        .open_path(&container)
        .expect("imported save should open");
    let original = SaveDocument::from_slice(&fs::read(fixture_path("editable.json")).unwrap())
        .unwrap();
    assert_eq!(reopened.document(), &original);

    let _ = fs::remove_file(&exported);
    cleanup(&container);
}

#[test]
fn cli_reports_wrong_passphrase() {
    let path = fixture_arg();
    let output = run_cli(&["--passphrase", "not it", &path]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("wrong passphrase"));
}

#[test]
fn cli_reads_passphrase_from_environment() {
    let doc = SaveDocument::from_slice(&fs::read(fixture_path("editable.json")).unwrap()).unwrap();
    let path = temp_output_path("repo_se_env_pass", "es3");
    fs::write(&path, doc.encrypt("hunter2").unwrap()).unwrap();
    let path_arg = path.to_string_lossy().to_string();

    let output = Command::new(env!("CARGO_BIN_EXE_repo-se"))
        .env("REPO_SE_PASSPHRASE", "hunter2")
        .args(["--game-info", &path_arg])
        .output()
        .expect("failed to run repo-se CLI");
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("game.level=4"));

    cleanup(&path);
}
