use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const COLOURS: &str = r#"{
    "1": {"attributes": [{"trait_type": "color", "value": "red"}]},
    "2": {"attributes": [{"trait_type": "color", "value": "red"}]},
    "3": {"attributes": [{"trait_type": "color", "value": "blue"}, {"trait_type": "hat", "value": "cap"}]}
}"#;

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn write_input(dir: &Path, name: &str, contents: &str) {
    fs::write(dir.join(name), contents).expect("write input");
}

fn rarank() -> Command {
    Command::cargo_bin("rarank").expect("binary exists")
}

#[test]
fn rank_writes_rank_table() {
    let workspace = temp_workspace();
    write_input(workspace.path(), "tokens.json", COLOURS);

    rarank()
        .current_dir(workspace.path())
        .args([
            "--quiet",
            "rank",
            "tokens.json",
            "-o",
            "ranks.json",
            "--tie-policy",
            "sequential",
            "--pretty",
            "--no-progress",
        ])
        .assert()
        .success();

    let written = fs::read_to_string(workspace.path().join("ranks.json")).expect("ranks written");
    assert!(written.contains('\n'), "pretty output is indented");
    let ranks: Value = serde_json::from_str(&written).expect("ranks are valid JSON");
    let ranks = ranks.as_array().expect("array of ranks");
    assert_eq!(ranks.len(), 3);
    assert_eq!(ranks[0]["token_id"], 3);
    assert_eq!(ranks[0]["rank"], 1);
    assert_eq!(ranks[1]["token_id"], 1);
    assert_eq!(ranks[2]["rank"], 3);
}

#[test]
fn schema_reports_attributes_as_json() {
    let workspace = temp_workspace();
    write_input(workspace.path(), "tokens.json", COLOURS);

    let output = rarank()
        .current_dir(workspace.path())
        .args(["--quiet", "schema", "tokens.json", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let summary: Value = serde_json::from_slice(&output).expect("schema output is valid JSON");
    assert_eq!(summary["tokens"], 3);
    assert_eq!(summary["total_supply"], 3);
    assert_eq!(summary["token_type"], "non-fungible");
    assert_eq!(summary["attributes"]["hat"]["token_count"], 1);
    assert_eq!(summary["attributes"]["color"]["value_count"], 2);
}

#[test]
fn checksum_is_stable_across_input_order() {
    let workspace = temp_workspace();
    write_input(workspace.path(), "object.json", COLOURS);
    write_input(
        workspace.path(),
        "records.json",
        r#"[
            {"token_id": 3, "attributes": [{"name": "color", "value": "blue"}, {"name": "hat", "value": "cap"}]},
            {"token_id": 2, "attributes": [{"name": "color", "value": "red"}]},
            {"token_id": 1, "attributes": [{"name": "color", "value": "red"}]}
        ]"#,
    );

    let digest = |input: &str| {
        let output = rarank()
            .current_dir(workspace.path())
            .args(["--quiet", "checksum", input])
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        String::from_utf8(output).expect("utf8").trim().to_string()
    };

    let first = digest("object.json");
    assert_eq!(first.len(), 64);
    assert_eq!(first, digest("records.json"));
}

#[test]
fn invalid_collection_fails() {
    let workspace = temp_workspace();
    write_input(
        workspace.path(),
        "tokens.json",
        r#"{"1": {"attributes": [{"trait_type": "color", "value": "red"}, {"trait_type": "color", "value": "blue"}]}}"#,
    );

    rarank()
        .current_dir(workspace.path())
        .args(["--quiet", "rank", "tokens.json"])
        .assert()
        .failure();

    rarank()
        .current_dir(workspace.path())
        .args(["--quiet", "rank", "tokens.json", "--allow-duplicate-names"])
        .assert()
        .success();
    assert!(workspace.path().join("ranks.json").exists());
}

#[test]
fn zero_bins_are_rejected() {
    let workspace = temp_workspace();
    write_input(workspace.path(), "tokens.json", COLOURS);

    rarank()
        .current_dir(workspace.path())
        .args(["--quiet", "rank", "tokens.json", "--bins", "0"])
        .assert()
        .failure();
}
