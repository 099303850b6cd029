// SPDX-License-Identifier: MIT OR Apache-2.0
use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn describe_urn_prints_canonical_form() {
    Command::cargo_bin("cb")
        .unwrap()
        .args(["describe-urn", "cap:op=transcode;in=media:mp4;out=media:mp3"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"canonical\""))
        .stdout(predicate::str::contains("\"specificity\""));
}

#[test]
fn describe_urn_rejects_malformed_input() {
    Command::cargo_bin("cb")
        .unwrap()
        .args(["describe-urn", "not a urn"])
        .assert()
        .failure();
}

#[test]
fn resolve_inputs_reports_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("input.json");
    std::fs::write(&file_path, b"{\"a\": 1}").unwrap();

    Command::cargo_bin("cb")
        .unwrap()
        .args(["resolve-inputs", file_path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"files\""));
}

#[test]
fn graph_path_reports_unreachable_as_null() {
    let dir = tempfile::tempdir().unwrap();
    let edges_path = dir.path().join("edges.toml");
    std::fs::write(
        &edges_path,
        r#"
[[edges]]
from = "media:mp4"
to = "media:mp3"
cap = "cap:op=transcode;in=media:mp4;out=media:mp3"
registry_name = "builtin"
set_name = "media"
specificity = 2
"#,
    )
    .unwrap();

    Command::cargo_bin("cb")
        .unwrap()
        .args([
            "graph-path",
            "--block",
            edges_path.to_str().unwrap(),
            "--from",
            "media:mp4",
            "--to",
            "media:wav",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("null"));
}
