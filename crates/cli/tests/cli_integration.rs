//! CLI integration tests for all implemented subcommands.
//!
//! Uses `assert_cmd` to spawn the `edf` binary and verify exit codes,
//! stdout content, and stderr content. Documents are piped through
//! stdin where possible; file fixtures live in per-test temp dirs.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

/// Helper: create a Command for the `edf` binary.
fn edf() -> Command {
    cargo_bin_cmd!("edf")
}

// ──────────────────────────────────────────────
// 1. Help and version
// ──────────────────────────────────────────────

#[test]
fn help_exits_0_with_description() {
    edf()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("EDF document toolchain"));
}

#[test]
fn version_exits_0() {
    edf()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("edf"));
}

#[test]
fn to_json_help_lists_schema_flag() {
    edf()
        .args(["to-json", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--schema"));
}

// ──────────────────────────────────────────────
// 2. to-json subcommand
// ──────────────────────────────────────────────

#[test]
fn to_json_emits_canonical_json() {
    edf()
        .args(["to-json", "-"])
        .write_stdin("point {\n    x = 1\n    y = 2\n}\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"$kind\": \"point\""))
        .stdout(predicate::str::contains("\"x\": 1"));
}

#[test]
fn to_json_compact_is_a_single_line() {
    edf()
        .args(["to-json", "-", "--compact"])
        .write_stdin("point { x = 1 }")
        .assert()
        .success()
        .stdout("[{\"$kind\":\"point\",\"$name\":null,\"$children\":[],\"x\":1}]\n");
}

#[test]
fn to_json_object_unwraps_a_single_root() {
    edf()
        .args(["to-json", "-", "--compact", "--object"])
        .write_stdin("point { x = 1 }")
        .assert()
        .success()
        .stdout("{\"$kind\":\"point\",\"$name\":null,\"$children\":[],\"x\":1}\n");
}

#[test]
fn to_json_object_rejects_multiple_roots() {
    edf()
        .args(["to-json", "-", "--object"])
        .write_stdin("a { \"x\" }\nb { \"y\" }\n")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("expected a single object, found 2"));
}

#[test]
fn to_json_with_schema_datafies() {
    let tmp = TempDir::new().unwrap();
    let schema_path = tmp.path().join("greeting.schema.edf");
    fs::write(
        &schema_path,
        concat!(
            "block greeting {\n",
            "  attribute message {\n",
            "    type = \"string\"\n",
            "    required = 1\n",
            "  }\n",
            "}\n",
        ),
    )
    .unwrap();

    edf()
        .args(["to-json", "-", "--compact", "--schema"])
        .arg(&schema_path)
        .write_stdin("greeting hi { message = \"hello\" }")
        .assert()
        .success()
        .stdout("[{\"id\":\"hi\",\"message\":\"hello\"}]\n");
}

#[test]
fn to_json_writes_to_an_output_file() {
    let tmp = TempDir::new().unwrap();
    let out_path = tmp.path().join("out.json");

    edf()
        .args(["to-json", "-", "--compact", "-o"])
        .arg(&out_path)
        .write_stdin("point { x = 1 }")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());

    let written = fs::read_to_string(&out_path).unwrap();
    assert_eq!(
        written,
        "[{\"$kind\":\"point\",\"$name\":null,\"$children\":[],\"x\":1}]\n"
    );
}

#[test]
fn to_json_nonexistent_input_exits_1() {
    edf()
        .args(["to-json", "no_such_file_xyz.edf"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("error reading"));
}

// ──────────────────────────────────────────────
// 3. to-xml subcommand
// ──────────────────────────────────────────────

#[test]
fn to_xml_emits_a_document_wrapper() {
    edf()
        .args(["to-xml", "-"])
        .write_stdin("greeting hello { lang = \"en\" }")
        .assert()
        .success()
        .stdout(concat!(
            "<?xml version=\"1.0\" ?>\n",
            "<document>\n",
            "  <greeting id=\"hello\" lang=\"en\"/>\n",
            "</document>\n",
        ));
}

#[test]
fn to_xml_renders_single_values_as_text() {
    edf()
        .args(["to-xml", "-"])
        .write_stdin("note { \"a < b\" }")
        .assert()
        .success()
        .stdout(predicate::str::contains("<note>a &lt; b</note>"));
}

// ──────────────────────────────────────────────
// 4. parse-schema subcommand
// ──────────────────────────────────────────────

#[test]
fn parse_schema_emits_schema_json() {
    edf()
        .args(["parse-schema", "-"])
        .write_stdin(concat!(
            "block tag {\n",
            "  attribute label {\n",
            "    type = \"string\"\n",
            "  }\n",
            "}\n",
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"tag\""))
        .stdout(predicate::str::contains("\"name\": \"label\""));
}

#[test]
fn parse_schema_rejects_non_schema_documents() {
    edf()
        .args(["parse-schema", "-"])
        .write_stdin("tag x { }")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("schema error"));
}

// ──────────────────────────────────────────────
// 5. tokens subcommand
// ──────────────────────────────────────────────

#[test]
fn tokens_marks_fabricated_and_error_tokens() {
    edf()
        .args(["tokens", "-"])
        .write_stdin("block { a = \"1\"")
        .assert()
        .success()
        .stdout(concat!(
            "1:1 Name \"block\"\n",
            "1:7 LBrace \"{\"\n",
            "1:9 Name \"a\"\n",
            "1:11 Equals \"=\"\n",
            "1:13 Str \"\\\"1\\\"\"\n",
            "1:16 Semicolon \"\" fabricated\n",
            "1:16 RBrace \"\" fabricated error\n",
        ));
}

// ──────────────────────────────────────────────
// 6. Error reporting
// ──────────────────────────────────────────────

#[test]
fn lexical_errors_exit_1_with_position() {
    edf()
        .args(["to-json", "-"])
        .write_stdin("ab?cd")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("lexical error at 1:3"));
}

#[test]
fn build_errors_exit_1() {
    edf()
        .args(["to-json", "-"])
        .write_stdin("block {\n  a = 1\n  a = 2\n}\n")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("build error"));
}

#[test]
fn json_errors_flag_emits_structured_errors() {
    edf()
        .args(["to-json", "--json-errors", "-"])
        .write_stdin("ab?cd")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("\"error\": \"lexical\""));
}
