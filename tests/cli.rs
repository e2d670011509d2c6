use std::{fs, io::Write};

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

fn write_sample(name: &str, contents: &[u8]) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempdir().expect("temp dir");
    let file_path = dir.path().join(name);
    let mut file = fs::File::create(&file_path).expect("create sample");
    file.write_all(contents).expect("write sample");
    (dir, file_path)
}

fn csv_sleuth() -> Command {
    Command::cargo_bin("csv-sleuth").expect("binary exists")
}

#[test]
fn text_output_describes_semicolon_file() {
    let (_dir, path) = write_sample(
        "orders.csv",
        b"id;name;amount\n1;Alice;42.5\n2;Bob;13.37\n3;Carol;7\n",
    );
    csv_sleuth()
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("Delimiter: ;"))
        .stdout(contains("Has header: true"))
        .stdout(contains("Columns: 3"));
}

#[test]
fn json_output_lists_columns() {
    let (_dir, path) = write_sample("people.csv", b"ID,Name\n1,Alice\n2,Bob\n");
    let output = csv_sleuth()
        .args(["--format", "json"])
        .arg(&path)
        .output()
        .expect("run binary");
    assert!(output.status.success());

    let value: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("parse json output");
    assert_eq!(value["delimiter"], ",");
    assert_eq!(value["code_page"], 65001);
    assert_eq!(value["has_header"], true);
    assert_eq!(value["columns"], serde_json::json!(["ID", "Name"]));
}

#[test]
fn tab_delimiter_prints_sentinel() {
    let (_dir, path) = write_sample("data.tsv", b"a\tb\tc\n1\t2\t3\n4\t5\t6\n");
    csv_sleuth()
        .arg("--delimiter-only")
        .arg(&path)
        .assert()
        .success()
        .stdout("TAB\n");
}

#[test]
fn pinned_skip_rows_and_header() {
    let (_dir, path) = write_sample("report.csv", b"Quarterly report\nx,y\n1,2\n3,4\n");
    csv_sleuth()
        .args(["--skip-rows", "1", "--no-header", "--verbose"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("Preamble rows: 1"))
        .stdout(contains("Has header: false"))
        .stdout(contains("header: Overridden"))
        .stdout(contains("1: Column1"));
}

#[test]
fn conflicting_override_is_reported() {
    let (_dir, path) = write_sample("pipes.csv", b"a|b\n1|2\n3|4\n");
    csv_sleuth()
        .args(["-d", "|", "-q", "|", "--verbose"])
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("Ignored override"));
}

#[test]
fn empty_columns_flag() {
    let (_dir, path) = write_sample("sparse.csv", b"ID,Note,Value\n1,,5\n2,,6\n3,,7\n");
    csv_sleuth()
        .arg("--empty-columns")
        .arg(&path)
        .assert()
        .success()
        .stdout(contains("Empty columns: Note"));
}

#[test]
fn missing_file_fails() {
    csv_sleuth()
        .arg("does-not-exist.csv")
        .assert()
        .failure()
        .stderr(contains("Error processing does-not-exist.csv"));
}

#[test]
fn csv_output_quotes_paths_with_commas() {
    let (_dir, path) = write_sample("sales, 2024.csv", b"id,name\n1,Alice\n2,Bob\n");
    let output = csv_sleuth()
        .args(["--format", "csv"])
        .arg(&path)
        .output()
        .expect("run binary");
    assert!(output.status.success());

    let mut reader = csv::Reader::from_reader(output.stdout.as_slice());
    let headers = reader.headers().expect("csv header").clone();
    assert_eq!(&headers[0], "file");
    let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.expect("csv row")).collect();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), headers.len());
    assert_eq!(&rows[0][0], path.display().to_string());
    assert_eq!(&rows[0][3], ",");
}
