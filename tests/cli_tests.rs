//! CLI integration tests.

mod harness;

use std::io::Write;

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

use harness::temp_db::TempDb;

const NOW: &str = "2024-03-20T12:00:00Z";

fn temp_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .prefix("dashmetrics-cli-")
        .suffix(".toml")
        .tempfile()
        .expect("create temp config");
    file.write_all(contents.as_bytes()).expect("write temp config");
    file
}

fn dashmetrics() -> Command {
    let mut cmd = cargo_bin_cmd!("dashmetrics");
    cmd.env_remove("DASHMETRICS_DATABASE_URL").env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    dashmetrics()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("range"))
        .stdout(predicate::str::contains("expression"))
        .stdout(predicate::str::contains("trend"))
        .stdout(predicate::str::contains("partition"));
}

#[test]
fn version_names_the_binary() {
    dashmetrics()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("dashmetrics"));
}

#[test]
fn range_resolves_month_to_date() {
    dashmetrics()
        .args(["--json", "range", "MTD", "--now", NOW])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"command\":\"range\""))
        .stdout(predicate::str::contains("2024-03-01T00:00:00.000000Z"));
}

#[test]
fn range_rejects_malformed_duration() {
    dashmetrics()
        .args(["range", "P15", "--now", NOW])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid range token 'P15'"));
}

#[test]
fn ranges_include_configured_aliases() {
    let config = temp_config("[ranges.aliases]\nfortnight = \"P2W\"\n");
    dashmetrics()
        .arg("--config")
        .arg(config.path())
        .args(["--json", "ranges"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fortnight"))
        .stdout(predicate::str::contains("WTD"));
}

#[test]
fn expression_renders_postgres_week() {
    dashmetrics()
        .args([
            "expression",
            "--backend",
            "pgsql",
            "--unit",
            "week",
            "--timezone",
            "America/New_York",
            "--now",
            NOW,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("IYYY-IW"))
        .stdout(predicate::str::contains("4 hour"));
}

#[test]
fn expression_rejects_unknown_backend() {
    dashmetrics()
        .args(["expression", "--backend", "oracle"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("oracle"));
}

#[test]
fn value_reads_sqlite_table() {
    let db = TempDb::create("cli-value");
    dashmetrics()
        .arg("--json")
        .arg("value")
        .arg("--db")
        .arg(db.path())
        .args([
            "--table", "orders", "--function", "sum", "--column", "total", "--range", "MTD",
            "--precision", "2", "--now", NOW,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"value\":95.0"))
        .stdout(predicate::str::contains("\"previous\":50.0"))
        .stdout(predicate::str::contains("\"percent_changed\":90.0"));
}

#[test]
fn trend_fills_missing_days() {
    let db = TempDb::create("cli-trend");
    dashmetrics()
        .arg("--json")
        .arg("trend")
        .arg("--db")
        .arg(db.path())
        .args([
            "--table", "orders", "--function", "sum", "--column", "total", "--range", "7",
            "--precision", "2", "--now", NOW,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"March 13, 2024\":0.0"))
        .stdout(predicate::str::contains("\"March 20, 2024\":30.0"));
}

#[test]
fn partition_prints_groups() {
    let db = TempDb::create("cli-partition");
    dashmetrics()
        .arg("partition")
        .arg("--db")
        .arg(db.path())
        .args(["--table", "orders", "--group-by", "status"])
        .assert()
        .success()
        .stdout(predicate::str::contains("paid"))
        .stdout(predicate::str::contains("refunded"));
}

#[test]
fn invalid_config_exits_nonzero() {
    let config = temp_config("[metrics]\nprecision = 11\n");
    dashmetrics()
        .arg("--config")
        .arg(config.path())
        .args(["range", "MTD"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("precision"));
}
