use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::tempdir;

fn cli_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("bf"))
}

fn write_keys(path: &std::path::Path, count: usize, prefix: &str) {
    let body: String = (0..count).map(|i| format!("{prefix}{i}\n")).collect();
    fs::write(path, body).unwrap();
}

#[test]
fn build_then_query_finds_every_key() {
    let tmp = tempdir().expect("tempdir");
    let keys = tmp.path().join("keys.txt");
    let snap = tmp.path().join("bf.out");
    write_keys(&keys, 200, "member-");

    for kind in ["basic", "blocked"] {
        cli_cmd()
            .args(["build", "-k", keys.to_str().unwrap(), "-f", "0.01", "-n", "200"])
            .args(["-o", snap.to_str().unwrap(), "--kind", kind, "--seed", "7"])
            .assert()
            .success();

        let assert = cli_cmd()
            .args(["query", "-i", snap.to_str().unwrap(), "-q", keys.to_str().unwrap()])
            .assert()
            .success()
            .stdout(predicate::str::contains("member-0:Y"))
            .stdout(predicate::str::contains("member-199:Y"));
        let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
        assert_eq!(out.lines().count(), 200);
        assert!(out.lines().all(|l| l.ends_with(":Y")));
    }
}

#[test]
fn query_reports_absent_keys() {
    let tmp = tempdir().expect("tempdir");
    let keys = tmp.path().join("keys.txt");
    let queries = tmp.path().join("queries.txt");
    let snap = tmp.path().join("bf.out");
    write_keys(&keys, 100, "in-");
    write_keys(&queries, 2000, "out-");

    cli_cmd()
        .args(["build", "-k", keys.to_str().unwrap(), "-f", "0.01", "-n", "100"])
        .args(["-o", snap.to_str().unwrap(), "--seed", "1"])
        .assert()
        .success();

    let assert = cli_cmd()
        .args(["query", "-i", snap.to_str().unwrap(), "-q", queries.to_str().unwrap()])
        .assert()
        .success();
    let out = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let yes = out.lines().filter(|l| l.ends_with(":Y")).count();
    let no = out.lines().filter(|l| l.ends_with(":N")).count();
    assert_eq!(yes + no, 2000);
    // 1% target; a blocked filter this small lands well under 5%
    assert!(yes < 100, "{yes} false positives");
}

#[test]
fn same_seed_gives_identical_snapshots() {
    let tmp = tempdir().expect("tempdir");
    let keys = tmp.path().join("keys.txt");
    write_keys(&keys, 50, "k");
    let a = tmp.path().join("a.bf");
    let b = tmp.path().join("b.bf");
    for out in [&a, &b] {
        cli_cmd()
            .args(["build", "-k", keys.to_str().unwrap(), "-f", "0.05", "-n", "50"])
            .args(["-o", out.to_str().unwrap(), "--seed", "99"])
            .assert()
            .success();
    }
    assert_eq!(fs::read(&a).unwrap(), fs::read(&b).unwrap());
}

#[test]
fn info_prints_json_shape() {
    let tmp = tempdir().expect("tempdir");
    let keys = tmp.path().join("keys.txt");
    let snap = tmp.path().join("bf.out");
    write_keys(&keys, 1000, "x");

    cli_cmd()
        .args(["build", "-k", keys.to_str().unwrap(), "-f", "0.01", "-n", "1000"])
        .args(["-o", snap.to_str().unwrap(), "--kind", "blocked"])
        .assert()
        .success();

    cli_cmd()
        .args(["info", "-i", snap.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"kind\": \"blocked\""))
        .stdout(predicate::str::contains("\"blocks\": 19"))
        .stdout(predicate::str::contains("\"block_bits\": 512"));
}

#[test]
fn invalid_parameters_fail() {
    let tmp = tempdir().expect("tempdir");
    let keys = tmp.path().join("keys.txt");
    write_keys(&keys, 10, "k");
    let snap = tmp.path().join("bf.out");

    for (fpr, n) in [("1.5", "10"), ("0", "10"), ("0.1", "0")] {
        cli_cmd()
            .args(["build", "-k", keys.to_str().unwrap(), "-f", fpr, "-n", n])
            .args(["-o", snap.to_str().unwrap()])
            .assert()
            .failure();
    }
    assert!(!snap.exists());
}

#[test]
fn unreadable_inputs_fail() {
    let tmp = tempdir().expect("tempdir");
    let missing = tmp.path().join("missing.txt");
    let snap = tmp.path().join("bf.out");

    cli_cmd()
        .args(["build", "-k", missing.to_str().unwrap(), "-f", "0.01", "-n", "10"])
        .args(["-o", snap.to_str().unwrap()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("key file"));

    let garbage = tmp.path().join("garbage.bf");
    fs::write(&garbage, b"definitely not a snapshot").unwrap();
    cli_cmd()
        .args(["query", "-i", garbage.to_str().unwrap(), "-q", missing.to_str().unwrap()])
        .assert()
        .failure();

    cli_cmd()
        .args(["info", "-i", missing.to_str().unwrap()])
        .assert()
        .failure();
}

#[test]
fn trial_prints_csv() {
    cli_cmd()
        .args(["trial", "--trials", "2", "--min-n", "100", "--max-n", "300"])
        .args(["--queries", "1000", "--seed", "3"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("N,FPR,Basic predicted FPR,Blocked predicted FPR"))
        .stdout(predicate::function(|s: &str| s.lines().count() == 3));
}

#[test]
fn oversized_seed_count_is_an_error_not_an_abort() {
    let tmp = tempdir().expect("tempdir");
    let snap = tmp.path().join("huge_k.bf");
    let mut bytes = Vec::new();
    bytes.extend_from_slice(b"BLMS");
    bytes.extend_from_slice(&1u16.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // basic
    bytes.extend_from_slice(&u32::MAX.to_le_bytes()); // k
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&1u64.to_le_bytes());
    bytes.extend_from_slice(&0u64.to_le_bytes());
    bytes.extend_from_slice(&u32::MAX.to_le_bytes()); // nseeds
    bytes.extend_from_slice(&42u64.to_le_bytes());
    let crc = bloomset_core::utils::crc32(&bytes);
    bytes.extend_from_slice(&crc.to_le_bytes());
    fs::write(&snap, bytes).unwrap();

    cli_cmd()
        .args(["info", "-i", snap.to_str().unwrap()])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("cannot load snapshot"));
}
