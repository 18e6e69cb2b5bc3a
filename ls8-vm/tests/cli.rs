use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

fn program(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("programs")
        .join(name)
}

fn ls8(args: &[&Path]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_ls8"))
        .args(args)
        .output()
        .expect("failed to spawn ls8")
}

fn scratch_file(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("ls8-{}-{}", std::process::id(), name));
    fs::write(&path, contents).unwrap();
    path
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

#[test]
fn prints_eight() {
    let output = ls8(&[&program("print8.ls8")]);

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "8\n");
}

#[test]
fn adds_and_halts() {
    let path = scratch_file(
        "sum.ls8",
        "10000010 # LDI R0,8\n00000000\n00001000\n\
         10000010 # LDI R1,9\n00000001\n00001001\n\
         10100000 # ADD R0,R1\n00000000\n00000001\n\
         01000111 # PRN R0\n00000000\n\
         00000001 # HLT\n\
         01000111 # never reached\n00000000\n",
    );

    let output = ls8(&[&path]);
    fs::remove_file(&path).ok();

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(stdout(&output), "17\n");
}

#[test]
fn sample_programs() {
    let cases = [
        ("mult.ls8", "72\n"),
        ("stack.ls8", "2\n4\n1\n"),
        ("call.ls8", "20\n30\n36\n60\n"),
        ("sctest.ls8", "1\n2\n3\n4\n5\n"),
        ("countdown.ls8", "3\n2\n1\ngo\n"),
    ];

    for (name, expected) in cases {
        let output = ls8(&[&program(name)]);
        assert_eq!(output.status.code(), Some(0), "{}", name);
        assert_eq!(stdout(&output), expected, "{}", name);
    }
}

#[test]
fn missing_file_exits_with_load_status() {
    let output = ls8(&[Path::new("definitely/not/here.ls8")]);

    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("definitely/not/here.ls8"));
}

#[test]
fn malformed_image_exits_with_load_status() {
    let path = scratch_file("malformed.ls8", "10000010\n0000000x\n");
    let output = ls8(&[&path]);
    fs::remove_file(&path).ok();

    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn unknown_opcode_exits_with_decode_status() {
    // PRN R0 runs, then 0b00000111 matches nothing
    let path = scratch_file(
        "bad-opcode.ls8",
        "01000111\n00000000\n00000111\n01000111\n00000000\n00000001\n",
    );
    let output = ls8(&[&path]);
    fs::remove_file(&path).ok();

    assert_eq!(output.status.code(), Some(2));
    assert_eq!(stdout(&output), "0\n");
    assert!(String::from_utf8_lossy(&output.stderr).contains("unrecognized instruction"));
}

#[test]
fn trace_goes_to_stderr() {
    let output = Command::new(env!("CARGO_BIN_EXE_ls8"))
        .arg("--trace")
        .arg(program("print8.ls8"))
        .output()
        .unwrap();

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert_eq!(stdout(&output), "8\n");
    assert!(stderr.contains("TRACE: 00 | 82 00 08 | 00 00 00 00 00 00 00 F4"));
    assert_eq!(stderr.lines().filter(|l| l.starts_with("TRACE:")).count(), 3);
}

#[test]
fn usage_error_is_distinct() {
    let output = Command::new(env!("CARGO_BIN_EXE_ls8")).output().unwrap();

    assert_eq!(output.status.code(), Some(64));
}
