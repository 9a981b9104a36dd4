use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::{json, Value};

use corogen_program::*;

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn temp_dir(prefix: &str) -> PathBuf {
    let base = std::env::temp_dir();
    let pid = std::process::id();
    let n = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    base.join(format!("{prefix}_{pid}_{n}"))
}

#[test]
fn cli_lang_id() {
    let out = Command::new(env!("CARGO_BIN_EXE_corogen"))
        .arg("lang-id")
        .output()
        .expect("run corogen lang-id");
    assert!(out.status.success());
    assert_eq!(
        String::from_utf8_lossy(&out.stdout).trim(),
        corogen::language::LANG_ID
    );
}

#[test]
fn cli_compile_writes_c_and_report() {
    let dir = temp_dir("corogen_cli_compile");
    std::fs::create_dir_all(&dir).expect("create temp dir");

    let input = dir.join("ok.ast.json");
    let program = file(vec![func(
        "decode",
        "?",
        Value::Null,
        json!([
            expr(call_q("fill", Value::Null, &[])),
            ret(json!("ok")),
        ]),
    )]);
    std::fs::write(&input, program).expect("write program");
    let c_path = dir.join("out").join("decode.c");

    let out = Command::new(env!("CARGO_BIN_EXE_corogen"))
        .arg("compile")
        .arg("--input")
        .arg(&input)
        .arg("--out")
        .arg(&c_path)
        .arg("--report-json")
        .output()
        .expect("run corogen compile");
    assert!(
        out.status.success(),
        "status={}\nstderr={}",
        out.status,
        String::from_utf8_lossy(&out.stderr)
    );

    let c_src = std::fs::read_to_string(&c_path).expect("read C output");
    assert!(c_src.starts_with("// fn decode\n"), "{c_src}");
    assert!(c_src.contains("RT_COROUTINE_SUSPENSION_POINT(1);"));

    let v: Value = serde_json::from_slice(&out.stdout).expect("parse report json");
    assert_eq!(v["schema_version"], corogen::language::REPORT_SCHEMA_VERSION);
    assert_eq!(v["ok"], true);
    assert_eq!(v["meta"]["funcs"][0]["name"], "decode");
    assert_eq!(v["meta"]["funcs"][0]["coro_susp_points"], 1);
    assert_eq!(v["meta"]["funcs"][0]["has_goto_ok"], true);
}

#[test]
fn cli_compile_failure_reports_diagnostic() {
    let dir = temp_dir("corogen_cli_compile_bad");
    std::fs::create_dir_all(&dir).expect("create temp dir");

    let input = dir.join("bad.ast.json");
    let program = file(vec![func(
        "f",
        "",
        Value::Null,
        json!([assign(json!("x"), json!("u32"), "&^=", json!(1))]),
    )]);
    std::fs::write(&input, program).expect("write program");

    let out = Command::new(env!("CARGO_BIN_EXE_corogen"))
        .arg("compile")
        .arg("--input")
        .arg(&input)
        .arg("--report-json")
        .output()
        .expect("run corogen compile");
    assert_eq!(out.status.code(), Some(1));

    let v: Value = serde_json::from_slice(&out.stdout).expect("parse report json");
    assert_eq!(v["ok"], false);
    assert_eq!(v["diagnostics"][0]["code"], "CG-UNSUPPORTED-0001");
    assert_eq!(v["diagnostics"][0]["stage"], "codegen");
    assert_eq!(v["diagnostics"][0]["loc"]["ptr"], "/funcs/0");
}

#[test]
fn cli_missing_input_is_a_tool_error() {
    let out = Command::new(env!("CARGO_BIN_EXE_corogen"))
        .arg("compile")
        .arg("--input")
        .arg(temp_dir("corogen_missing").join("nope.json"))
        .output()
        .expect("run corogen compile");
    assert_eq!(out.status.code(), Some(2));
}
