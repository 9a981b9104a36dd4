use serde_json::{json, Value};

use corogen::compile::{compile_file_to_c, CompileErrorKind, CompileOptions, CompilerError, FuncOutput};
use corogen::language::GenLimits;

use corogen_program::*;

fn try_compile(effect: &str, out: Value, body: Value) -> Result<FuncOutput, CompilerError> {
    let options = CompileOptions {
        package: "base".to_string(),
        line_comments: false,
        limits: GenLimits::default(),
    };
    let bytes = file(vec![func("f", effect, out, body)]);
    let mut funcs = compile_file_to_c(&bytes, &options)?;
    Ok(funcs.remove(0))
}

fn compile(effect: &str, body: Value) -> FuncOutput {
    try_compile(effect, Value::Null, body).expect("function must compile")
}

#[test]
fn io_bind_on_local_snapshots_and_restores_cursors() {
    let out = compile(
        "?",
        json!([io_bind(
            reader("r"),
            json!("buf"),
            json!([expr(call_q("read_u8", reader("r"), &[]))]),
        )]),
    );
    assert_eq!(
        out.c_src,
        "{\n\
         \x20 rt_io_reader o_0_v_r = v_r;\n\
         \x20 uint8_t* o_0_iop_v_r = iop_v_r;\n\
         \x20 uint8_t* o_0_io1_v_r = io1_v_r;\n\
         \x20 rt_io_reader_set(&v_r, &u_r, &iop_v_r, &io1_v_r, v_buf);\n\
         \x20 {\n\
         \x20   RT_COROUTINE_SUSPENSION_POINT(1);\n\
         \x20   if (iop_v_r == io1_v_r) {\n\
         \x20     status = rt_suspension_short_read;\n\
         \x20     goto suspend;\n\
         \x20   }\n\
         \x20   iop_v_r++;\n\
         \x20 }\n\
         \x20 v_r = o_0_v_r;\n\
         \x20 iop_v_r = o_0_iop_v_r;\n\
         \x20 io1_v_r = o_0_io1_v_r;\n\
         }\n"
    );
    assert_eq!(out.stats.io_binds, 1);
}

#[test]
fn io_limit_on_argument_restores_only_the_value() {
    let out = compile(
        "?",
        json!([io_limit(
            typed(json!(["args", "dst"]), json!("io_writer")),
            json!(16),
            json!([]),
        )]),
    );
    assert_eq!(
        out.c_src,
        "{\n\
         \x20 rt_io_writer o_0_a_dst = a_dst;\n\
         \x20 rt_io_writer_set_limit(&a_dst, iop_a_dst, 16);\n\
         \x20 a_dst = o_0_a_dst;\n\
         }\n"
    );
}

#[test]
fn nested_io_binds_restore_inner_first() {
    let out = compile(
        "?",
        json!([io_bind(
            reader("r"),
            json!("a"),
            json!([io_limit(reader("r"), json!(4), json!([]))]),
        )]),
    );
    let restores: Vec<&str> = out
        .c_src
        .lines()
        .map(str::trim)
        .filter(|l| l.starts_with("v_r = o_"))
        .collect();
    assert_eq!(restores, vec!["v_r = o_1_v_r;", "v_r = o_0_v_r;"]);
    assert_eq!(out.stats.io_binds, 2);
}

#[test]
fn io_bind_requires_io_type() {
    let err = try_compile(
        "?",
        Value::Null,
        json!([io_bind(json!("r"), json!("buf"), json!([]))]),
    )
    .expect_err("must fail");
    assert_eq!(err.kind, CompileErrorKind::Typing);
}

#[test]
fn iterate_unrolls_then_finishes_the_remainder() {
    let out = compile(
        "",
        json!([iterate(
            "p",
            json!(["args", "src"]),
            4,
            2,
            json!([assign(json!("n"), json!("u32"), "+=", json!(1))]),
        )]),
    );
    assert_eq!(
        out.c_src,
        "{\n\
         \x20 rt_slice_u8 i_slice_p = a_src;\n\
         \x20 v_p = i_slice_p;\n\
         \x20 v_p.len = 4;\n\
         \x20 uint8_t* i_end0_p = i_slice_p.ptr + (i_slice_p.len / 8) * 8;\n\
         \x20 while (v_p.ptr < i_end0_p) {\n\
         \x20   v_n += 1;\n\
         \x20   v_p.ptr += 4;\n\
         \x20   v_n += 1;\n\
         \x20   v_p.ptr += 4;\n\
         \x20 }\n\
         \x20 v_p.len = 4;\n\
         \x20 uint8_t* i_end1_p = i_slice_p.ptr + (i_slice_p.len / 4) * 4;\n\
         \x20 while (v_p.ptr < i_end1_p) {\n\
         \x20   v_n += 1;\n\
         \x20   v_p.ptr += 4;\n\
         \x20 }\n\
         }\n"
    );
}

#[test]
fn else_iterate_rounds_continue_the_numbering() {
    let mut it = iterate("p", json!("q"), 8, 1, json!([]));
    it["else"] = json!({ "length": 1, "unroll": 1, "body": [] });
    let out = compile("", json!([it]));
    assert!(out.c_src.contains("uint8_t* i_end0_p = i_slice_p.ptr + (i_slice_p.len / 8) * 8;"));
    assert!(out.c_src.contains("uint8_t* i_end1_p = i_slice_p.ptr + (i_slice_p.len / 1) * 1;"));
    assert!(!out.c_src.contains("i_end2_p"));
}

#[test]
fn iterate_break_shares_one_label_across_unrolled_copies() {
    let out = compile(
        "",
        json!([iterate("p", json!("q"), 1, 2, json!([jump("break", None)]))]),
    );
    assert_eq!(out.c_src.matches("goto label_0_break;").count(), 3);
    assert_eq!(out.c_src.matches("label_0_break:;").count(), 1);
    assert!(out.c_src.ends_with("}\nlabel_0_break:;\n"), "{}", out.c_src);
}

#[test]
fn continue_within_iterate_is_unsupported() {
    let err = try_compile(
        "",
        Value::Null,
        json!([iterate("p", json!("q"), 1, 1, json!([jump("continue", None)]))]),
    )
    .expect_err("must fail");
    assert_eq!(err.kind, CompileErrorKind::Unsupported);
}

#[test]
fn iterate_without_assigns_emits_nothing() {
    let out = compile(
        "",
        json!([{ "kind": "iterate", "assigns": [], "length": 1, "body": [] }]),
    );
    assert_eq!(out.c_src, "");
}

#[test]
fn iterate_rejects_zero_length() {
    let err = try_compile(
        "",
        Value::Null,
        json!([iterate("p", json!("q"), 0, 1, json!([]))]),
    )
    .expect_err("must fail");
    assert_eq!(err.kind, CompileErrorKind::Typing);
}

#[test]
fn ret_routes_by_status_class() {
    let out = compile("?", json!([ret(json!(["status", "?bad header"]))]));
    assert_eq!(out.c_src, "status = \"?bad header\";\ngoto exit;\n");
    assert!(!out.has_goto_ok);

    let out = compile("?", json!([ret(json!(["status", "@end of data"]))]));
    assert_eq!(out.c_src, "status = \"@end of data\";\ngoto ok;\n");
    assert!(out.has_goto_ok);

    let out = compile("?", json!([ret(json!("s"))]));
    assert_eq!(
        out.c_src,
        "status = v_s;\n\
         if (rt_status_is_error(status)) {\n\
         \x20 goto exit;\n\
         } else if (rt_status_is_suspension(status)) {\n\
         \x20 status = rt_error_cannot_return_a_suspension;\n\
         \x20 goto exit;\n\
         }\n\
         goto ok;\n"
    );
    assert!(out.has_goto_ok);
}

#[test]
fn ret_in_plain_function_returns_value() {
    let out = try_compile("", json!("u32"), json!([ret(json!(["+", "a", 1]))]))
        .expect("compile");
    assert_eq!(out.c_src, "return (v_a + 1);\n");

    let err = try_compile("", Value::Null, json!([ret(json!("a"))])).expect_err("must fail");
    assert_eq!(err.kind, CompileErrorKind::Unsupported);
}

#[test]
fn loops_inside_unrolled_bodies_get_fresh_labels_per_copy() {
    let out = compile(
        "",
        json!([iterate(
            "p",
            json!("q"),
            1,
            2,
            json!([while_(None, json!(true), json!([jump("break", None)]))]),
        )]),
    );
    for jt in 0..3 {
        let label = format!("label_{jt}_break:;");
        assert_eq!(out.c_src.matches(&label).count(), 1, "{}", out.c_src);
        let goto = format!("goto label_{jt}_break;");
        assert_eq!(out.c_src.matches(&goto).count(), 1, "{}", out.c_src);
    }
    assert_eq!(out.stats.jump_targets, 3);
}

fn trimmed_lines(c_src: &str) -> Vec<&str> {
    c_src.lines().map(str::trim).collect()
}

#[test]
fn break_out_of_io_bind_restores_before_jumping() {
    let out = compile(
        "?",
        json!([while_(
            None,
            json!(true),
            json!([io_bind(reader("r"), json!("buf"), json!([jump("break", None)]))]),
        )]),
    );
    let lines = trimmed_lines(&out.c_src);
    let goto = lines
        .iter()
        .position(|l| *l == "goto label_0_break;")
        .expect("break goto");
    assert_eq!(
        lines[goto - 3..goto],
        ["v_r = o_0_v_r;", "iop_v_r = o_0_iop_v_r;", "io1_v_r = o_0_io1_v_r;"],
        "{}",
        out.c_src
    );
    assert!(out.c_src.ends_with("}\nlabel_0_break:;\n"), "{}", out.c_src);
}

#[test]
fn continue_out_of_nested_binds_restores_inner_first() {
    let out = compile(
        "?",
        json!([while_(
            None,
            json!(true),
            json!([io_bind(
                reader("r"),
                json!("a"),
                json!([io_limit(
                    writer("w"),
                    json!(4),
                    json!([jump("continue", None)]),
                )]),
            )]),
        )]),
    );
    let lines = trimmed_lines(&out.c_src);
    let goto = lines
        .iter()
        .position(|l| *l == "goto label_0_continue;")
        .expect("continue goto");
    assert_eq!(
        lines[goto - 6..goto],
        [
            "v_w = o_1_v_w;",
            "iop_v_w = o_1_iop_v_w;",
            "io1_v_w = o_1_io1_v_w;",
            "v_r = o_0_v_r;",
            "iop_v_r = o_0_iop_v_r;",
            "io1_v_r = o_0_io1_v_r;",
        ],
        "{}",
        out.c_src
    );
}

#[test]
fn jump_within_the_bind_body_keeps_the_bind() {
    let out = compile(
        "?",
        json!([io_bind(
            reader("r"),
            json!("buf"),
            json!([while_(None, json!(true), json!([jump("break", None)]))]),
        )]),
    );
    let lines = trimmed_lines(&out.c_src);
    let goto = lines
        .iter()
        .position(|l| *l == "goto label_0_break;")
        .expect("break goto");
    assert!(lines[goto - 1].starts_with("while ("), "{}", out.c_src);
    assert_eq!(out.c_src.matches("v_r = o_0_v_r;").count(), 1);
}

#[test]
fn iterate_rejects_large_or_uneven_factors() {
    for (length, unroll) in [(1, 2_000_000), (3, 1), (1, 512), (512, 1)] {
        let err = try_compile(
            "",
            Value::Null,
            json!([iterate("p", json!("q"), length, unroll, json!([]))]),
        )
        .expect_err("must fail");
        assert_eq!(err.kind, CompileErrorKind::Typing, "{}", err.message);
    }

    let mut it = iterate("p", json!("q"), 4, 256, json!([]));
    it["else"] = json!({ "length": 1, "unroll": 3, "body": [] });
    let err = try_compile("", Value::Null, json!([it])).expect_err("else round must fail");
    assert_eq!(err.kind, CompileErrorKind::Typing);
}
