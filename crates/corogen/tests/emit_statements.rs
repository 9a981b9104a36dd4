use serde_json::{json, Value};

use corogen::compile::{compile_file_to_c, CompileErrorKind, CompileOptions, CompilerError, FuncOutput};
use corogen::language::GenLimits;

use corogen_program::*;

fn options() -> CompileOptions {
    CompileOptions {
        package: "base".to_string(),
        line_comments: false,
        limits: GenLimits::default(),
    }
}

fn try_compile_body(effect: &str, out: Value, body: Value) -> Result<FuncOutput, CompilerError> {
    let bytes = file(vec![func("f", effect, out, body)]);
    let mut funcs = compile_file_to_c(&bytes, &options())?;
    assert_eq!(funcs.len(), 1);
    Ok(funcs.remove(0))
}

fn compile_body(effect: &str, body: Value) -> FuncOutput {
    try_compile_body(effect, Value::Null, body).expect("function must compile")
}

#[test]
fn question_call_with_result_gets_out_temporary() {
    let out = compile_body(
        "?",
        json!([
            assign(
                json!("a"),
                json!("u32"),
                "=",
                typed(call_q("foo", Value::Null, &[]), json!("u32")),
            ),
            ret(json!("ok")),
        ]),
    );
    assert_eq!(
        out.c_src,
        "{\n\
         \x20 RT_COROUTINE_SUSPENSION_POINT(1);\n\
         \x20 uint32_t t_0;\n\
         \x20 status = base__foo(self, &t_0);\n\
         \x20 if (status) { goto suspend; }\n\
         \x20 v_a = t_0;\n\
         }\n\
         status = NULL;\n\
         goto ok;\n"
    );
    assert!(out.has_goto_ok);
    assert_eq!(out.stats.coro_susp_points, 1);
    assert_eq!(out.stats.temps, 1);
}

#[test]
fn bare_question_call_passes_null_out_pointer() {
    let out = compile_body(
        "?",
        json!([
            expr(call_q("bar", Value::Null, &[("x", json!(1))])),
            expr(typed(call_q("baz", Value::Null, &[]), json!("u8"))),
        ]),
    );
    assert_eq!(
        out.c_src,
        "{\n\
         \x20 RT_COROUTINE_SUSPENSION_POINT(1);\n\
         \x20 status = base__bar(self, 1);\n\
         \x20 if (status) { goto suspend; }\n\
         }\n\
         {\n\
         \x20 RT_COROUTINE_SUSPENSION_POINT(2);\n\
         \x20 status = base__baz(self, NULL);\n\
         \x20 if (status) { goto suspend; }\n\
         }\n"
    );
    assert!(!out.has_goto_ok);
}

#[test]
fn optional_call_jumps_to_exit_without_suspension_point() {
    let out = compile_body("!", json!([expr(json!(["call!", "check", null]))]));
    assert_eq!(
        out.c_src,
        "status = base__check(self);\nif (status) { goto exit; }\n"
    );
    assert_eq!(out.stats.coro_susp_points, 0);
}

#[test]
fn capture_form_binds_status_without_suspending() {
    let out = compile_body(
        "?",
        json!([assign(
            json!("s"),
            json!("status"),
            "=?",
            call_q("foo", Value::Null, &[]),
        )]),
    );
    assert_eq!(
        out.c_src,
        "{\n  rt_status t_0 = base__foo(self);\n  v_s = t_0;\n}\n"
    );
    assert_eq!(out.stats.coro_susp_points, 0);
}

#[test]
fn suspension_points_increase_in_emission_order() {
    let out = compile_body(
        "?",
        json!([
            expr(call_q("a", Value::Null, &[])),
            while_(
                None,
                json!(true),
                json!([expr(call_q("b", Value::Null, &[]))]),
            ),
            yield_(json!(["status", "$short read"])),
        ]),
    );
    let ids: Vec<&str> = out
        .c_src
        .lines()
        .filter(|l| l.contains("RT_COROUTINE_SUSPENSION_POINT"))
        .map(str::trim)
        .collect();
    assert_eq!(
        ids,
        vec![
            "RT_COROUTINE_SUSPENSION_POINT(1);",
            "RT_COROUTINE_SUSPENSION_POINT(2);",
            "RT_COROUTINE_SUSPENSION_POINT_MAYBE_SUSPEND(3);",
        ]
    );
    assert!(out.c_src.ends_with("status = \"$short read\";\nRT_COROUTINE_SUSPENSION_POINT_MAYBE_SUSPEND(3);\n"));
}

#[test]
fn counters_restart_for_each_function() {
    let body = json!([expr(call_q("a", Value::Null, &[]))]);
    let bytes = file(vec![
        func("f", "?", Value::Null, body.clone()),
        func("g", "?", Value::Null, body),
    ]);
    let funcs = compile_file_to_c(&bytes, &options()).expect("compile");
    assert_eq!(funcs[0].c_src, funcs[1].c_src);
    assert_eq!(funcs[0].stats, funcs[1].stats);
    assert_eq!(funcs[1].stats.coro_susp_points, 1);
    assert_eq!(funcs[1].stats.c_src_sha256.len(), 64);
}

#[test]
fn io_operands_are_synced_around_calls() {
    let out = compile_body(
        "?",
        json!([expr(call_q(
            "decode",
            Value::Null,
            &[("src", typed(json!(["args", "src"]), json!("io_reader")))],
        ))]),
    );
    assert_eq!(
        out.c_src,
        "{\n\
         \x20 RT_COROUTINE_SUSPENSION_POINT(1);\n\
         \x20 rt_io_reader_sync_out(&a_src, iop_a_src);\n\
         \x20 status = base__decode(self, a_src);\n\
         \x20 iop_a_src = rt_io_reader_sync_in(&a_src);\n\
         \x20 if (status) { goto suspend; }\n\
         }\n"
    );
}

#[test]
fn read_u8_is_inlined() {
    let out = compile_body(
        "?",
        json!([assign(
            json!("x"),
            json!("u8"),
            "=",
            typed(call_q("read_u8", reader("r"), &[]), json!("u8")),
        )]),
    );
    assert_eq!(
        out.c_src,
        "{\n\
         \x20 RT_COROUTINE_SUSPENSION_POINT(1);\n\
         \x20 if (iop_v_r == io1_v_r) {\n\
         \x20   status = rt_suspension_short_read;\n\
         \x20   goto suspend;\n\
         \x20 }\n\
         \x20 uint8_t t_0 = *iop_v_r++;\n\
         \x20 v_x = t_0;\n\
         }\n"
    );
}

#[test]
fn write_u8_has_no_result_to_assign() {
    let err = try_compile_body(
        "?",
        Value::Null,
        json!([assign(
            json!("x"),
            json!("u8"),
            "=",
            call_q("write_u8", writer("w"), &[("a", json!(7))]),
        )]),
    )
    .expect_err("must fail");
    assert_eq!(err.kind, CompileErrorKind::Typing);
    assert!(err.message.contains("has no result to assign"), "{}", err.message);
}

#[test]
fn while_emits_continue_label_before_and_break_label_after() {
    let out = compile_body(
        "",
        json!([while_(
            Some("l"),
            json!(["<", "i", 10]),
            json!([
                if_(json!(["==", "i", 3]), json!([jump("break", None)]), json!([])),
                jump("continue", None),
            ]),
        )]),
    );
    assert_eq!(
        out.c_src,
        "label_0_continue:;\n\
         while (v_i < 10) {\n\
         \x20 if (v_i == 3) {\n\
         \x20   goto label_0_break;\n\
         \x20 }\n\
         \x20 goto label_0_continue;\n\
         }\n\
         label_0_break:;\n"
    );
    assert_eq!(out.stats.jump_targets, 1);
}

#[test]
fn nested_loops_get_distinct_jump_targets() {
    let out = compile_body(
        "",
        json!([while_(
            Some("outer"),
            json!(true),
            json!([while_(
                None,
                json!(true),
                json!([jump("break", Some("outer")), jump("continue", None)]),
            )]),
        )]),
    );
    assert_eq!(
        out.c_src,
        "while (true) {\n\
         \x20 label_0_continue:;\n\
         \x20 while (true) {\n\
         \x20   goto label_1_break;\n\
         \x20   goto label_0_continue;\n\
         \x20 }\n\
         }\n\
         label_1_break:;\n"
    );
}

#[test]
fn if_chain_renders_else_if_and_else() {
    let out = compile_body(
        "",
        json!([{
            "kind": "if",
            "cond": ["==", "a", 1],
            "then": [assign(json!("b"), json!("u32"), "=", json!(1))],
            "else_if": {
                "cond": ["==", "a", 2],
                "then": [assign(json!("b"), json!("u32"), "=", json!(2))],
                "else": [assign(json!("b"), json!("u32"), "=", json!(3))],
            },
        }]),
    );
    assert_eq!(
        out.c_src,
        "if (v_a == 1) {\n\
         \x20 v_b = 1;\n\
         } else if (v_a == 2) {\n\
         \x20 v_b = 2;\n\
         } else {\n\
         \x20 v_b = 3;\n\
         }\n"
    );
}

#[test]
fn assignment_operators_lower_to_c() {
    let out = compile_body(
        "",
        json!([
            assign(json!("x"), json!("u16"), "~sat+=", json!("y")),
            assign(json!("x"), json!("u16"), "~mod-=", json!(1)),
            assign(json!("buf"), json!(["array", 4, "u8"]), "=", json!("other")),
            assign(json!("n"), json!("u32"), "<<=", json!(2)),
        ]),
    );
    assert_eq!(
        out.c_src,
        "rt_u16_sat_add_indirect(&v_x, v_y);\n\
         v_x -= 1;\n\
         memcpy(v_buf, v_other, sizeof(v_buf));\n\
         v_n <<= 2;\n"
    );
}

#[test]
fn saturating_assign_needs_unsigned_type() {
    let err = try_compile_body(
        "",
        Value::Null,
        json!([assign(json!("x"), json!("bool"), "~sat-=", json!(1))]),
    )
    .expect_err("must fail");
    assert_eq!(err.kind, CompileErrorKind::Typing);
    assert!(err.message.contains("unsupported tilde-operator type"));
    assert!(err.message.ends_with("(fn=f)"), "{}", err.message);
    assert_eq!(err.ptr.as_deref(), Some("/funcs/0"));
}

#[test]
fn amp_hat_assign_is_unrecognized() {
    let err = try_compile_body(
        "",
        Value::Null,
        json!([assign(json!("x"), json!("u32"), "&^=", json!(1))]),
    )
    .expect_err("must fail");
    assert_eq!(err.kind, CompileErrorKind::Unsupported);
    assert!(err.message.contains("unrecognized operator"));
}

#[test]
fn line_comments_use_the_file_basename() {
    let bytes = file(vec![func(
        "f",
        "?",
        Value::Null,
        json!([
            {
                "kind": "assign", "lhs": "n", "type": "u32", "rhs": 0,
                "file": "std/gif/decode.src", "line": 12,
            },
            {
                "kind": "expr", "expr": call_q("a", Value::Null, &[]),
                "file": "std/gif/decode.src", "line": 13,
            },
        ]),
    )]);
    let options = CompileOptions {
        line_comments: true,
        ..options()
    };
    let funcs = compile_file_to_c(&bytes, &options).expect("compile");
    assert_eq!(
        funcs[0].c_src,
        "// decode.src:12\n\
         v_n = 0;\n\
         {\n\
         \x20 // decode.src:13\n\
         \x20 RT_COROUTINE_SUSPENSION_POINT(1);\n\
         \x20 status = base__a(self);\n\
         \x20 if (status) { goto suspend; }\n\
         }\n"
    );
}

#[test]
fn asserts_and_vars_emit_nothing() {
    let out = compile_body(
        "",
        json!([
            {"kind": "assert", "cond": ["<", "a", 4]},
            {"kind": "var", "name": "a", "type": "u32"},
        ]),
    );
    assert_eq!(out.c_src, "");
}

#[test]
fn expressions_lower_to_c() {
    let out = compile_body(
        "",
        json!([assign(
            json!("x"),
            json!("u8"),
            "=",
            json!(["and",
                ["not", ["[]", typed(json!("s"), json!(["slice", "u8"])), 0]],
                ["&^", ["as", ["this", "count"], "u8"], 1]]),
        )]),
    );
    assert_eq!(
        out.c_src,
        "v_x = ((!v_s.ptr[0]) && (((uint8_t)(self->private_impl.f_count)) & ~1));\n"
    );
}
