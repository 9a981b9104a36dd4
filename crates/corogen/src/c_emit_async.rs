use crate::ast::{ExprKind, Ret, RetKeyword};
use crate::status;

use super::c_emit_expr::BuiltinCall;
use super::*;

/// How a `return` value routes to the function epilogue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetClass {
    Error,
    /// `ok` or a warning literal.
    Ok,
    /// Only known at run time.
    Dynamic,
}

fn classify_ret_value(value: &Expr) -> RetClass {
    match &value.kind {
        ExprKind::Ok => RetClass::Ok,
        ExprKind::Status(msg) if status::status_msg_is_error(msg) => RetClass::Error,
        ExprKind::Status(msg) if status::status_msg_is_warning(msg) => RetClass::Ok,
        _ => RetClass::Dynamic,
    }
}

impl<'a> Emitter<'a> {
    pub(super) fn emit_coro_susp_point(&mut self, maybe_suspend: bool) -> Result<(), CompilerError> {
        self.fs.coro_susp_point += 1;
        if self.fs.coro_susp_point >= self.options.limits.max_coro_susp_point {
            return Err(self.err(
                CompileErrorKind::Budget,
                "too many coroutine suspension points required".to_string(),
            ));
        }
        let n = self.fs.coro_susp_point;
        log::trace!("fn={} suspension point {n}", self.fs.func.name);

        let suffix = if maybe_suspend { "_MAYBE_SUSPEND" } else { "" };
        self.line(&format!("RT_COROUTINE_SUSPENSION_POINT{suffix}({n});"));
        Ok(())
    }

    pub(super) fn alloc_temp(&mut self) -> Result<String, CompilerError> {
        if self.fs.temp_w >= self.options.limits.max_temps {
            return Err(self.err(
                CompileErrorKind::Budget,
                "too many temporary variables required".to_string(),
            ));
        }
        let temp = self.fs.temp_w;
        self.fs.temp_w += 1;
        Ok(format!("{T_PREFIX}{temp}"))
    }

    /// Lowers a suspendible call on an assignment's right-hand side and returns the C
    /// expression that holds its value.
    ///
    /// With `eq_question` the call's status is captured into a temporary and nothing
    /// suspends here; otherwise a non-OK status jumps to `suspend`.
    pub(super) fn emit_question_call(
        &mut self,
        e: &Expr,
        depth: u32,
        eq_question: bool,
    ) -> Result<String, CompilerError> {
        if depth > self.options.limits.max_expr_depth {
            return Err(self.err(
                CompileErrorKind::Budget,
                "expression recursion depth too large".to_string(),
            ));
        }
        let depth = depth + 1;

        if !e.is_call() {
            return Err(self.err(
                CompileErrorKind::Unsupported,
                format!("suspendible expression is not a call: {}", e.str()),
            ));
        }

        if !eq_question {
            self.emit_coro_susp_point(false)?;
            match self.write_builtin_question_call(e, true, depth)? {
                BuiltinCall::Handled(Some(value)) => return Ok(value),
                BuiltinCall::Handled(None) => {
                    return Err(self.err(
                        CompileErrorKind::Typing,
                        format!("{} has no result to assign", e.str()),
                    ));
                }
                BuiltinCall::NotBuiltin => {}
            }
        }

        if eq_question {
            let temp = self.alloc_temp()?;
            self.write_save_expr_derived_vars(e);
            let call = self.write_user_defined_call(e, None, depth)?;
            self.line(&format!("rt_status {temp} = {call};"));
            self.write_load_expr_derived_vars(e);
            return Ok(temp);
        }

        let Some(ty) = &e.mtype else {
            return Err(self.err(
                CompileErrorKind::Typing,
                format!("{} has no result to assign", e.str()),
            ));
        };
        let c_ty = self.c_type(ty)?;
        let temp = self.alloc_temp()?;
        self.line(&format!("{c_ty} {temp};"));

        self.write_save_expr_derived_vars(e);
        let call = self.write_user_defined_call(e, Some(&format!("&{temp}")), depth)?;
        self.line(&format!("status = {call};"));
        self.write_load_expr_derived_vars(e);
        self.line("if (status) { goto suspend; }");
        Ok(temp)
    }

    pub(super) fn emit_statement_ret(&mut self, n: &Ret, depth: u32) -> Result<(), CompilerError> {
        let func = self.fs.func;

        if !func.effect.optional() {
            if n.keyword == RetKeyword::Yield {
                return Err(self.err(
                    CompileErrorKind::Unsupported,
                    "yield in a function that returns no status".to_string(),
                ));
            }
            if func.out.is_none() {
                return Err(self.err(
                    CompileErrorKind::Unsupported,
                    "return from a function with no result type".to_string(),
                ));
            }
            let v = self.write_expr(&n.value, depth)?;
            self.line(&format!("return {v};"));
            return Ok(());
        }

        if n.value.effect.coroutine() {
            return Err(self.err(
                CompileErrorKind::Unsupported,
                format!("returned value must not suspend: {}", n.value.str()),
            ));
        }
        let class = classify_ret_value(&n.value);
        let v = self.write_expr(&n.value, depth)?;
        self.line(&format!("status = {v};"));

        if n.keyword == RetKeyword::Yield {
            return self.emit_coro_susp_point(true);
        }

        match class {
            RetClass::Error => self.line("goto exit;"),
            RetClass::Ok => {
                self.fs.has_goto_ok = true;
                self.line("goto ok;");
            }
            RetClass::Dynamic => {
                self.fs.has_goto_ok = true;
                self.line("if (rt_status_is_error(status)) {");
                self.indent += 1;
                self.line("goto exit;");
                self.indent -= 1;
                self.line("} else if (rt_status_is_suspension(status)) {");
                self.indent += 1;
                self.line("status = rt_error_cannot_return_a_suspension;");
                self.line("goto exit;");
                self.indent -= 1;
                self.line("}");
                self.line("goto ok;");
            }
        }
        Ok(())
    }
}
