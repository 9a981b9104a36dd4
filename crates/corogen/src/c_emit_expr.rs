use crate::ast::{BinaryOp, CallArg, ExprKind, IoKind, TypeExpr, UnaryOp};

use super::*;

pub(super) enum BuiltinCall {
    NotBuiltin,
    /// The call was lowered inline; carries the C expression holding its result, if any.
    Handled(Option<String>),
}

impl<'a> Emitter<'a> {
    pub(super) fn write_expr(&self, e: &Expr, depth: u32) -> Result<String, CompilerError> {
        if depth > self.options.limits.max_expr_depth {
            return Err(self.err(
                CompileErrorKind::Budget,
                "expression recursion depth too large".to_string(),
            ));
        }
        let depth = depth + 1;

        Ok(match &e.kind {
            ExprKind::Ident(name) => format!("{V_PREFIX}{name}"),
            ExprKind::Arg(name) => format!("{A_PREFIX}{name}"),
            ExprKind::Field(name) => format!("self->private_impl.f_{name}"),
            ExprKind::Literal(text) => text.clone(),
            ExprKind::Ok => "NULL".to_string(),
            ExprKind::Status(msg) => format!("\"{}\"", c_escape_c_string(msg)),
            ExprKind::Unary { op, rhs } => {
                let r = self.write_expr(rhs, depth)?;
                let c_op = match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                    UnaryOp::Not => "!",
                };
                format!("({c_op}{r})")
            }
            ExprKind::Binary { op, lhs, rhs } => self.write_expr_binary(e, *op, lhs, rhs, depth)?,
            ExprKind::Call { .. } => {
                if e.effect.coroutine() {
                    return Err(self.err(
                        CompileErrorKind::Unsupported,
                        format!("suspendible call in value position: {}", e.str()),
                    ));
                }
                self.write_user_defined_call(e, None, depth)?
            }
            ExprKind::Index { lhs, index } => {
                let l = self.write_expr(lhs, depth)?;
                let i = self.write_expr(index, depth)?;
                if lhs.mtype.as_ref().is_some_and(TypeExpr::is_slice) {
                    format!("{l}.ptr[{i}]")
                } else {
                    format!("{l}[{i}]")
                }
            }
            ExprKind::Slice { lhs, lo, hi } => {
                let l = self.write_expr(lhs, depth)?;
                let base = match &lhs.mtype {
                    Some(TypeExpr::Array { len, .. }) => format!("rt_make_slice_u8({l}, {len})"),
                    _ => l,
                };
                let lo = lo.as_ref().map(|x| self.write_expr(x, depth)).transpose()?;
                let hi = hi.as_ref().map(|x| self.write_expr(x, depth)).transpose()?;
                match (lo, hi) {
                    (Some(lo), Some(hi)) => format!("rt_slice_u8_subslice_ij({base}, {lo}, {hi})"),
                    (Some(lo), None) => format!("rt_slice_u8_subslice_i({base}, {lo})"),
                    (None, Some(hi)) => format!("rt_slice_u8_subslice_j({base}, {hi})"),
                    (None, None) => base,
                }
            }
        })
    }

    fn write_expr_binary(
        &self,
        e: &Expr,
        op: BinaryOp,
        lhs: &Expr,
        rhs: &Expr,
        depth: u32,
    ) -> Result<String, CompilerError> {
        let l = self.write_expr(lhs, depth)?;
        if op == BinaryOp::As {
            let Some(ty) = &rhs.mtype else {
                return Err(self.err(
                    CompileErrorKind::Typing,
                    format!("conversion has no target type: {}", e.str()),
                ));
            };
            return Ok(format!("(({})({l}))", self.c_type(ty)?));
        }
        let r = self.write_expr(rhs, depth)?;

        let bits = e.mtype.as_ref().and_then(TypeExpr::uint_bits);
        Ok(match op {
            BinaryOp::TildeSatPlus | BinaryOp::TildeSatMinus => {
                let Some(bits) = bits else {
                    return Err(self.err(
                        CompileErrorKind::Typing,
                        format!("unsupported tilde-operator type: {}", e.str()),
                    ));
                };
                let u_op = if op == BinaryOp::TildeSatPlus {
                    "add"
                } else {
                    "sub"
                };
                format!("rt_u{bits}_sat_{u_op}({l}, {r})")
            }
            BinaryOp::TildeModPlus | BinaryOp::TildeModMinus => {
                let c_op = if op == BinaryOp::TildeModPlus {
                    "+"
                } else {
                    "-"
                };
                match bits {
                    // Integer promotion would otherwise widen narrow operands.
                    Some(bits) => format!("((uint{bits}_t)({l} {c_op} {r}))"),
                    None => format!("({l} {c_op} {r})"),
                }
            }
            BinaryOp::AmpHat => format!("({l} & ~{r})"),
            BinaryOp::And => format!("({l} && {r})"),
            BinaryOp::Or => format!("({l} || {r})"),
            _ => format!("({l}{}{r})", op.source_str()),
        })
    }

    /// `out_arg` is the trailing result pointer for a suspendible call with a result type.
    pub(super) fn write_user_defined_call(
        &self,
        e: &Expr,
        out_arg: Option<&str>,
        depth: u32,
    ) -> Result<String, CompilerError> {
        let ExprKind::Call { func, recv, args } = &e.kind else {
            return Err(self.err(
                CompileErrorKind::Internal,
                format!("not a call: {}", e.str()),
            ));
        };

        let mut parts: Vec<String> = Vec::with_capacity(args.len() + 2);
        match recv {
            None => parts.push("self".to_string()),
            Some(r) => parts.push(format!("&{}", self.write_expr(r, depth)?)),
        }
        for CallArg { value, .. } in args {
            parts.push(self.write_expr(value, depth)?);
        }
        if e.effect.coroutine() && e.mtype.is_some() {
            parts.push(out_arg.unwrap_or("NULL").to_string());
        }

        Ok(format!(
            "{}__{}({})",
            self.options.package,
            func.replace('.', "__"),
            parts.join(", ")
        ))
    }

    /// Inlines the byte-level I/O primitives instead of calling into the runtime.
    ///
    /// A short read or write sets the suspension status and jumps to `suspend`; the
    /// caller has already emitted the suspension point, so resuming retries the access.
    pub(super) fn write_builtin_question_call(
        &mut self,
        e: &Expr,
        want_value: bool,
        depth: u32,
    ) -> Result<BuiltinCall, CompilerError> {
        let ExprKind::Call { func, recv, args } = &e.kind else {
            return Ok(BuiltinCall::NotBuiltin);
        };
        if !e.effect.coroutine() {
            return Ok(BuiltinCall::NotBuiltin);
        }
        let Some(recv) = recv else {
            return Ok(BuiltinCall::NotBuiltin);
        };
        let Some((kind, name)) = io_operand(recv) else {
            return Ok(BuiltinCall::NotBuiltin);
        };

        match (kind, func.as_str()) {
            (IoKind::Reader, "read_u8") => {
                self.write_short_io_check(&name, "1", "rt_suspension_short_read");
                if !want_value {
                    self.line(&format!("{IOP_PREFIX}{name}++;"));
                    return Ok(BuiltinCall::Handled(None));
                }
                let t = self.alloc_temp()?;
                self.line(&format!("uint8_t {t} = *{IOP_PREFIX}{name}++;"));
                Ok(BuiltinCall::Handled(Some(t)))
            }
            (IoKind::Writer, "write_u8") => {
                let [arg] = args.as_slice() else {
                    return Err(self.err(
                        CompileErrorKind::Typing,
                        format!("write_u8 takes one argument: {}", e.str()),
                    ));
                };
                let v = self.write_expr(&arg.value, depth)?;
                self.write_short_io_check(&name, "1", "rt_suspension_short_write");
                self.line(&format!("*{IOP_PREFIX}{name}++ = {v};"));
                Ok(BuiltinCall::Handled(None))
            }
            (IoKind::Reader, "skip") => {
                let [arg] = args.as_slice() else {
                    return Err(self.err(
                        CompileErrorKind::Typing,
                        format!("skip takes one argument: {}", e.str()),
                    ));
                };
                let n = self.write_expr(&arg.value, depth)?;
                self.write_short_io_check(&name, &n, "rt_suspension_short_read");
                self.line(&format!("{IOP_PREFIX}{name} += {n};"));
                Ok(BuiltinCall::Handled(None))
            }
            _ => Ok(BuiltinCall::NotBuiltin),
        }
    }

    fn write_short_io_check(&mut self, name: &str, n: &str, suspension: &str) {
        if n == "1" {
            self.line(&format!(
                "if ({IOP_PREFIX}{name} == {IO1_PREFIX}{name}) {{"
            ));
        } else {
            self.line(&format!(
                "if (((uint64_t)({IO1_PREFIX}{name} - {IOP_PREFIX}{name})) < ((uint64_t)({n}))) {{"
            ));
        }
        self.indent += 1;
        self.line(&format!("status = {suspension};"));
        self.line("goto suspend;");
        self.indent -= 1;
        self.line("}");
    }

    /// Writes the cached cursors of the call's I/O operands back before the call.
    pub(super) fn write_save_expr_derived_vars(&mut self, e: &Expr) {
        for (kind, name) in call_io_operands(e) {
            self.line(&format!(
                "rt_io_{}_sync_out(&{name}, {IOP_PREFIX}{name});",
                kind.as_str()
            ));
        }
    }

    /// Reloads the cached cursors after the call, which may have moved them.
    pub(super) fn write_load_expr_derived_vars(&mut self, e: &Expr) {
        for (kind, name) in call_io_operands(e) {
            self.line(&format!(
                "{IOP_PREFIX}{name} = rt_io_{}_sync_in(&{name});",
                kind.as_str()
            ));
        }
    }

    pub(super) fn c_type(&self, ty: &TypeExpr) -> Result<String, CompilerError> {
        let unsupported = || {
            self.err(
                CompileErrorKind::Unsupported,
                format!("unsupported C type: {}", ty.str()),
            )
        };
        match ty {
            TypeExpr::Named(n) => Ok(match n.as_str() {
                "u8" | "u16" | "u32" | "u64" => format!("uint{}_t", &n[1..]),
                "i8" | "i16" | "i32" | "i64" => format!("int{}_t", &n[1..]),
                "bool" => "bool".to_string(),
                "status" => "rt_status".to_string(),
                "io_reader" => "rt_io_reader".to_string(),
                "io_writer" => "rt_io_writer".to_string(),
                _ => return Err(unsupported()),
            }),
            TypeExpr::Slice(inner) if **inner == TypeExpr::named("u8") => {
                Ok("rt_slice_u8".to_string())
            }
            _ => Err(unsupported()),
        }
    }
}

/// The I/O kind and C name of a local or argument I/O variable.
pub(super) fn io_operand(e: &Expr) -> Option<(IoKind, String)> {
    let kind = e.mtype.as_ref()?.io_kind()?;
    match &e.kind {
        ExprKind::Ident(name) => Some((kind, format!("{V_PREFIX}{name}"))),
        ExprKind::Arg(name) => Some((kind, format!("{A_PREFIX}{name}"))),
        _ => None,
    }
}

fn call_io_operands(e: &Expr) -> Vec<(IoKind, String)> {
    let ExprKind::Call { recv, args, .. } = &e.kind else {
        return Vec::new();
    };
    recv.iter()
        .map(|r| r.as_ref())
        .chain(args.iter().map(|a| &a.value))
        .filter_map(io_operand)
        .collect()
}
