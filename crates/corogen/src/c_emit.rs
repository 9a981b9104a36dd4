use sha2::{Digest, Sha256};

use crate::ast::{Assign, AssignOp, Expr, FuncDecl, If, Jump, JumpKeyword, LoopId, Pos, Stmt, StmtKind, While};
use crate::compile::{CompileErrorKind, CompileOptions, CompileStats, CompilerError, FuncOutput};

#[path = "c_emit_async.rs"]
mod c_emit_async;
#[path = "c_emit_expr.rs"]
mod c_emit_expr;
#[path = "c_emit_io.rs"]
mod c_emit_io;
#[path = "c_emit_iterate.rs"]
mod c_emit_iterate;

const A_PREFIX: &str = "a_";
const I_PREFIX: &str = "i_";
const IOP_PREFIX: &str = "iop_";
const IO1_PREFIX: &str = "io1_";
const O_PREFIX: &str = "o_";
const T_PREFIX: &str = "t_";
const U_PREFIX: &str = "u_";
const V_PREFIX: &str = "v_";

#[derive(Debug, Clone)]
struct LoopFrame {
    id: LoopId,
    has_break: bool,
    has_continue: bool,
    is_iterate: bool,
    /// Allocated on the first break/continue label or jump for this emission of the loop.
    target: Option<u32>,
}

/// An `io_bind` or `io_limit` whose body is being emitted.
#[derive(Debug, Clone)]
struct OpenBind {
    /// `loops.len()` when the bind opened; jumps to loops below this leave the bind.
    loop_depth: usize,
    restore: Vec<String>,
}

/// Counters and maps scoped to one function's generation pass.
struct FuncState<'f> {
    func: &'f FuncDecl,
    coro_susp_point: u32,
    io_binds: u32,
    temp_w: u32,
    jump_targets: u32,
    loops: Vec<LoopFrame>,
    binds: Vec<OpenBind>,
    has_goto_ok: bool,
}

impl<'f> FuncState<'f> {
    fn new(func: &'f FuncDecl) -> Self {
        Self {
            func,
            coro_susp_point: 0,
            io_binds: 0,
            temp_w: 0,
            jump_targets: 0,
            loops: Vec::new(),
            binds: Vec::new(),
            has_goto_ok: false,
        }
    }
}

struct Emitter<'a> {
    options: &'a CompileOptions,
    out: String,
    indent: usize,
    /// Set once `out` passes `max_c_bytes`.
    out_too_large: bool,
    fs: FuncState<'a>,
}

pub(crate) fn emit_func_body(
    func: &FuncDecl,
    options: &CompileOptions,
) -> Result<FuncOutput, CompilerError> {
    log::debug!("emit fn={} stmts={}", func.name, func.body.len());

    let mut e = Emitter {
        options,
        out: String::new(),
        indent: 0,
        out_too_large: false,
        fs: FuncState::new(func),
    };
    for stmt in &func.body {
        e.emit_statement(stmt, 0)?;
    }
    e.check_out_size()?;

    let mut h = Sha256::new();
    h.update(e.out.as_bytes());
    let digest = h.finalize();
    let c_src_sha256: String = digest.iter().map(|b| format!("{b:02x}")).collect();

    let stats = CompileStats {
        coro_susp_points: e.fs.coro_susp_point,
        temps: e.fs.temp_w,
        io_binds: e.fs.io_binds,
        jump_targets: e.fs.jump_targets,
        c_src_sha256,
    };
    log::debug!(
        "emitted fn={} susp_points={} temps={} io_binds={} jump_targets={} has_goto_ok={}",
        func.name,
        stats.coro_susp_points,
        stats.temps,
        stats.io_binds,
        stats.jump_targets,
        e.fs.has_goto_ok
    );

    Ok(FuncOutput {
        name: func.name.clone(),
        has_goto_ok: e.fs.has_goto_ok,
        c_src: e.out,
        stats,
    })
}

impl<'a> Emitter<'a> {
    fn err(&self, kind: CompileErrorKind, message: String) -> CompilerError {
        CompilerError::new(kind, format!("{message} (fn={})", self.fs.func.name))
    }

    fn line(&mut self, s: &str) {
        for _ in 0..self.indent {
            self.out.push_str("  ");
        }
        self.out.push_str(s);
        self.out.push('\n');
        if self.out.len() > self.options.limits.max_c_bytes {
            self.out_too_large = true;
        }
    }

    fn check_out_size(&self) -> Result<(), CompilerError> {
        if !self.out_too_large {
            return Ok(());
        }
        Err(self.err(
            CompileErrorKind::Budget,
            format!(
                "C source too large: max_c_bytes={} (set COROGEN_MAX_C_BYTES=<bytes>)",
                self.options.limits.max_c_bytes
            ),
        ))
    }

    fn open_block(&mut self) {
        self.line("{");
        self.indent += 1;
    }

    fn close_block(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}");
    }

    fn emit_line_comment(&mut self, pos: &Pos) {
        if !self.options.line_comments || pos.line == 0 {
            return;
        }
        let mut filename = pos.filename.as_str();
        if let Some((_, base)) = filename.rsplit_once('/') {
            filename = base;
        }
        if let Some((_, base)) = filename.rsplit_once('\\') {
            filename = base;
        }
        self.line(&format!("// {filename}:{}", pos.line));
    }

    fn emit_statement(&mut self, n: &Stmt, depth: u32) -> Result<(), CompilerError> {
        if depth > self.options.limits.max_body_depth {
            return Err(self.err(
                CompileErrorKind::Budget,
                "body recursion depth too large".to_string(),
            ));
        }
        self.check_out_size()?;
        let depth = depth + 1;

        // Suspension points jump into the middle of the body; a block around each
        // suspendible statement keeps its t_ temporaries from being jumped over.
        let might_introduce_temporaries = match &n.kind {
            StmtKind::Assign(a) => a.rhs.effect.coroutine(),
            StmtKind::Expr(e) => e.effect.coroutine(),
            _ => false,
        };
        if might_introduce_temporaries {
            self.open_block();
        }

        self.emit_line_comment(&n.pos);

        match &n.kind {
            StmtKind::Assert(_) | StmtKind::Var(_) => {}
            StmtKind::Assign(a) => self.emit_statement_assign(Some(a), &a.rhs, depth)?,
            StmtKind::Expr(e) => self.emit_statement_assign(None, e, depth)?,
            StmtKind::IoBind(b) => self.emit_statement_io_bind(b, depth)?,
            StmtKind::If(i) => self.emit_statement_if(i, depth)?,
            StmtKind::Iterate(i) => self.emit_statement_iterate(i, depth)?,
            StmtKind::Jump(j) => self.emit_statement_jump(j)?,
            StmtKind::Ret(r) => self.emit_statement_ret(r, depth)?,
            StmtKind::While(w) => self.emit_statement_while(w, depth)?,
        }

        if might_introduce_temporaries {
            self.close_block();
        }
        Ok(())
    }

    /// Lowers an assignment, or a bare expression statement when `assign` is `None`.
    fn emit_statement_assign(
        &mut self,
        assign: Option<&Assign>,
        rhs: &Expr,
        depth: u32,
    ) -> Result<(), CompilerError> {
        if depth > self.options.limits.max_expr_depth {
            return Err(self.err(
                CompileErrorKind::Budget,
                "expression recursion depth too large".to_string(),
            ));
        }
        let depth = depth + 1;

        let Some(assign) = assign else {
            return self.emit_statement_eval(rhs, depth);
        };

        let rhs_c = if rhs.effect.coroutine() {
            self.emit_question_call(rhs, depth, assign.op == AssignOp::EqQuestion)?
        } else {
            self.write_expr(rhs, depth)?
        };
        let lhs_c = self.write_expr(&assign.lhs, depth)?;

        if assign.lhs_ty.is_array() {
            self.line(&format!("memcpy({lhs_c}, {rhs_c}, sizeof({lhs_c}));"));
            return Ok(());
        }

        match assign.op {
            AssignOp::TildeSatPlusEq | AssignOp::TildeSatMinusEq => {
                let Some(bits) = assign.lhs_ty.uint_bits() else {
                    return Err(self.err(
                        CompileErrorKind::Typing,
                        format!("unsupported tilde-operator type {:?}", assign.lhs_ty.str()),
                    ));
                };
                let u_op = if assign.op == AssignOp::TildeSatPlusEq {
                    "add"
                } else {
                    "sub"
                };
                self.line(&format!(
                    "rt_u{bits}_sat_{u_op}_indirect(&{lhs_c}, {rhs_c});"
                ));
            }
            op => {
                let Some(op_name) = op.c_op_name() else {
                    return Err(self.err(
                        CompileErrorKind::Unsupported,
                        format!("unrecognized operator {:?}", op.as_str()),
                    ));
                };
                self.line(&format!("{lhs_c}{op_name}{rhs_c};"));
            }
        }
        Ok(())
    }

    /// Plain evaluation: no assignment target.
    fn emit_statement_eval(&mut self, rhs: &Expr, depth: u32) -> Result<(), CompilerError> {
        if rhs.effect.coroutine() {
            self.emit_coro_susp_point(false)?;
        }

        if let c_emit_expr::BuiltinCall::Handled(_) =
            self.write_builtin_question_call(rhs, false, depth)?
        {
            return Ok(());
        }

        self.write_save_expr_derived_vars(rhs);
        let value = if rhs.is_call() {
            self.write_user_defined_call(rhs, None, depth)?
        } else {
            self.write_expr(rhs, depth)?
        };
        if rhs.effect.optional() {
            self.line(&format!("status = {value};"));
        } else {
            self.line(&format!("{value};"));
        }
        self.write_load_expr_derived_vars(rhs);

        if rhs.effect.optional() {
            let target = if rhs.effect.coroutine() {
                "suspend"
            } else {
                "exit"
            };
            self.line(&format!("if (status) {{ goto {target}; }}"));
        }
        Ok(())
    }

    fn emit_statement_if(&mut self, n: &If, depth: u32) -> Result<(), CompilerError> {
        let mut n = n;
        let mut first = true;
        loop {
            let condition = self.write_condition(&n.cond)?;
            if first {
                self.line(&format!("if ({condition}) {{"));
            } else {
                self.line(&format!("}} else if ({condition}) {{"));
            }
            self.indent += 1;
            for o in &n.body_if_true {
                self.emit_statement(o, depth)?;
            }
            self.indent -= 1;

            if !n.body_if_false.is_empty() {
                self.line("} else {");
                self.indent += 1;
                for o in &n.body_if_false {
                    self.emit_statement(o, depth)?;
                }
                self.indent -= 1;
                break;
            }
            match &n.else_if {
                Some(else_if) => {
                    n = &**else_if;
                    first = false;
                }
                None => break,
            }
        }
        self.line("}");
        Ok(())
    }

    fn emit_statement_while(&mut self, n: &While, depth: u32) -> Result<(), CompilerError> {
        self.fs.loops.push(LoopFrame {
            id: n.id,
            has_break: n.has_break,
            has_continue: n.has_continue,
            is_iterate: false,
            target: None,
        });

        if n.has_continue {
            let jt = self.innermost_jump_target()?;
            self.line(&format!("label_{jt}_continue:;"));
        }
        let condition = self.write_condition(&n.cond)?;
        self.line(&format!("while ({condition}) {{"));
        self.indent += 1;
        for o in &n.body {
            self.emit_statement(o, depth)?;
        }
        self.indent -= 1;
        self.line("}");

        self.pop_loop_with_break_label()
    }

    fn emit_statement_jump(&mut self, n: &Jump) -> Result<(), CompilerError> {
        let Some(idx) = self.fs.loops.iter().rposition(|f| f.id == n.target) else {
            return Err(self.err(
                CompileErrorKind::Internal,
                format!(
                    "{} target {:?} is not an enclosing loop",
                    n.keyword.as_str(),
                    n.target
                ),
            ));
        };
        let frame = &self.fs.loops[idx];
        let marked = match n.keyword {
            JumpKeyword::Break => frame.has_break,
            JumpKeyword::Continue => frame.has_continue,
        };
        if !marked {
            return Err(self.err(
                CompileErrorKind::Internal,
                format!(
                    "loop {:?} is not marked as using {}",
                    n.target,
                    n.keyword.as_str()
                ),
            ));
        }
        if frame.is_iterate && n.keyword == JumpKeyword::Continue {
            return Err(self.err(
                CompileErrorKind::Unsupported,
                "continue within iterate is unsupported".to_string(),
            ));
        }

        // Both labels sit outside every bind opened within the target loop.
        let restores: Vec<String> = self
            .fs
            .binds
            .iter()
            .rev()
            .filter(|b| b.loop_depth > idx)
            .flat_map(|b| b.restore.iter().cloned())
            .collect();
        for r in &restores {
            self.line(r);
        }

        let jt = self.jump_target(idx)?;
        self.line(&format!("goto label_{jt}_{};", n.keyword.as_str()));
        Ok(())
    }

    /// Returns the target id of `self.fs.loops[idx]`, allocating it on first use.
    fn jump_target(&mut self, idx: usize) -> Result<u32, CompilerError> {
        if let Some(jt) = self.fs.loops[idx].target {
            return Ok(jt);
        }
        let jt = self.alloc_jump_target()?;
        self.fs.loops[idx].target = Some(jt);
        Ok(jt)
    }

    fn innermost_jump_target(&mut self) -> Result<u32, CompilerError> {
        match self.fs.loops.len() {
            0 => Err(self.err(
                CompileErrorKind::Internal,
                "no enclosing loop".to_string(),
            )),
            n => self.jump_target(n - 1),
        }
    }

    fn alloc_jump_target(&mut self) -> Result<u32, CompilerError> {
        if self.fs.jump_targets >= self.options.limits.max_jump_targets {
            return Err(self.err(
                CompileErrorKind::Budget,
                "too many jump targets".to_string(),
            ));
        }
        let jt = self.fs.jump_targets;
        self.fs.jump_targets += 1;
        log::trace!("fn={} jump target {jt}", self.fs.func.name);
        Ok(jt)
    }

    /// Pops the innermost loop and, if it uses break, emits its break label.
    fn pop_loop_with_break_label(&mut self) -> Result<(), CompilerError> {
        let Some(frame) = self.fs.loops.pop() else {
            return Err(self.err(
                CompileErrorKind::Internal,
                "loop stack underflow".to_string(),
            ));
        };
        if frame.has_break {
            let jt = match frame.target {
                Some(jt) => jt,
                None => self.alloc_jump_target()?,
            };
            self.line(&format!("label_{jt}_break:;"));
        }
        Ok(())
    }

    fn write_condition(&mut self, cond: &Expr) -> Result<String, CompilerError> {
        if cond.effect.coroutine() {
            return Err(self.err(
                CompileErrorKind::Unsupported,
                format!("condition must not suspend: {}", cond.str()),
            ));
        }
        let condition = self.write_expr(cond, 0)?;
        // Avoids clang's -Wparentheses-equality warning.
        Ok(trim_parens(&condition).to_string())
    }
}

fn trim_parens(s: &str) -> &str {
    if s.len() > 1 && s.starts_with('(') && s.ends_with(')') {
        &s[1..s.len() - 1]
    } else {
        s
    }
}

/// Escapes for a C string literal. Bytes outside printable ASCII become octal escapes
/// and a `?` following `?` is escaped so no trigraph forms.
fn c_escape_c_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_question = false;
    for &b in s.as_bytes() {
        match b {
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            b'?' if prev_question => out.push_str("\\?"),
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\{b:03o}")),
        }
        prev_question = b == b'?';
    }
    out
}
