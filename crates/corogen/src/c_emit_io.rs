use crate::ast::{ExprKind, IoBind, IoBindKeyword};

use super::*;

impl<'a> Emitter<'a> {
    /// Rebinds an I/O variable for the duration of `n.body`.
    ///
    /// The snapshot and the restore live in the same C block, with the restore after the
    /// last body statement. A `break` or `continue` out of the body replays the restore
    /// before its `goto`. `suspend`, `exit` and `ok` discard the whole I/O state and skip it.
    pub(super) fn emit_statement_io_bind(&mut self, n: &IoBind, depth: u32) -> Result<(), CompilerError> {
        if self.fs.io_binds >= self.options.limits.max_io_binds {
            return Err(self.err(
                CompileErrorKind::Budget,
                "too many I/O rebindings required".to_string(),
            ));
        }
        let num = self.fs.io_binds;
        self.fs.io_binds += 1;

        let (prefix, name, is_local) = match &n.io.kind {
            ExprKind::Ident(name) => (V_PREFIX, name.as_str(), true),
            ExprKind::Arg(name) => (A_PREFIX, name.as_str(), false),
            _ => {
                return Err(self.err(
                    CompileErrorKind::Unsupported,
                    format!(
                        "I/O rebinding target must be a local or an argument: {}",
                        n.io.str()
                    ),
                ));
            }
        };
        let Some(kind) = n.io.mtype.as_ref().and_then(|t| t.io_kind()) else {
            return Err(self.err(
                CompileErrorKind::Typing,
                format!("I/O rebinding target is not an I/O type: {}", n.io.str()),
            ));
        };
        let c_typ = kind.as_str();
        let var = format!("{prefix}{name}");
        let snapshot = format!("{O_PREFIX}{num}_{var}");
        let iop = format!("{IOP_PREFIX}{var}");
        let io1 = format!("{IO1_PREFIX}{var}");

        log::trace!("fn={} io bind {num} on {var}", self.fs.func.name);
        if !is_local {
            log::warn!(
                "fn={}: rebinding argument {var}; its cursors are not restored",
                self.fs.func.name
            );
        }

        self.open_block();
        self.line(&format!("rt_io_{c_typ} {snapshot} = {var};"));
        if is_local {
            self.line(&format!("uint8_t* {O_PREFIX}{num}_{iop} = {iop};"));
            self.line(&format!("uint8_t* {O_PREFIX}{num}_{io1} = {io1};"));
        }

        let arg1 = self.write_expr(&n.arg1, 0)?;
        match n.keyword {
            IoBindKeyword::IoBind => self.line(&format!(
                "rt_io_{c_typ}_set(&{var}, &{U_PREFIX}{name}, &{iop}, &{io1}, {arg1});"
            )),
            IoBindKeyword::IoLimit => self.line(&format!(
                "rt_io_{c_typ}_set_limit(&{var}, {iop}, {arg1});"
            )),
        }

        let mut restore = vec![format!("{var} = {snapshot};")];
        if is_local {
            restore.push(format!("{iop} = {O_PREFIX}{num}_{iop};"));
            restore.push(format!("{io1} = {O_PREFIX}{num}_{io1};"));
        }
        self.fs.binds.push(OpenBind {
            loop_depth: self.fs.loops.len(),
            restore,
        });

        for o in &n.body {
            self.emit_statement(o, depth)?;
        }

        let Some(bind) = self.fs.binds.pop() else {
            return Err(self.err(
                CompileErrorKind::Internal,
                "I/O bind stack underflow".to_string(),
            ));
        };
        for r in &bind.restore {
            self.line(r);
        }
        self.close_block();
        Ok(())
    }
}
