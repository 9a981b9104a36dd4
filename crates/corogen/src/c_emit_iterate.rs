use crate::ast::{ExprKind, Iterate};

use super::*;

/// Largest `length` or `unroll` an iterate round accepts.
const MAX_ITERATE_FACTOR: u32 = 256;

fn is_small_power_of_2(v: u32) -> bool {
    v.is_power_of_two() && v <= MAX_ITERATE_FACTOR
}

impl<'a> Emitter<'a> {
    pub(super) fn emit_statement_iterate(&mut self, n: &Iterate, depth: u32) -> Result<(), CompilerError> {
        let o = match n.assigns.as_slice() {
            [] => return Ok(()),
            [o] => o,
            _ => {
                return Err(self.err(
                    CompileErrorKind::Unsupported,
                    "iterate over more than one assign".to_string(),
                ));
            }
        };
        let ExprKind::Ident(name) = &o.lhs.kind else {
            return Err(self.err(
                CompileErrorKind::Unsupported,
                format!("iterate variable must be a local: {}", o.lhs.str()),
            ));
        };

        self.open_block();
        let rhs = self.write_expr(&o.rhs, 0)?;
        self.line(&format!("rt_slice_u8 {I_PREFIX}slice_{name} = {rhs};"));
        self.line(&format!("{V_PREFIX}{name} = {I_PREFIX}slice_{name};"));

        self.fs.loops.push(LoopFrame {
            id: n.id,
            has_break: n.has_break,
            has_continue: n.has_continue,
            is_iterate: true,
            target: None,
        });

        let mut round: u32 = 0;
        let mut next = Some(n);
        while let Some(it) = next {
            if !is_small_power_of_2(it.length) || !is_small_power_of_2(it.unroll) {
                return Err(self.err(
                    CompileErrorKind::Typing,
                    format!(
                        "iterate length and unroll must be powers of 2 up to {MAX_ITERATE_FACTOR}, got length={} unroll={}",
                        it.length, it.unroll
                    ),
                ));
            }
            // The unrolled round consumes whole strides; a single-step round finishes the
            // remainder that still holds a full element.
            let mut unroll = it.unroll;
            loop {
                self.emit_iterate_round(name, &it.body, round, depth, it.length, unroll)?;
                round += 1;
                if unroll == 1 {
                    break;
                }
                unroll = 1;
            }
            next = it.else_iterate.as_deref();
        }

        self.close_block();
        self.pop_loop_with_break_label()
    }

    fn emit_iterate_round(
        &mut self,
        name: &str,
        body: &[Stmt],
        round: u32,
        depth: u32,
        length: u32,
        unroll: u32,
    ) -> Result<(), CompilerError> {
        let Some(stride) = u64::from(length).checked_mul(u64::from(unroll)) else {
            return Err(self.err(
                CompileErrorKind::Budget,
                "iterate stride overflows".to_string(),
            ));
        };

        self.line(&format!("{V_PREFIX}{name}.len = {length};"));
        self.line(&format!(
            "uint8_t* {I_PREFIX}end{round}_{name} = {I_PREFIX}slice_{name}.ptr + ({I_PREFIX}slice_{name}.len / {stride}) * {stride};"
        ));
        self.line(&format!(
            "while ({V_PREFIX}{name}.ptr < {I_PREFIX}end{round}_{name}) {{"
        ));
        self.indent += 1;
        for _ in 0..unroll {
            for o in body {
                self.emit_statement(o, depth)?;
            }
            self.line(&format!("{V_PREFIX}{name}.ptr += {length};"));
        }
        self.indent -= 1;
        self.line("}");
        Ok(())
    }
}
