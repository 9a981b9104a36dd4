//! Loader for the JSON statement-tree format consumed by the CLI.
//!
//! Expressions are JSON S-expressions (`["+", "a", 1]`); statements are objects keyed by
//! `"kind"`. Every error carries a JSON pointer to the offending value.

use std::collections::BTreeSet;
use std::fmt::Display;

use serde_json::{Map, Value};

use crate::ast::{
    Assign, AssignOp, BinaryOp, CallArg, Effect, Expr, ExprKind, FuncDecl, If, IoBind,
    IoBindKeyword, Iterate, Jump, JumpKeyword, LoopId, Pos, Ret, RetKeyword, Stmt, StmtKind,
    TypeExpr, UnaryOp, Var, While,
};
use crate::language::AST_SCHEMA_VERSION;

#[derive(Debug, Clone)]
pub struct AstFile {
    /// Overrides `CompileOptions::package` when present.
    pub package: Option<String>,
    pub funcs: Vec<FuncDecl>,
}

#[derive(Debug, Clone)]
pub struct AstJsonError {
    pub message: String,
    pub ptr: String,
}

impl std::error::Error for AstJsonError {}

impl Display for AstJsonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} at {}", self.message, self.ptr)
    }
}

fn err(message: impl Into<String>, ptr: &str) -> AstJsonError {
    AstJsonError {
        message: message.into(),
        ptr: ptr.to_string(),
    }
}

pub fn parse_ast_json(bytes: &[u8]) -> Result<AstFile, AstJsonError> {
    let doc: Value = serde_json::from_slice(bytes).map_err(|e| err(e.to_string(), ""))?;
    parse_ast_value(&doc)
}

pub fn parse_ast_value(root: &Value) -> Result<AstFile, AstJsonError> {
    let root_obj = root
        .as_object()
        .ok_or_else(|| err("AST root must be an object", ""))?;

    let schema_version = get_required_string(root_obj, "/schema_version", "schema_version")?;
    if schema_version != AST_SCHEMA_VERSION {
        return Err(err(
            format!(
                "unsupported schema_version: got {schema_version:?} (supported: {AST_SCHEMA_VERSION})"
            ),
            "/schema_version",
        ));
    }

    let package = match root_obj.get("package") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => {
            if !is_c_identifier(s) {
                return Err(err(
                    format!("package must be a C identifier: {s:?}"),
                    "/package",
                ));
            }
            Some(s.clone())
        }
        Some(_) => return Err(err("package must be a string", "/package")),
    };

    let funcs_v = root_obj
        .get("funcs")
        .ok_or_else(|| err("missing required field: funcs", ""))?;
    let funcs_a = funcs_v
        .as_array()
        .ok_or_else(|| err("funcs must be an array", "/funcs"))?;

    let mut names: BTreeSet<String> = BTreeSet::new();
    let mut funcs = Vec::with_capacity(funcs_a.len());
    for (fidx, f) in funcs_a.iter().enumerate() {
        let fptr = format!("/funcs/{fidx}");
        let func = parse_func(f, &fptr)?;
        if !names.insert(func.name.clone()) {
            return Err(err(
                format!("duplicate function name: {:?}", func.name),
                &format!("{fptr}/name"),
            ));
        }
        funcs.push(func);
    }

    Ok(AstFile { package, funcs })
}

fn parse_func(v: &Value, ptr: &str) -> Result<FuncDecl, AstJsonError> {
    let obj = v
        .as_object()
        .ok_or_else(|| err("function must be an object", ptr))?;
    let name = get_required_string(obj, &format!("{ptr}/name"), "name")?;
    if !name.split('.').all(is_c_identifier) {
        return Err(err(
            format!("function name must be dotted C identifiers: {name:?}"),
            &format!("{ptr}/name"),
        ));
    }

    let effect = match obj.get("effect") {
        None => Effect::PURE,
        Some(Value::String(s)) => parse_effect_marker(s)
            .ok_or_else(|| err(format!("invalid effect: {s:?}"), &format!("{ptr}/effect")))?,
        Some(_) => return Err(err("effect must be a string", &format!("{ptr}/effect"))),
    };

    let out = match obj.get("out") {
        None | Some(Value::Null) => None,
        Some(t) => Some(parse_type(t, &format!("{ptr}/out"))?),
    };

    let mut loader = Loader::default();
    let body = loader.parse_body(obj, ptr, "body")?;

    Ok(FuncDecl {
        name,
        effect,
        out,
        body,
    })
}

fn parse_effect_marker(s: &str) -> Option<Effect> {
    match s {
        "" => Some(Effect::PURE),
        "!" => Some(Effect::OPTIONAL),
        "?" => Some(Effect::SUSPENDIBLE),
        _ => None,
    }
}

#[derive(Debug)]
struct LoopScope {
    id: LoopId,
    label: Option<String>,
    has_break: bool,
    has_continue: bool,
}

/// Per-function loader state: loop ids and the enclosing-loop stack used to resolve jumps.
#[derive(Debug, Default)]
struct Loader {
    next_loop_id: u32,
    loops: Vec<LoopScope>,
}

impl Loader {
    fn parse_body(
        &mut self,
        obj: &Map<String, Value>,
        ptr: &str,
        key: &str,
    ) -> Result<Vec<Stmt>, AstJsonError> {
        let body_ptr = format!("{ptr}/{key}");
        let Some(v) = obj.get(key) else {
            return Ok(Vec::new());
        };
        let arr = v
            .as_array()
            .ok_or_else(|| err(format!("{key} must be an array"), &body_ptr))?;
        arr.iter()
            .enumerate()
            .map(|(idx, s)| self.parse_stmt(s, &format!("{body_ptr}/{idx}")))
            .collect()
    }

    fn parse_stmt(&mut self, v: &Value, ptr: &str) -> Result<Stmt, AstJsonError> {
        let obj = v
            .as_object()
            .ok_or_else(|| err("statement must be an object", ptr))?;
        let kind = get_required_string(obj, &format!("{ptr}/kind"), "kind")?;

        let kind = match kind.as_str() {
            "assert" => StmtKind::Assert(get_required_expr(obj, ptr, "cond")?),
            "assign" => StmtKind::Assign(parse_assign(obj, ptr)?),
            "expr" => StmtKind::Expr(get_required_expr(obj, ptr, "expr")?),
            "io_bind" | "io_limit" => {
                let keyword = if kind == "io_bind" {
                    IoBindKeyword::IoBind
                } else {
                    IoBindKeyword::IoLimit
                };
                StmtKind::IoBind(IoBind {
                    keyword,
                    io: get_required_expr(obj, ptr, "io")?,
                    arg1: get_required_expr(obj, ptr, "arg1")?,
                    body: self.parse_body(obj, ptr, "body")?,
                })
            }
            "if" => StmtKind::If(self.parse_if(obj, ptr)?),
            "iterate" => StmtKind::Iterate(self.parse_iterate(obj, ptr)?),
            "jump" => StmtKind::Jump(self.parse_jump(obj, ptr)?),
            "ret" => {
                let keyword = match obj.get("keyword").and_then(Value::as_str) {
                    None | Some("return") => RetKeyword::Return,
                    Some("yield") => RetKeyword::Yield,
                    Some(other) => {
                        return Err(err(
                            format!("invalid ret keyword: {other:?}"),
                            &format!("{ptr}/keyword"),
                        ))
                    }
                };
                StmtKind::Ret(Ret {
                    keyword,
                    value: get_required_expr(obj, ptr, "value")?,
                })
            }
            "var" => StmtKind::Var(Var {
                name: get_required_string(obj, &format!("{ptr}/name"), "name")?,
                ty: get_required_type(obj, ptr, "type")?,
            }),
            "while" => StmtKind::While(self.parse_while(obj, ptr)?),
            _ => {
                return Err(err(
                    format!("unknown statement kind: {kind:?}"),
                    &format!("{ptr}/kind"),
                ))
            }
        };

        let mut pos = Pos::default();
        if let Some(file) = obj.get("file").and_then(Value::as_str) {
            // The name is echoed into `//` line comments.
            if file.chars().any(char::is_control) {
                return Err(err(
                    "file must not contain control characters",
                    &format!("{ptr}/file"),
                ));
            }
            pos.filename = file.to_string();
        }
        if let Some(line) = obj.get("line") {
            let line = line
                .as_u64()
                .and_then(|l| u32::try_from(l).ok())
                .ok_or_else(|| err("line must be a u32", &format!("{ptr}/line")))?;
            pos.line = line;
        }
        Ok(Stmt { pos, kind })
    }

    fn parse_if(&mut self, obj: &Map<String, Value>, ptr: &str) -> Result<If, AstJsonError> {
        let cond = get_required_expr(obj, ptr, "cond")?;
        let body_if_true = self.parse_body(obj, ptr, "then")?;
        let body_if_false = self.parse_body(obj, ptr, "else")?;
        let else_if = match obj.get("else_if") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let eptr = format!("{ptr}/else_if");
                if !body_if_false.is_empty() {
                    return Err(err("if has both else and else_if", &eptr));
                }
                let eobj = v
                    .as_object()
                    .ok_or_else(|| err("else_if must be an object", &eptr))?;
                Some(Box::new(self.parse_if(eobj, &eptr)?))
            }
        };
        Ok(If {
            cond,
            body_if_true,
            body_if_false,
            else_if,
        })
    }

    fn enter_loop(&mut self, obj: &Map<String, Value>, ptr: &str) -> Result<LoopId, AstJsonError> {
        let label = match obj.get("label") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => {
                if self.loops.iter().any(|l| l.label.as_deref() == Some(s.as_str())) {
                    return Err(err(
                        format!("duplicate loop label: {s:?}"),
                        &format!("{ptr}/label"),
                    ));
                }
                Some(s.clone())
            }
            Some(_) => return Err(err("label must be a string", &format!("{ptr}/label"))),
        };
        let id = LoopId(self.next_loop_id);
        self.next_loop_id += 1;
        self.loops.push(LoopScope {
            id,
            label,
            has_break: false,
            has_continue: false,
        });
        Ok(id)
    }

    fn exit_loop(&mut self, ptr: &str) -> Result<LoopScope, AstJsonError> {
        self.loops
            .pop()
            .ok_or_else(|| err("internal error: loop stack underflow", ptr))
    }

    fn parse_while(&mut self, obj: &Map<String, Value>, ptr: &str) -> Result<While, AstJsonError> {
        let cond = get_required_expr(obj, ptr, "cond")?;
        let id = self.enter_loop(obj, ptr)?;
        let body = self.parse_body(obj, ptr, "body")?;
        let scope = self.exit_loop(ptr)?;
        Ok(While {
            id,
            cond,
            body,
            has_break: scope.has_break,
            has_continue: scope.has_continue,
        })
    }

    fn parse_iterate(&mut self, obj: &Map<String, Value>, ptr: &str) -> Result<Iterate, AstJsonError> {
        let id = self.enter_loop(obj, ptr)?;
        let mut it = self.parse_iterate_round(obj, ptr, id)?;
        let scope = self.exit_loop(ptr)?;

        // `else` rounds continue the same loop; jumps in any round mark the head.
        it.has_break = scope.has_break;
        it.has_continue = scope.has_continue;
        let mut next = it.else_iterate.as_deref_mut();
        while let Some(e) = next {
            e.has_break = scope.has_break;
            e.has_continue = scope.has_continue;
            next = e.else_iterate.as_deref_mut();
        }
        Ok(it)
    }

    fn parse_iterate_round(
        &mut self,
        obj: &Map<String, Value>,
        ptr: &str,
        id: LoopId,
    ) -> Result<Iterate, AstJsonError> {
        let assigns_ptr = format!("{ptr}/assigns");
        let assigns = match obj.get("assigns") {
            None => Vec::new(),
            Some(v) => {
                let arr = v
                    .as_array()
                    .ok_or_else(|| err("assigns must be an array", &assigns_ptr))?;
                let mut out = Vec::with_capacity(arr.len());
                for (idx, a) in arr.iter().enumerate() {
                    let aptr = format!("{assigns_ptr}/{idx}");
                    let aobj = a
                        .as_object()
                        .ok_or_else(|| err("assign must be an object", &aptr))?;
                    out.push(parse_assign(aobj, &aptr)?);
                }
                out
            }
        };
        let length = get_required_u32(obj, ptr, "length")?;
        let unroll = match obj.get("unroll") {
            None => 1,
            Some(_) => get_required_u32(obj, ptr, "unroll")?,
        };
        let body = self.parse_body(obj, ptr, "body")?;
        let else_iterate = match obj.get("else") {
            None | Some(Value::Null) => None,
            Some(v) => {
                let eptr = format!("{ptr}/else");
                let eobj = v
                    .as_object()
                    .ok_or_else(|| err("else must be an object", &eptr))?;
                Some(Box::new(self.parse_iterate_round(eobj, &eptr, id)?))
            }
        };
        Ok(Iterate {
            id,
            assigns,
            length,
            unroll,
            body,
            else_iterate,
            has_break: false,
            has_continue: false,
        })
    }

    fn parse_jump(&mut self, obj: &Map<String, Value>, ptr: &str) -> Result<Jump, AstJsonError> {
        let keyword = match get_required_string(obj, &format!("{ptr}/keyword"), "keyword")?.as_str() {
            "break" => JumpKeyword::Break,
            "continue" => JumpKeyword::Continue,
            other => {
                return Err(err(
                    format!("invalid jump keyword: {other:?}"),
                    &format!("{ptr}/keyword"),
                ))
            }
        };
        let scope = match obj.get("label") {
            None | Some(Value::Null) => self
                .loops
                .last_mut()
                .ok_or_else(|| err(format!("{} outside of a loop", keyword.as_str()), ptr))?,
            Some(Value::String(label)) => self
                .loops
                .iter_mut()
                .rev()
                .find(|l| l.label.as_deref() == Some(label.as_str()))
                .ok_or_else(|| {
                    err(
                        format!("no enclosing loop labeled {label:?}"),
                        &format!("{ptr}/label"),
                    )
                })?,
            Some(_) => return Err(err("label must be a string", &format!("{ptr}/label"))),
        };
        match keyword {
            JumpKeyword::Break => scope.has_break = true,
            JumpKeyword::Continue => scope.has_continue = true,
        }
        Ok(Jump {
            keyword,
            target: scope.id,
        })
    }
}

fn parse_assign(obj: &Map<String, Value>, ptr: &str) -> Result<Assign, AstJsonError> {
    let lhs = get_required_expr(obj, ptr, "lhs")?;
    let rhs = get_required_expr(obj, ptr, "rhs")?;
    let op = match obj.get("op") {
        None => AssignOp::Eq,
        Some(Value::String(s)) => AssignOp::parse(s)
            .ok_or_else(|| err(format!("unknown assignment operator: {s:?}"), &format!("{ptr}/op")))?,
        Some(_) => return Err(err("op must be a string", &format!("{ptr}/op"))),
    };
    let lhs_ty = match obj.get("type") {
        Some(t) => parse_type(t, &format!("{ptr}/type"))?,
        None => lhs
            .mtype
            .clone()
            .ok_or_else(|| err("missing required field: type", ptr))?,
    };
    Ok(Assign {
        lhs,
        lhs_ty,
        op,
        rhs,
    })
}

fn get_required_string(
    obj: &Map<String, Value>,
    ptr: &str,
    key: &str,
) -> Result<String, AstJsonError> {
    let v = obj.get(key).ok_or_else(|| {
        err(
            format!("missing required field: {key}"),
            ptr.rsplit_once('/').map(|(p, _)| p).unwrap_or(""),
        )
    })?;
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| err(format!("{key} must be a string"), ptr))
}

fn get_required_u32(obj: &Map<String, Value>, ptr: &str, key: &str) -> Result<u32, AstJsonError> {
    let v = obj
        .get(key)
        .ok_or_else(|| err(format!("missing required field: {key}"), ptr))?;
    v.as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| err(format!("{key} must be a u32"), &format!("{ptr}/{key}")))
}

fn get_required_expr(obj: &Map<String, Value>, ptr: &str, key: &str) -> Result<Expr, AstJsonError> {
    let v = obj
        .get(key)
        .ok_or_else(|| err(format!("missing required field: {key}"), ptr))?;
    expr_from_json(v, &format!("{ptr}/{key}"))
}

fn get_required_type(
    obj: &Map<String, Value>,
    ptr: &str,
    key: &str,
) -> Result<TypeExpr, AstJsonError> {
    let v = obj
        .get(key)
        .ok_or_else(|| err(format!("missing required field: {key}"), ptr))?;
    parse_type(v, &format!("{ptr}/{key}"))
}

/// `"u8"`, `["array", 4, "u8"]`, `["slice", "u8"]`, `["ptr", t]`.
pub fn parse_type(v: &Value, ptr: &str) -> Result<TypeExpr, AstJsonError> {
    match v {
        Value::String(s) => {
            if !is_c_identifier(s) {
                return Err(err(format!("invalid type name: {s:?}"), ptr));
            }
            Ok(TypeExpr::Named(s.clone()))
        }
        Value::Array(items) => {
            let head = items
                .first()
                .and_then(Value::as_str)
                .ok_or_else(|| err("type head must be a string", &format!("{ptr}/0")))?;
            match (head, items.len()) {
                ("array", 3) => {
                    let len = items[1]
                        .as_u64()
                        .ok_or_else(|| err("array length must be a u64", &format!("{ptr}/1")))?;
                    let inner = parse_type(&items[2], &format!("{ptr}/2"))?;
                    Ok(TypeExpr::Array {
                        len,
                        inner: Box::new(inner),
                    })
                }
                ("slice", 2) => Ok(TypeExpr::Slice(Box::new(parse_type(
                    &items[1],
                    &format!("{ptr}/1"),
                )?))),
                ("ptr", 2) => Ok(TypeExpr::Ptr(Box::new(parse_type(
                    &items[1],
                    &format!("{ptr}/1"),
                )?))),
                _ => Err(err(
                    format!("unknown type constructor {head:?} with {} items", items.len()),
                    ptr,
                )),
            }
        }
        _ => Err(err("type must be a string or an array", ptr)),
    }
}

fn combine_effects<'e>(parts: impl IntoIterator<Item = &'e Expr>) -> Effect {
    let (mut coroutine, mut optional) = (false, false);
    for p in parts {
        coroutine |= p.effect.coroutine();
        optional |= p.effect.optional();
    }
    Effect::new(coroutine, optional)
}

pub fn expr_from_json(v: &Value, ptr: &str) -> Result<Expr, AstJsonError> {
    match v {
        Value::Number(n) => Ok(Expr::literal(&n.to_string())),
        Value::Bool(b) => Ok(Expr::literal(if *b { "true" } else { "false" })),
        Value::String(s) => {
            if s == "ok" {
                return Ok(Expr::ok());
            }
            if !is_c_identifier(s) {
                return Err(err(format!("invalid local name: {s:?}"), ptr));
            }
            Ok(Expr::ident(s))
        }
        Value::Object(obj) => {
            let inner = obj
                .get("expr")
                .ok_or_else(|| err("missing required field: expr", ptr))?;
            let e = expr_from_json(inner, &format!("{ptr}/expr"))?;
            match obj.get("type") {
                None | Some(Value::Null) => Ok(e),
                Some(t) => Ok(e.with_type(parse_type(t, &format!("{ptr}/type"))?)),
            }
        }
        Value::Array(items) => list_expr_from_json(items, ptr),
        Value::Null => Err(err("expression must not be null", ptr)),
    }
}

fn list_expr_from_json(items: &[Value], ptr: &str) -> Result<Expr, AstJsonError> {
    let head = items
        .first()
        .ok_or_else(|| err("list expression must not be empty", ptr))?
        .as_str()
        .ok_or_else(|| err("list head must be a string", &format!("{ptr}/0")))?;
    let item = |idx: usize| -> Result<Expr, AstJsonError> {
        let v = items
            .get(idx)
            .ok_or_else(|| err(format!("{head} is missing operand {idx}"), ptr))?;
        expr_from_json(v, &format!("{ptr}/{idx}"))
    };
    let name_at = |idx: usize| -> Result<String, AstJsonError> {
        items
            .get(idx)
            .and_then(Value::as_str)
            .filter(|s| is_c_identifier(s))
            .map(str::to_string)
            .ok_or_else(|| err(format!("{head} expects a name"), &format!("{ptr}/{idx}")))
    };
    let arity = |n: usize| -> Result<(), AstJsonError> {
        if items.len() != n + 1 {
            return Err(err(
                format!("{head} expects {n} operands, got {}", items.len() - 1),
                ptr,
            ));
        }
        Ok(())
    };

    match head {
        "status" => {
            arity(1)?;
            let msg = items[1]
                .as_str()
                .ok_or_else(|| err("status message must be a string", &format!("{ptr}/1")))?;
            Ok(Expr::status(msg))
        }
        "args" => {
            arity(1)?;
            Ok(Expr::arg(&name_at(1)?))
        }
        "this" => {
            arity(1)?;
            Ok(Expr::new(ExprKind::Field(name_at(1)?)))
        }
        "[]" => {
            arity(2)?;
            let lhs = item(1)?;
            let index = item(2)?;
            let effect = combine_effects([&lhs, &index]);
            let mut e = Expr::new(ExprKind::Index {
                lhs: Box::new(lhs),
                index: Box::new(index),
            });
            e.effect = effect;
            Ok(e)
        }
        "[:]" => {
            arity(3)?;
            let lhs = item(1)?;
            let lo = match &items[2] {
                Value::Null => None,
                _ => Some(item(2)?),
            };
            let hi = match &items[3] {
                Value::Null => None,
                _ => Some(item(3)?),
            };
            let effect = combine_effects(std::iter::once(&lhs).chain(lo.iter()).chain(hi.iter()));
            let mut e = Expr::new(ExprKind::Slice {
                lhs: Box::new(lhs),
                lo: lo.map(Box::new),
                hi: hi.map(Box::new),
            });
            e.effect = effect;
            Ok(e)
        }
        "call" | "call!" | "call?" => call_expr_from_json(head, items, ptr),
        "as" => {
            arity(2)?;
            let lhs = item(1)?;
            let ty = parse_type(&items[2], &format!("{ptr}/2"))?;
            let rhs = Expr::literal(&ty.str()).with_type(ty);
            Ok(Expr::binary(BinaryOp::As, lhs, rhs))
        }
        _ => {
            if let Some(op) = UnaryOp::parse(head) {
                arity(1)?;
                let rhs = item(1)?;
                let effect = rhs.effect;
                let mut e = Expr::new(ExprKind::Unary {
                    op,
                    rhs: Box::new(rhs),
                });
                e.effect = effect;
                return Ok(e);
            }
            if let Some(op) = BinaryOp::parse(head) {
                arity(2)?;
                return Ok(Expr::binary(op, item(1)?, item(2)?));
            }
            Err(err(format!("unknown expression head: {head:?}"), &format!("{ptr}/0")))
        }
    }
}

/// `["call?", "decode_frame", recv|null, ["src", <expr>], ...]`
fn call_expr_from_json(head: &str, items: &[Value], ptr: &str) -> Result<Expr, AstJsonError> {
    let effect = match head {
        "call?" => Effect::SUSPENDIBLE,
        "call!" => Effect::OPTIONAL,
        _ => Effect::PURE,
    };
    let func = items
        .get(1)
        .and_then(Value::as_str)
        .filter(|s| s.split('.').all(is_c_identifier))
        .ok_or_else(|| err("call expects a function name", &format!("{ptr}/1")))?;
    let recv = match items.get(2) {
        None | Some(Value::Null) => None,
        Some(v) => {
            let rptr = format!("{ptr}/2");
            let recv = expr_from_json(v, &rptr)?;
            if recv.effect.coroutine() {
                return Err(err("call receiver must not suspend", &rptr));
            }
            Some(recv)
        }
    };

    let mut args = Vec::new();
    for (idx, a) in items.iter().enumerate().skip(3) {
        let aptr = format!("{ptr}/{idx}");
        let pair = a
            .as_array()
            .filter(|p| p.len() == 2)
            .ok_or_else(|| err("call argument must be a [name, value] pair", &aptr))?;
        let name = pair[0]
            .as_str()
            .filter(|s| is_c_identifier(s))
            .ok_or_else(|| err("call argument name must be an identifier", &format!("{aptr}/0")))?;
        let value = expr_from_json(&pair[1], &format!("{aptr}/1"))?;
        if value.effect.coroutine() {
            return Err(err("call arguments must not suspend", &format!("{aptr}/1")));
        }
        args.push(CallArg {
            name: name.to_string(),
            value,
        });
    }

    Ok(Expr::call(func, recv, args, effect))
}

fn is_c_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c == '_' || c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}
