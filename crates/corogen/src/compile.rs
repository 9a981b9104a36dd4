use std::collections::BTreeMap;
use std::fmt::Display;

use serde_json::Value;

use crate::ast::FuncDecl;
use crate::ast_json;
use crate::c_emit;
use crate::diagnostics::{Diagnostic, Location, Severity, Stage};
use crate::language;
use crate::language::GenLimits;

#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Prefix for user-defined call targets: `foo.bar` in package `gif` becomes `gif__foo__bar`.
    pub package: String,
    /// Emit a `// file:line` comment before every statement that carries a position.
    pub line_comments: bool,
    pub limits: GenLimits,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            package: "base".to_string(),
            line_comments: false,
            limits: GenLimits::from_env(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileStats {
    pub coro_susp_points: u32,
    pub temps: u32,
    pub io_binds: u32,
    pub jump_targets: u32,
    pub c_src_sha256: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompileErrorKind {
    Parse,
    Typing,
    Unsupported,
    Budget,
    Internal,
}

impl CompileErrorKind {
    pub fn code(self) -> &'static str {
        match self {
            CompileErrorKind::Parse => "CG-PARSE-0001",
            CompileErrorKind::Typing => "CG-TYPE-0001",
            CompileErrorKind::Unsupported => "CG-UNSUPPORTED-0001",
            CompileErrorKind::Budget => "CG-BUDGET-0001",
            CompileErrorKind::Internal => "CG-INTERNAL-0001",
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompilerError {
    pub kind: CompileErrorKind,
    pub message: String,
    /// JSON pointer into the input document, when known.
    pub ptr: Option<String>,
}

impl CompilerError {
    pub fn new(kind: CompileErrorKind, message: String) -> Self {
        Self {
            kind,
            message,
            ptr: None,
        }
    }

    pub fn with_ptr(mut self, ptr: String) -> Self {
        self.ptr = Some(ptr);
        self
    }

    pub fn to_diagnostic(&self) -> Diagnostic {
        let stage = match self.kind {
            CompileErrorKind::Parse => Stage::Parse,
            CompileErrorKind::Typing => Stage::Type,
            _ => Stage::Codegen,
        };
        Diagnostic {
            code: self.kind.code().to_string(),
            severity: Severity::Error,
            stage,
            message: self.message.clone(),
            loc: self.ptr.clone().map(|ptr| Location::Ast { ptr }),
            notes: Vec::new(),
            data: BTreeMap::new(),
        }
    }
}

impl std::error::Error for CompilerError {}

impl Display for CompilerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.ptr {
            Some(ptr) => write!(f, "{:?}: {} at {}", self.kind, self.message, ptr),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

/// Generated statements for one function body.
#[derive(Debug, Clone)]
pub struct FuncOutput {
    pub name: String,
    pub c_src: String,
    /// The epilogue must define an `ok:` label.
    pub has_goto_ok: bool,
    pub stats: CompileStats,
}

impl FuncOutput {
    pub fn meta(&self) -> Value {
        serde_json::json!({
            "name": self.name,
            "has_goto_ok": self.has_goto_ok,
            "coro_susp_points": self.stats.coro_susp_points,
            "temps": self.stats.temps,
            "io_binds": self.stats.io_binds,
            "jump_targets": self.stats.jump_targets,
            "c_src_sha256": self.stats.c_src_sha256,
        })
    }
}

pub fn compile_func_to_c(
    func: &FuncDecl,
    options: &CompileOptions,
) -> Result<FuncOutput, CompilerError> {
    c_emit::emit_func_body(func, options)
}

/// Compiles every function of an AST JSON document.
///
/// The first failing function fails the whole translation unit.
pub fn compile_file_to_c(
    bytes: &[u8],
    options: &CompileOptions,
) -> Result<Vec<FuncOutput>, CompilerError> {
    let max = language::limits::max_source_bytes();
    if bytes.len() > max {
        return Err(CompilerError::new(
            CompileErrorKind::Budget,
            format!(
                "program too large: max_source_bytes={max} got {}",
                bytes.len()
            ),
        ));
    }

    let file = ast_json::parse_ast_json(bytes).map_err(|e| {
        CompilerError::new(CompileErrorKind::Parse, e.message).with_ptr(e.ptr)
    })?;

    let mut options = options.clone();
    if let Some(package) = &file.package {
        options.package = package.clone();
    }

    let mut out = Vec::with_capacity(file.funcs.len());
    for (idx, func) in file.funcs.iter().enumerate() {
        let f = compile_func_to_c(func, &options)
            .map_err(|e| e.with_ptr(format!("/funcs/{idx}")))?;
        out.push(f);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_errors_carry_the_json_pointer() {
        let err = compile_file_to_c(
            br#"{"schema_version": "corogen.ast@0.1.0", "funcs": [{"name": "f", "effect": "*"}]}"#,
            &CompileOptions::default(),
        )
        .expect_err("must fail");
        assert_eq!(err.kind, CompileErrorKind::Parse);
        assert_eq!(err.ptr.as_deref(), Some("/funcs/0/effect"));
        assert_eq!(err.to_diagnostic().code, "CG-PARSE-0001");
    }
}
