use std::fmt;

pub const MAX_EXPR_STR_DEPTH: u32 = 255;
pub const MAX_TYPE_EXPR_STR_DEPTH: u32 = 63;

/// Effect flags attached to an expression (or a whole function) by the type checker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Effect {
    coroutine: bool,
    optional: bool,
}

impl Effect {
    pub const PURE: Effect = Effect {
        coroutine: false,
        optional: false,
    };
    /// `!`: produces a status that must be checked but never suspends.
    pub const OPTIONAL: Effect = Effect {
        coroutine: false,
        optional: true,
    };
    /// `?`: may suspend, and produces a status.
    pub const SUSPENDIBLE: Effect = Effect {
        coroutine: true,
        optional: true,
    };

    pub fn new(coroutine: bool, optional: bool) -> Self {
        Self {
            coroutine,
            optional,
        }
    }

    pub fn coroutine(self) -> bool {
        self.coroutine
    }

    pub fn optional(self) -> bool {
        self.optional
    }

    pub fn marker(self) -> &'static str {
        if self.coroutine {
            "?"
        } else if self.optional {
            "!"
        } else {
            ""
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Eq,
    EqQuestion,
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    ShiftLEq,
    ShiftREq,
    AmpEq,
    AmpHatEq,
    PipeEq,
    HatEq,
    TildeModPlusEq,
    TildeModMinusEq,
    TildeSatPlusEq,
    TildeSatMinusEq,
}

impl AssignOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "=" => AssignOp::Eq,
            "=?" => AssignOp::EqQuestion,
            "+=" => AssignOp::PlusEq,
            "-=" => AssignOp::MinusEq,
            "*=" => AssignOp::StarEq,
            "/=" => AssignOp::SlashEq,
            "%=" => AssignOp::PercentEq,
            "<<=" => AssignOp::ShiftLEq,
            ">>=" => AssignOp::ShiftREq,
            "&=" => AssignOp::AmpEq,
            "&^=" => AssignOp::AmpHatEq,
            "|=" => AssignOp::PipeEq,
            "^=" => AssignOp::HatEq,
            "~mod+=" => AssignOp::TildeModPlusEq,
            "~mod-=" => AssignOp::TildeModMinusEq,
            "~sat+=" => AssignOp::TildeSatPlusEq,
            "~sat-=" => AssignOp::TildeSatMinusEq,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssignOp::Eq => "=",
            AssignOp::EqQuestion => "=?",
            AssignOp::PlusEq => "+=",
            AssignOp::MinusEq => "-=",
            AssignOp::StarEq => "*=",
            AssignOp::SlashEq => "/=",
            AssignOp::PercentEq => "%=",
            AssignOp::ShiftLEq => "<<=",
            AssignOp::ShiftREq => ">>=",
            AssignOp::AmpEq => "&=",
            AssignOp::AmpHatEq => "&^=",
            AssignOp::PipeEq => "|=",
            AssignOp::HatEq => "^=",
            AssignOp::TildeModPlusEq => "~mod+=",
            AssignOp::TildeModMinusEq => "~mod-=",
            AssignOp::TildeSatPlusEq => "~sat+=",
            AssignOp::TildeSatMinusEq => "~sat-=",
        }
    }

    /// C spelling of the assignment, including the surrounding spaces.
    ///
    /// `None` for operators with no direct C counterpart.
    pub fn c_op_name(self) -> Option<&'static str> {
        match self {
            AssignOp::Eq | AssignOp::EqQuestion => Some(" = "),
            AssignOp::PlusEq | AssignOp::TildeModPlusEq => Some(" += "),
            AssignOp::MinusEq | AssignOp::TildeModMinusEq => Some(" -= "),
            AssignOp::StarEq => Some(" *= "),
            AssignOp::SlashEq => Some(" /= "),
            AssignOp::PercentEq => Some(" %= "),
            AssignOp::ShiftLEq => Some(" <<= "),
            AssignOp::ShiftREq => Some(" >>= "),
            AssignOp::AmpEq => Some(" &= "),
            AssignOp::PipeEq => Some(" |= "),
            AssignOp::HatEq => Some(" ^= "),
            AssignOp::AmpHatEq | AssignOp::TildeSatPlusEq | AssignOp::TildeSatMinusEq => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Not,
}

impl UnaryOp {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "u+" => Some(UnaryOp::Plus),
            "u-" => Some(UnaryOp::Minus),
            "not" => Some(UnaryOp::Not),
            _ => None,
        }
    }

    fn source_str(self) -> &'static str {
        match self {
            UnaryOp::Plus => "+",
            UnaryOp::Minus => "-",
            UnaryOp::Not => "not ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    ShiftL,
    ShiftR,
    Amp,
    AmpHat,
    Pipe,
    Hat,
    TildeModPlus,
    TildeModMinus,
    TildeSatPlus,
    TildeSatMinus,
    NotEq,
    LessThan,
    LessEq,
    EqEq,
    GreaterEq,
    GreaterThan,
    And,
    Or,
    As,
}

impl BinaryOp {
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "+" => BinaryOp::Plus,
            "-" => BinaryOp::Minus,
            "*" => BinaryOp::Star,
            "/" => BinaryOp::Slash,
            "%" => BinaryOp::Percent,
            "<<" => BinaryOp::ShiftL,
            ">>" => BinaryOp::ShiftR,
            "&" => BinaryOp::Amp,
            "&^" => BinaryOp::AmpHat,
            "|" => BinaryOp::Pipe,
            "^" => BinaryOp::Hat,
            "~mod+" => BinaryOp::TildeModPlus,
            "~mod-" => BinaryOp::TildeModMinus,
            "~sat+" => BinaryOp::TildeSatPlus,
            "~sat-" => BinaryOp::TildeSatMinus,
            "!=" => BinaryOp::NotEq,
            "<" => BinaryOp::LessThan,
            "<=" => BinaryOp::LessEq,
            "==" => BinaryOp::EqEq,
            ">=" => BinaryOp::GreaterEq,
            ">" => BinaryOp::GreaterThan,
            "and" => BinaryOp::And,
            "or" => BinaryOp::Or,
            "as" => BinaryOp::As,
            _ => return None,
        })
    }

    pub fn source_str(self) -> &'static str {
        match self {
            BinaryOp::Plus => " + ",
            BinaryOp::Minus => " - ",
            BinaryOp::Star => " * ",
            BinaryOp::Slash => " / ",
            BinaryOp::Percent => " % ",
            BinaryOp::ShiftL => " << ",
            BinaryOp::ShiftR => " >> ",
            BinaryOp::Amp => " & ",
            BinaryOp::AmpHat => " &^ ",
            BinaryOp::Pipe => " | ",
            BinaryOp::Hat => " ^ ",
            BinaryOp::TildeModPlus => " ~mod+ ",
            BinaryOp::TildeModMinus => " ~mod- ",
            BinaryOp::TildeSatPlus => " ~sat+ ",
            BinaryOp::TildeSatMinus => " ~sat- ",
            BinaryOp::NotEq => " != ",
            BinaryOp::LessThan => " < ",
            BinaryOp::LessEq => " <= ",
            BinaryOp::EqEq => " == ",
            BinaryOp::GreaterEq => " >= ",
            BinaryOp::GreaterThan => " > ",
            BinaryOp::And => " and ",
            BinaryOp::Or => " or ",
            BinaryOp::As => " as ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    /// `u8`, `u32`, `bool`, `io_reader`, `status`, ...
    Named(String),
    Array { len: u64, inner: Box<TypeExpr> },
    Slice(Box<TypeExpr>),
    Ptr(Box<TypeExpr>),
}

impl TypeExpr {
    pub fn named(name: &str) -> Self {
        TypeExpr::Named(name.to_string())
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeExpr::Array { .. })
    }

    pub fn is_slice(&self) -> bool {
        matches!(self, TypeExpr::Slice(_))
    }

    pub fn io_kind(&self) -> Option<IoKind> {
        match self {
            TypeExpr::Named(n) if n == "io_reader" => Some(IoKind::Reader),
            TypeExpr::Named(n) if n == "io_writer" => Some(IoKind::Writer),
            _ => None,
        }
    }

    /// Bit width of an unsigned integer type, if this is one.
    pub fn uint_bits(&self) -> Option<u32> {
        match self {
            TypeExpr::Named(n) => match n.as_str() {
                "u8" => Some(8),
                "u16" => Some(16),
                "u32" => Some(32),
                "u64" => Some(64),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn str(&self) -> String {
        let mut out = String::new();
        self.append_str(&mut out, 0);
        out
    }

    fn append_str(&self, buf: &mut String, depth: u32) {
        if depth > MAX_TYPE_EXPR_STR_DEPTH {
            buf.push_str("!type_expr_recursion_depth_too_large!");
            return;
        }
        let depth = depth + 1;
        match self {
            TypeExpr::Named(n) => buf.push_str(n),
            TypeExpr::Array { len, inner } => {
                buf.push_str(&format!("array[{len}] "));
                inner.append_str(buf, depth);
            }
            TypeExpr::Slice(inner) => {
                buf.push_str("slice ");
                inner.append_str(buf, depth);
            }
            TypeExpr::Ptr(inner) => {
                buf.push_str("ptr ");
                inner.append_str(buf, depth);
            }
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoKind {
    Reader,
    Writer,
}

impl IoKind {
    pub fn as_str(self) -> &'static str {
        match self {
            IoKind::Reader => "reader",
            IoKind::Writer => "writer",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallArg {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// Function-local variable.
    Ident(String),
    /// `args.name`.
    Arg(String),
    /// `this.name`.
    Field(String),
    /// Numeric or boolean literal, kept as source text.
    Literal(String),
    /// The designated success status.
    Ok,
    /// A status literal such as `"?bad header"` (error) or `"$short read"` (suspension).
    Status(String),
    Unary {
        op: UnaryOp,
        rhs: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        func: String,
        recv: Option<Box<Expr>>,
        args: Vec<CallArg>,
    },
    Index {
        lhs: Box<Expr>,
        index: Box<Expr>,
    },
    Slice {
        lhs: Box<Expr>,
        lo: Option<Box<Expr>>,
        hi: Option<Box<Expr>>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub effect: Effect,
    /// Resolved type, when the checker attached one.
    pub mtype: Option<TypeExpr>,
}

impl Expr {
    pub fn new(kind: ExprKind) -> Self {
        Self {
            kind,
            effect: Effect::PURE,
            mtype: None,
        }
    }

    pub fn ident(name: &str) -> Self {
        Expr::new(ExprKind::Ident(name.to_string()))
    }

    pub fn arg(name: &str) -> Self {
        Expr::new(ExprKind::Arg(name.to_string()))
    }

    pub fn literal(text: &str) -> Self {
        Expr::new(ExprKind::Literal(text.to_string()))
    }

    pub fn ok() -> Self {
        Expr::new(ExprKind::Ok)
    }

    pub fn status(msg: &str) -> Self {
        Expr::new(ExprKind::Status(msg.to_string()))
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        let effect = Effect::new(
            lhs.effect.coroutine() || rhs.effect.coroutine(),
            lhs.effect.optional() || rhs.effect.optional(),
        );
        Expr {
            kind: ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            effect,
            mtype: None,
        }
    }

    pub fn call(func: &str, recv: Option<Expr>, args: Vec<CallArg>, effect: Effect) -> Self {
        Expr {
            kind: ExprKind::Call {
                func: func.to_string(),
                recv: recv.map(Box::new),
                args,
            },
            effect,
            mtype: None,
        }
    }

    pub fn with_type(mut self, ty: TypeExpr) -> Self {
        self.mtype = Some(ty);
        self
    }

    pub fn is_call(&self) -> bool {
        matches!(self.kind, ExprKind::Call { .. })
    }

    /// Source-level rendering, for diagnostics.
    pub fn str(&self) -> String {
        let mut out = String::new();
        self.append_str(&mut out, false, 0);
        out
    }

    fn append_str(&self, buf: &mut String, parenthesize: bool, depth: u32) {
        if depth > MAX_EXPR_STR_DEPTH {
            buf.push_str("!expr_recursion_depth_too_large!");
            return;
        }
        let depth = depth + 1;

        match &self.kind {
            ExprKind::Ident(name) => buf.push_str(name),
            ExprKind::Arg(name) => {
                buf.push_str("args.");
                buf.push_str(name);
            }
            ExprKind::Field(name) => {
                buf.push_str("this.");
                buf.push_str(name);
            }
            ExprKind::Literal(text) => buf.push_str(text),
            ExprKind::Ok => buf.push_str("ok"),
            ExprKind::Status(msg) => {
                buf.push('"');
                buf.push_str(msg);
                buf.push('"');
            }
            ExprKind::Unary { op, rhs } => {
                buf.push_str(op.source_str());
                rhs.append_str(buf, true, depth);
            }
            ExprKind::Binary { op, lhs, rhs } => {
                if parenthesize {
                    buf.push('(');
                }
                lhs.append_str(buf, true, depth);
                buf.push_str(op.source_str());
                match (op, &rhs.mtype) {
                    (BinaryOp::As, Some(ty)) => buf.push_str(&ty.str()),
                    _ => rhs.append_str(buf, true, depth),
                }
                if parenthesize {
                    buf.push(')');
                }
            }
            ExprKind::Call { func, recv, args } => {
                if let Some(recv) = recv {
                    recv.append_str(buf, true, depth);
                    buf.push('.');
                }
                buf.push_str(func);
                buf.push_str(self.effect.marker());
                buf.push('(');
                for (i, arg) in args.iter().enumerate() {
                    if i != 0 {
                        buf.push_str(", ");
                    }
                    buf.push_str(&arg.name);
                    buf.push(':');
                    arg.value.append_str(buf, false, depth);
                }
                buf.push(')');
            }
            ExprKind::Index { lhs, index } => {
                lhs.append_str(buf, true, depth);
                buf.push('[');
                index.append_str(buf, false, depth);
                buf.push(']');
            }
            ExprKind::Slice { lhs, lo, hi } => {
                lhs.append_str(buf, true, depth);
                buf.push('[');
                if let Some(lo) = lo {
                    lo.append_str(buf, false, depth);
                }
                buf.push(':');
                if let Some(hi) = hi {
                    hi.append_str(buf, false, depth);
                }
                buf.push(']');
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.str())
    }
}

/// Identity of a loop statement within one function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoopId(pub u32);

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pos {
    pub filename: String,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stmt {
    pub pos: Pos,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self {
            pos: Pos::default(),
            kind,
        }
    }

    pub fn at(mut self, filename: &str, line: u32) -> Self {
        self.pos = Pos {
            filename: filename.to_string(),
            line,
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StmtKind {
    /// Compile-time proof obligation; erased before codegen.
    Assert(Expr),
    Assign(Assign),
    Expr(Expr),
    IoBind(IoBind),
    If(If),
    Iterate(Iterate),
    Jump(Jump),
    Ret(Ret),
    /// Declarations are hoisted elsewhere.
    Var(Var),
    While(While),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assign {
    pub lhs: Expr,
    pub lhs_ty: TypeExpr,
    pub op: AssignOp,
    pub rhs: Expr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoBindKeyword {
    IoBind,
    IoLimit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IoBind {
    pub keyword: IoBindKeyword,
    /// Either a local I/O variable or `args.foo`.
    pub io: Expr,
    /// The slice (for a bind) or the length (for a limit).
    pub arg1: Expr,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct If {
    pub cond: Expr,
    pub body_if_true: Vec<Stmt>,
    pub body_if_false: Vec<Stmt>,
    pub else_if: Option<Box<If>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Iterate {
    pub id: LoopId,
    pub assigns: Vec<Assign>,
    pub length: u32,
    pub unroll: u32,
    pub body: Vec<Stmt>,
    pub else_iterate: Option<Box<Iterate>>,
    pub has_break: bool,
    pub has_continue: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct While {
    pub id: LoopId,
    pub cond: Expr,
    pub body: Vec<Stmt>,
    pub has_break: bool,
    pub has_continue: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKeyword {
    Break,
    Continue,
}

impl JumpKeyword {
    pub fn as_str(self) -> &'static str {
        match self {
            JumpKeyword::Break => "break",
            JumpKeyword::Continue => "continue",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Jump {
    pub keyword: JumpKeyword,
    pub target: LoopId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetKeyword {
    Return,
    Yield,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ret {
    pub keyword: RetKeyword,
    pub value: Expr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Var {
    pub name: String,
    pub ty: TypeExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncDecl {
    pub name: String,
    /// `optional()` means the function returns a status.
    pub effect: Effect,
    pub out: Option<TypeExpr>,
    pub body: Vec<Stmt>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn binary_str_parenthesizes_nested_operands() {
        let e = Expr::binary(
            BinaryOp::Plus,
            Expr::ident("a"),
            Expr::binary(BinaryOp::TildeModPlus, Expr::arg("b"), Expr::literal("1")),
        );
        assert_eq!(e.str(), "a + (args.b ~mod+ 1)");
    }

    #[test]
    fn call_str_marks_effects() {
        let e = Expr::call(
            "decode_frame",
            Some(Expr::new(ExprKind::Field("dec".to_string()))),
            vec![CallArg {
                name: "src".to_string(),
                value: Expr::arg("src"),
            }],
            Effect::SUSPENDIBLE,
        );
        assert_eq!(e.str(), "this.dec.decode_frame?(src:args.src)");
    }

    #[test]
    fn deep_expr_str_fails_closed() {
        let mut e = Expr::ident("x");
        for _ in 0..300 {
            e = Expr::new(ExprKind::Unary {
                op: UnaryOp::Minus,
                rhs: Box::new(e),
            });
        }
        assert!(e.str().contains("!expr_recursion_depth_too_large!"));
    }

    #[test]
    fn uint_bits_only_for_unsigned_names() {
        assert_eq!(TypeExpr::named("u16").uint_bits(), Some(16));
        assert_eq!(TypeExpr::named("bool").uint_bits(), None);
        let arr = TypeExpr::Array {
            len: 4,
            inner: Box::new(TypeExpr::named("u8")),
        };
        assert_eq!(arr.uint_bits(), None);
        assert_eq!(arr.str(), "array[4] u8");
    }

    #[test]
    fn amp_hat_eq_has_no_c_spelling() {
        assert_eq!(AssignOp::AmpHatEq.c_op_name(), None);
        assert_eq!(AssignOp::TildeModPlusEq.c_op_name(), Some(" += "));
    }
}
