//! Rule expression trees.
//!
//! The schema compiler hands rule bodies, derived attributes and global rules
//! over as these trees; they are bound at schema-load time and interpreted by
//! the rule evaluator against an instance and a pool snapshot.

use express_core::Value;

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Logical NOT.
    Not,
    /// Arithmetic negation.
    Neg,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    /// Value equality (`=`).
    Eq,
    /// Value inequality (`<>`).
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    /// Instance equality (`:=:`).
    InstanceEq,
    /// Instance inequality (`:<>:`).
    InstanceNotEq,
    And,
    Or,
    Xor,
    /// Aggregate membership (`IN`).
    In,
    /// Wildcard string match (`LIKE`).
    Like,
}

/// Built-in functions available to rule bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Builtin {
    Sizeof,
    Usedin,
    Typeof,
    Exists,
    Nvl,
    Abs,
    Hiindex,
    Loindex,
}

impl Builtin {
    /// Function name as written in schemas.
    pub fn name(&self) -> &'static str {
        match self {
            Builtin::Sizeof => "SIZEOF",
            Builtin::Usedin => "USEDIN",
            Builtin::Typeof => "TYPEOF",
            Builtin::Exists => "EXISTS",
            Builtin::Nvl => "NVL",
            Builtin::Abs => "ABS",
            Builtin::Hiindex => "HIINDEX",
            Builtin::Loindex => "LOINDEX",
        }
    }

    /// Number of arguments the function takes.
    pub fn arity(&self) -> usize {
        match self {
            Builtin::Usedin | Builtin::Nvl => 2,
            _ => 1,
        }
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Constant value.
    Literal(Value),
    /// The instance a rule is evaluated for (`SELF`).
    SelfRef,
    /// A bound variable (QUERY variable or global-rule extent).
    Var(String),
    /// Attribute access (`e.attr`, also `SELF\entity.attr`).
    Attr(Box<Expr>, String),
    /// 1-based aggregate indexing (`e[i]`).
    Index(Box<Expr>, Box<Expr>),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    /// Built-in function call.
    Call(Builtin, Vec<Expr>),
    /// `QUERY(var <* source | predicate)`.
    Query {
        var: String,
        source: Box<Expr>,
        predicate: Box<Expr>,
    },
    /// Aggregate initializer (`[a, b, c]`).
    AggregateInit(Vec<Expr>),
}

impl Expr {
    pub fn lit(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    /// `SELF.name`
    pub fn self_attr(name: impl Into<String>) -> Self {
        Expr::SelfRef.attr(name)
    }

    pub fn attr(self, name: impl Into<String>) -> Self {
        Expr::Attr(Box::new(self), name.into())
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Index(Box::new(self), Box::new(index))
    }

    pub fn call(builtin: Builtin, args: Vec<Expr>) -> Self {
        Expr::Call(builtin, args)
    }

    pub fn sizeof(arg: Expr) -> Self {
        Expr::Call(Builtin::Sizeof, vec![arg])
    }

    pub fn usedin(target: Expr, role: impl Into<String>) -> Self {
        Expr::Call(
            Builtin::Usedin,
            vec![target, Expr::Literal(Value::String(role.into()))],
        )
    }

    pub fn typeof_(arg: Expr) -> Self {
        Expr::Call(Builtin::Typeof, vec![arg])
    }

    pub fn exists(arg: Expr) -> Self {
        Expr::Call(Builtin::Exists, vec![arg])
    }

    pub fn query(var: impl Into<String>, source: Expr, predicate: Expr) -> Self {
        Expr::Query {
            var: var.into(),
            source: Box::new(source),
            predicate: Box::new(predicate),
        }
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Expr::Unary(UnaryOp::Not, Box::new(self))
    }

    pub fn eq(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Eq, self, other)
    }

    pub fn ne(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::NotEq, self, other)
    }

    pub fn lt(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Lt, self, other)
    }

    pub fn le(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::LtEq, self, other)
    }

    pub fn gt(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Gt, self, other)
    }

    pub fn ge(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::GtEq, self, other)
    }

    pub fn and(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::And, self, other)
    }

    pub fn or(self, other: Expr) -> Self {
        Expr::binary(BinaryOp::Or, self, other)
    }

    pub fn in_(self, aggregate: Expr) -> Self {
        Expr::binary(BinaryOp::In, self, aggregate)
    }

    pub fn like(self, pattern: Expr) -> Self {
        Expr::binary(BinaryOp::Like, self, pattern)
    }
}
