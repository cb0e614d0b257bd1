//! Tree-shaped program handed over by the front end.
//!
//! The compiler never sees source text: it only walks these nodes. Every
//! node kind is a closed enum so each visitor has to say what it does with
//! every construct.

use serde::{Deserialize, Serialize};

/// One complete program (the module body).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stmt {
    /// Source line, only used for diagnostics.
    #[serde(default)]
    pub line: u32,
    #[serde(flatten)]
    pub kind: StmtKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StmtKind {
    /// `x = e`
    Assign { targets: Vec<Expr>, value: Expr },

    /// `x += e`
    AugAssign {
        target: Expr,
        op: BinaryOp,
        value: Expr,
    },

    /// `if test: … [else: …]`
    If {
        test: Expr,
        body: Vec<Stmt>,
        #[serde(default)]
        orelse: Vec<Stmt>,
    },

    /// `while test: …`
    While { test: Expr, body: Vec<Stmt> },

    /// `def name(params): …`
    FunctionDef(FunctionDef),

    /// `return [e]`
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },

    /// Bare expression, usually a call.
    Expr { value: Expr },

    Pass,

    /// Anything the front end parsed that this compiler has no case for
    /// (classes, `for`, `try`, …).
    Unsupported { construct: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    #[serde(default)]
    pub params: Vec<Param>,
    pub body: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub annotation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: Literal,
    },
    Name {
        id: String,
    },
    BinOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Call {
        func: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Unsupported {
        construct: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Literal {
    Int(i64),
    Real(f64),
    Bool(bool),
    Str(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==", alias = "=")]
    Eq,
    #[serde(rename = "!=", alias = "<>")]
    NotEq,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    LtE,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    GtE,
    #[serde(rename = "and")]
    And,
    #[serde(rename = "or")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "not")]
    Not,
}

impl StmtKind {
    /// Human readable construct name for diagnostics.
    pub fn construct(&self) -> &str {
        match self {
            StmtKind::Assign { .. } => "assignment",
            StmtKind::AugAssign { .. } => "augmented assignment",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::FunctionDef(_) => "function definition",
            StmtKind::Return { .. } => "return",
            StmtKind::Expr { .. } => "expression statement",
            StmtKind::Pass => "pass",
            StmtKind::Unsupported { construct } => construct,
        }
    }
}

impl Expr {
    pub fn construct(&self) -> &str {
        match self {
            Expr::Literal { .. } => "literal",
            Expr::Name { .. } => "name",
            Expr::BinOp { .. } => "binary operation",
            Expr::UnaryOp { .. } => "unary operation",
            Expr::Call { .. } => "call",
            Expr::Unsupported { construct } => construct,
        }
    }

    // ── builders, handy for hand-written trees ─────────────────────────

    pub fn int(v: i64) -> Self {
        Expr::Literal {
            value: Literal::Int(v),
        }
    }

    pub fn real(v: f64) -> Self {
        Expr::Literal {
            value: Literal::Real(v),
        }
    }

    pub fn bool(v: bool) -> Self {
        Expr::Literal {
            value: Literal::Bool(v),
        }
    }

    pub fn str(v: &str) -> Self {
        Expr::Literal {
            value: Literal::Str(v.to_string()),
        }
    }

    pub fn name(id: &str) -> Self {
        Expr::Name { id: id.to_string() }
    }

    pub fn bin(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::BinOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn call(func: &str, args: Vec<Expr>) -> Self {
        Expr::Call {
            func: func.to_string(),
            args,
        }
    }
}

impl Stmt {
    pub fn new(kind: StmtKind) -> Self {
        Self { line: 0, kind }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn assign(target: &str, value: Expr) -> Self {
        Self::new(StmtKind::Assign {
            targets: vec![Expr::name(target)],
            value,
        })
    }

    pub fn if_else(test: Expr, body: Vec<Stmt>, orelse: Vec<Stmt>) -> Self {
        Self::new(StmtKind::If { test, body, orelse })
    }

    pub fn while_loop(test: Expr, body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::While { test, body })
    }

    pub fn def(name: &str, params: &[&str], body: Vec<Stmt>) -> Self {
        Self::new(StmtKind::FunctionDef(FunctionDef {
            name: name.to_string(),
            params: params
                .iter()
                .map(|p| Param {
                    name: p.to_string(),
                    annotation: None,
                })
                .collect(),
            body,
        }))
    }

    pub fn ret(value: Expr) -> Self {
        Self::new(StmtKind::Return { value: Some(value) })
    }

    pub fn expr(value: Expr) -> Self {
        Self::new(StmtKind::Expr { value })
    }
}

impl Module {
    /// Routine definitions at module level, in source order.
    pub fn routines(&self) -> impl Iterator<Item = (&FunctionDef, u32)> {
        self.body.iter().filter_map(|s| match &s.kind {
            StmtKind::FunctionDef(def) => Some((def, s.line)),
            _ => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_statements() {
        let test_cases = vec![
            (
                r#"{"kind": "assign", "line": 3, "targets": [{"kind": "name", "id": "x"}],
                    "value": {"kind": "literal", "value": {"int": 1}}}"#,
                Stmt::assign("x", Expr::int(1)).at_line(3),
            ),
            (
                r#"{"kind": "while", "test": {"kind": "bin_op", "op": "<>",
                    "left": {"kind": "name", "id": "i"},
                    "right": {"kind": "literal", "value": {"int": 0}}}, "body": [{"kind": "pass"}]}"#,
                Stmt::while_loop(
                    Expr::bin(BinaryOp::NotEq, Expr::name("i"), Expr::int(0)),
                    vec![Stmt::new(StmtKind::Pass)],
                ),
            ),
            (
                r#"{"kind": "function_def", "name": "f", "params": [{"name": "a"}],
                    "body": [{"kind": "return", "value": {"kind": "name", "id": "a"}}]}"#,
                Stmt::def("f", &["a"], vec![Stmt::ret(Expr::name("a"))]),
            ),
            (
                r#"{"kind": "if", "test": {"kind": "literal", "value": {"bool": true}}, "body": []}"#,
                Stmt::if_else(Expr::bool(true), vec![], vec![]),
            ),
        ];

        for (input, expected) in test_cases {
            let stmt: Stmt = serde_json::from_str(input).expect("valid statement");
            assert_eq!(stmt, expected);
        }
    }

    #[test]
    fn test_operator_aliases() {
        let eq: BinaryOp = serde_json::from_str(r#""=""#).unwrap();
        let ne: BinaryOp = serde_json::from_str(r#""<>""#).unwrap();
        assert_eq!(eq, BinaryOp::Eq);
        assert_eq!(ne, BinaryOp::NotEq);
    }

    #[test]
    fn test_routines_in_source_order() {
        let module = Module {
            body: vec![
                Stmt::def("g", &[], vec![]),
                Stmt::assign("x", Expr::int(1)),
                Stmt::def("f", &["a"], vec![]),
            ],
        };
        let names: Vec<&str> = module.routines().map(|(d, _)| d.name.as_str()).collect();
        assert_eq!(names, vec!["g", "f"]);
    }
}
