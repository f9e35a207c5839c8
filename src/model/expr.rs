//! Expression trees
//!
//! Expressions reference variables by qualified name (`component.variable`) and
//! render in infix notation with the minimum number of parentheses.

use std::fmt::{self, Display};

use itertools::Itertools;
use serde::{Deserialize, Serialize};

/// Binary operators, ordered loosely by precedence group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Quotient,
    Remainder,
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterEqual,
    LessEqual,
    And,
    Or,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
            BinaryOp::Quotient => "//",
            BinaryOp::Remainder => "%",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Greater => ">",
            BinaryOp::Less => "<",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::LessEqual => "<=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Or => 1,
            BinaryOp::And => 2,
            BinaryOp::Equal
            | BinaryOp::NotEqual
            | BinaryOp::Greater
            | BinaryOp::Less
            | BinaryOp::GreaterEqual
            | BinaryOp::LessEqual => 4,
            BinaryOp::Add | BinaryOp::Sub => 5,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Quotient | BinaryOp::Remainder => 6,
            BinaryOp::Pow => 8,
        }
    }

    fn apply(&self, a: f64, b: f64) -> f64 {
        let truth = |value: bool| if value { 1.0 } else { 0.0 };
        match self {
            BinaryOp::Add => a + b,
            BinaryOp::Sub => a - b,
            BinaryOp::Mul => a * b,
            BinaryOp::Div => a / b,
            BinaryOp::Pow => a.powf(b),
            BinaryOp::Quotient => (a / b).floor(),
            BinaryOp::Remainder => a - b * (a / b).floor(),
            BinaryOp::Equal => truth(a == b),
            BinaryOp::NotEqual => truth(a != b),
            BinaryOp::Greater => truth(a > b),
            BinaryOp::Less => truth(a < b),
            BinaryOp::GreaterEqual => truth(a >= b),
            BinaryOp::LessEqual => truth(a <= b),
            BinaryOp::And => truth(a != 0.0 && b != 0.0),
            BinaryOp::Or => truth(a != 0.0 || b != 0.0),
        }
    }
}

/// Built-in functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Function {
    Sqrt,
    Exp,
    /// Natural logarithm, or logarithm to the base given as second argument.
    Log,
    Log10,
    Sin,
    Cos,
    Tan,
    ASin,
    ACos,
    ATan,
    Floor,
    Ceil,
    Abs,
    Max,
    Min,
}

impl Function {
    pub fn name(&self) -> &'static str {
        match self {
            Function::Sqrt => "sqrt",
            Function::Exp => "exp",
            Function::Log => "log",
            Function::Log10 => "log10",
            Function::Sin => "sin",
            Function::Cos => "cos",
            Function::Tan => "tan",
            Function::ASin => "asin",
            Function::ACos => "acos",
            Function::ATan => "atan",
            Function::Floor => "floor",
            Function::Ceil => "ceil",
            Function::Abs => "abs",
            Function::Max => "max",
            Function::Min => "min",
        }
    }

    fn apply(&self, args: &[f64]) -> Option<f64> {
        let value = match (self, args) {
            (Function::Sqrt, [x]) => x.sqrt(),
            (Function::Exp, [x]) => x.exp(),
            (Function::Log, [x]) => x.ln(),
            (Function::Log, [x, base]) => x.log(*base),
            (Function::Log10, [x]) => x.log10(),
            (Function::Sin, [x]) => x.sin(),
            (Function::Cos, [x]) => x.cos(),
            (Function::Tan, [x]) => x.tan(),
            (Function::ASin, [x]) => x.asin(),
            (Function::ACos, [x]) => x.acos(),
            (Function::ATan, [x]) => x.atan(),
            (Function::Floor, [x]) => x.floor(),
            (Function::Ceil, [x]) => x.ceil(),
            (Function::Abs, [x]) => x.abs(),
            (Function::Max, [a, b]) => a.max(*b),
            (Function::Min, [a, b]) => a.min(*b),
            _ => return None,
        };
        Some(value)
    }
}

/// An expression node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Number(f64),
    /// Reference to a variable by qualified name.
    Name(String),
    Neg(Box<Expr>),
    Not(Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
    Call(Function, Vec<Expr>),
    /// Condition/value pairs followed by an optional fallback value.
    Piecewise(Vec<(Expr, Expr)>, Option<Box<Expr>>),
}

const ATOMIC: u8 = 10;
const PREFIX_MINUS: u8 = 7;
const PREFIX_NOT: u8 = 3;

impl Expr {
    pub fn name(qname: impl Into<String>) -> Self {
        Expr::Name(qname.into())
    }

    pub fn binary(op: BinaryOp, left: Expr, right: Expr) -> Self {
        Expr::Binary(op, Box::new(left), Box::new(right))
    }

    pub fn neg(operand: Expr) -> Self {
        Expr::Neg(Box::new(operand))
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Not(Box::new(operand))
    }

    pub fn call(function: Function, args: Vec<Expr>) -> Self {
        Expr::Call(function, args)
    }

    /// Returns true if this is a plain number.
    pub fn is_literal(&self) -> bool {
        matches!(self, Expr::Number(_))
    }

    /// All qualified names referenced by this expression, in order of appearance.
    pub fn references(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_references(&mut names);
        names.into_iter().unique().collect()
    }

    fn collect_references<'a>(&'a self, names: &mut Vec<&'a str>) {
        match self {
            Expr::Number(_) => {}
            Expr::Name(name) => names.push(name),
            Expr::Neg(operand) | Expr::Not(operand) => operand.collect_references(names),
            Expr::Binary(_, left, right) => {
                left.collect_references(names);
                right.collect_references(names);
            }
            Expr::Call(_, args) => args.iter().for_each(|a| a.collect_references(names)),
            Expr::Piecewise(pieces, otherwise) => {
                for (condition, value) in pieces {
                    condition.collect_references(names);
                    value.collect_references(names);
                }
                if let Some(otherwise) = otherwise {
                    otherwise.collect_references(names);
                }
            }
        }
    }

    /// Evaluates the expression, resolving names through `lookup`.
    ///
    /// Returns `None` if a name cannot be resolved, a function receives the
    /// wrong number of arguments, or a piecewise has no matching branch.
    pub fn eval(&self, lookup: &dyn Fn(&str) -> Option<f64>) -> Option<f64> {
        match self {
            Expr::Number(value) => Some(*value),
            Expr::Name(name) => lookup(name),
            Expr::Neg(operand) => operand.eval(lookup).map(|v| -v),
            Expr::Not(operand) => operand
                .eval(lookup)
                .map(|v| if v == 0.0 { 1.0 } else { 0.0 }),
            Expr::Binary(op, left, right) => {
                Some(op.apply(left.eval(lookup)?, right.eval(lookup)?))
            }
            Expr::Call(function, args) => {
                let values = args
                    .iter()
                    .map(|a| a.eval(lookup))
                    .collect::<Option<Vec<_>>>()?;
                function.apply(&values)
            }
            Expr::Piecewise(pieces, otherwise) => {
                for (condition, value) in pieces {
                    if condition.eval(lookup)? != 0.0 {
                        return value.eval(lookup);
                    }
                }
                otherwise.as_ref().and_then(|o| o.eval(lookup))
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(value) if *value < 0.0 => PREFIX_MINUS,
            Expr::Binary(op, _, _) => op.precedence(),
            Expr::Neg(_) => PREFIX_MINUS,
            Expr::Not(_) => PREFIX_NOT,
            _ => ATOMIC,
        }
    }

    fn fmt_operand(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

fn format_number(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        if value > 0.0 { "inf" } else { "-inf" }.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else if value != 0.0 && (value.abs() < 1e-4 || value.abs() >= 1e15) {
        format!("{:e}", value)
    } else {
        format!("{}", value)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(value) => write!(f, "{}", format_number(*value)),
            Expr::Name(name) => write!(f, "{}", name),
            Expr::Neg(operand) => {
                write!(f, "-")?;
                operand.fmt_operand(f, operand.precedence() <= PREFIX_MINUS)
            }
            Expr::Not(operand) => {
                write!(f, "not ")?;
                operand.fmt_operand(f, operand.precedence() <= PREFIX_NOT)
            }
            Expr::Binary(op, left, right) => {
                let own = op.precedence();
                let (left_parens, right_parens) = match op {
                    BinaryOp::Pow => (left.precedence() <= own, right.precedence() <= own),
                    _ => (left.precedence() < own, right.precedence() <= own),
                };
                left.fmt_operand(f, left_parens)?;
                write!(f, " {} ", op.symbol())?;
                right.fmt_operand(f, right_parens)
            }
            Expr::Call(function, args) => {
                write!(f, "{}({})", function.name(), args.iter().join(", "))
            }
            Expr::Piecewise(pieces, otherwise) => {
                let mut parts = pieces
                    .iter()
                    .flat_map(|(c, v)| [c.to_string(), v.to_string()])
                    .collect::<Vec<_>>();
                if let Some(otherwise) = otherwise {
                    parts.push(otherwise.to_string());
                }
                write!(f, "piecewise({})", parts.join(", "))
            }
        }
    }
}
