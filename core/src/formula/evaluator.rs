//! Resolves a parsed formula against its argument names and evaluates it.

use super::parser::{parse_formula, BinaryOperator, Expr, UnaryOperator};
use super::{FormulaError, FormulaFn};

type Unary = fn(f64) -> f64;
type Binary = fn(f64, f64) -> f64;

#[derive(Debug, Clone)]
enum Node {
    Number(f64),
    Arg(usize),
    Neg(Box<Node>),
    Binary(BinaryOperator, Box<Node>, Box<Node>),
    Call1(Unary, Box<Node>),
    Call2(Binary, Box<Node>, Box<Node>),
}

fn lookup_unary(name: &str) -> Option<Unary> {
    let f: Unary = match name {
        "sin" => f64::sin,
        "cos" => f64::cos,
        "tan" => f64::tan,
        "asin" => f64::asin,
        "acos" => f64::acos,
        "atan" => f64::atan,
        "sqrt" => f64::sqrt,
        "abs" => f64::abs,
        "ln" => f64::ln,
        "log10" => f64::log10,
        "exp" => f64::exp,
        "floor" => f64::floor,
        "ceil" => f64::ceil,
        "round" => f64::round,
        _ => return None,
    };
    Some(f)
}

fn lookup_binary(name: &str) -> Option<Binary> {
    let f: Binary = match name {
        "atan2" => f64::atan2,
        "min" => f64::min,
        "max" => f64::max,
        "hypot" => f64::hypot,
        _ => return None,
    };
    Some(f)
}

fn check_arity(name: &str, expected: usize, args: &[Expr]) -> Result<(), FormulaError> {
    if args.len() != expected {
        return Err(FormulaError::WrongArgumentCount {
            name: name.to_string(),
            expected,
            got: args.len(),
        });
    }
    Ok(())
}

fn resolve(expr: &Expr, names: &[&str]) -> Result<Node, FormulaError> {
    Ok(match expr {
        Expr::Number(n) => Node::Number(*n),
        Expr::Name(name) => {
            let index = names
                .iter()
                .position(|candidate| *candidate == name.as_str())
                .ok_or_else(|| FormulaError::UnknownArgument(name.clone()))?;
            Node::Arg(index)
        }
        Expr::Constant(name) => match name.as_str() {
            "PI" => Node::Number(std::f64::consts::PI),
            "E" => Node::Number(std::f64::consts::E),
            _ => return Err(FormulaError::UnknownConstant(name.clone())),
        },
        Expr::UnaryOp { op: UnaryOperator::Neg, operand } => Node::Neg(Box::new(resolve(operand, names)?)),
        Expr::BinaryOp { op, left, right } => {
            Node::Binary(*op, Box::new(resolve(left, names)?), Box::new(resolve(right, names)?))
        }
        Expr::FnCall { name, args } => {
            if let Some(f) = lookup_unary(name) {
                check_arity(name, 1, args)?;
                Node::Call1(f, Box::new(resolve(&args[0], names)?))
            } else if let Some(f) = lookup_binary(name) {
                check_arity(name, 2, args)?;
                Node::Call2(
                    f,
                    Box::new(resolve(&args[0], names)?),
                    Box::new(resolve(&args[1], names)?),
                )
            } else {
                return Err(FormulaError::UnknownFunction(name.clone()));
            }
        }
    })
}

fn eval(node: &Node, args: &[f64]) -> f64 {
    match node {
        Node::Number(n) => *n,
        // Missing arguments read as NaN so the minimizer sees a non-finite error.
        Node::Arg(i) => args.get(*i).copied().unwrap_or(f64::NAN),
        Node::Neg(inner) => -eval(inner, args),
        Node::Binary(op, l, r) => {
            let l = eval(l, args);
            let r = eval(r, args);
            match op {
                BinaryOperator::Add => l + r,
                BinaryOperator::Sub => l - r,
                BinaryOperator::Mul => l * r,
                BinaryOperator::Div => l / r,
                BinaryOperator::Pow => l.powf(r),
            }
        }
        Node::Call1(f, a) => f(eval(a, args)),
        Node::Call2(f, a, b) => f(eval(a, args), eval(b, args)),
    }
}

/// A formula resolved against a fixed list of argument names.
#[derive(Debug, Clone)]
pub struct Program {
    root: Node,
    arity: usize,
}

impl Program {
    pub fn new(source: &str, arg_names: &[&str]) -> Result<Self, FormulaError> {
        let expr = parse_formula(source)?;
        let root = resolve(&expr, arg_names)?;
        Ok(Self { root, arity: arg_names.len() })
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Evaluate with positional argument values. Domain errors yield NaN or infinity.
    pub fn eval(&self, args: &[f64]) -> f64 {
        eval(&self.root, args)
    }
}

/// Compile formula source into a callable over positional arguments.
pub fn compile(source: &str, arg_names: &[&str]) -> Result<FormulaFn, FormulaError> {
    let program = Program::new(source, arg_names)?;
    Ok(FormulaFn::new(move |args: &[f64]| program.eval(args)))
}
