use std::{cell::RefCell, collections::BTreeMap, fmt::Display, ops::Deref, rc::Rc};

use serde::{Deserialize, Serialize};

use crate::{
    diagnostics::Diagnostics,
    expr::{BinaryExpr, Expr, Literal, UnaryExpr},
    stmt::Stmt,
    token::TokenKind,
    value::Value,
};

/// Walks a parsed program statement by statement against a single
/// environment that lives as long as the interpreter.
#[derive(Debug, Clone)]
pub struct Interpreter {
    environment: Environment,

    /// When on (the default), every expression statement prints an
    /// `Expresión [ ... ] evaluada como [ ... ].` line. Kept switchable until
    /// the language decides whether printing-by-default is the real policy.
    pub trace_expressions: bool,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            trace_expressions: true,
        }
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Executes statements in order. The first runtime error is reported to
    /// the sink exactly once and aborts the remainder of the program.
    pub fn interpret(&mut self, program: &[Stmt], diagnostics: &mut Diagnostics) {
        for stmt in program {
            if let Err(error) = self.execute(stmt) {
                diagnostics.runtime_error(&error);
                return;
            }
        }
    }

    pub fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        expr.eval(&mut self.environment)
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        match stmt {
            Stmt::Expression(expr) => {
                let value = expr.eval(&mut self.environment)?;
                if self.trace_expressions {
                    println!("{}", trace_line(expr, &value));
                }
                Ok(())
            }
            Stmt::VarDeclaration(decl) => {
                let value = match &decl.initializer {
                    Some(initializer) => initializer.eval(&mut self.environment)?,
                    None => Value::Absent,
                };
                self.environment
                    .borrow_mut()
                    .define(decl.name.lexeme.clone(), value)
                    .map_err(|kind| RuntimeError::new(kind, decl.name.line))
            }
        }
    }
}

fn trace_line(expr: &Expr, value: &Value) -> String {
    format!("Expresión [ {expr} ] evaluada como [ {value} ].")
}

/// Shared handle to the interpreter's environment. The indirection exists so
/// a later revision can hang a parent scope off `RawEnvironment` without
/// changing any caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Environment(Rc<RefCell<RawEnvironment>>);

impl Deref for Environment {
    type Target = RefCell<RawEnvironment>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// A flat mapping from identifier lexeme to value: at most one binding per
/// lexeme. Operations return line-less error kinds; the evaluation site
/// attaches the offending token's line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct RawEnvironment {
    bindings: BTreeMap<Rc<str>, Value>,
}

impl RawEnvironment {
    /// Creates a binding; a lexeme may only be defined once.
    pub fn define(&mut self, name: Rc<str>, value: Value) -> Result<(), RuntimeErrorKind> {
        if self.bindings.contains_key(name.as_ref()) {
            return Err(RuntimeErrorKind::AlreadyDefined(name));
        }
        self.bindings.insert(name, value);
        Ok(())
    }

    /// Overwrites an existing binding. No Yatay syntax reaches this yet, but
    /// it is part of the environment contract.
    pub fn set(&mut self, name: &str, value: Value) -> Result<(), RuntimeErrorKind> {
        match self.bindings.get_mut(name) {
            Some(binding) => {
                *binding = value;
                Ok(())
            }
            None => Err(RuntimeErrorKind::NotDefined(Rc::from(name))),
        }
    }

    pub fn get(&self, name: &str) -> Result<Value, RuntimeErrorKind> {
        self.bindings
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeErrorKind::NotDefined(Rc::from(name)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct RuntimeError {
    kind: RuntimeErrorKind,
    line: usize,
}

impl RuntimeError {
    pub fn kind(&self) -> &RuntimeErrorKind {
        &self.kind
    }

    pub fn line(&self) -> usize {
        self.line
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Línea {}] Error: {}", self.line, self.kind)
    }
}

#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum RuntimeErrorKind {
    #[error("operand must be a number")]
    OperandMustBeNumber,

    #[error("operands must be numbers")]
    OperandsMustBeNumbers,

    #[error("operands must both be numbers or both be text")]
    OperandsMustBeNumbersOrText,

    #[error("divisor must be nonzero")]
    DivisorMustBeNonzero,

    #[error("identifier '{0}' already defined in this context")]
    AlreadyDefined(Rc<str>),

    #[error("identifier '{0}' not defined in this context")]
    NotDefined(Rc<str>),
}

pub trait Evaluate {
    fn eval(&self, env: &mut Environment) -> Result<Value, RuntimeError>;
}

/// Evaluation that needs no environment and cannot fail.
pub trait StaticEvaluate: Evaluate {
    fn static_eval(&self) -> Value;
}

impl<T> Evaluate for T
where
    T: StaticEvaluate,
{
    fn eval(&self, _env: &mut Environment) -> Result<Value, RuntimeError> {
        Ok(self.static_eval())
    }
}

impl StaticEvaluate for Literal {
    fn static_eval(&self) -> Value {
        self.into()
    }
}

impl Evaluate for Expr {
    fn eval(&self, env: &mut Environment) -> Result<Value, RuntimeError> {
        match self {
            Expr::Unary(inner) => inner.eval(env),
            Expr::Grouping(inner) => inner.eval(env),
            Expr::Literal(inner) => inner.eval(env),
            Expr::Binary(inner) => inner.eval(env),
            Expr::Variable(token) => env
                .borrow()
                .get(token.lexeme.as_ref())
                .map_err(|kind| RuntimeError::new(kind, token.line)),
        }
    }
}

impl Evaluate for UnaryExpr {
    fn eval(&self, env: &mut Environment) -> Result<Value, RuntimeError> {
        let inner = self.right.eval(env)?;

        match self.operator.kind {
            TokenKind::Minus => match inner.as_number() {
                Some(n) => Ok(Value::Number(-n)),
                None => Err(RuntimeError::new(
                    RuntimeErrorKind::OperandMustBeNumber,
                    self.operator.line,
                )),
            },
            TokenKind::KeywordNo => Ok((!inner.as_bool()).into()),
            _ => unreachable!("operator {:?} used in UnaryExpr: {:?}", self.operator, self),
        }
    }
}

impl Evaluate for BinaryExpr {
    fn eval(&self, env: &mut Environment) -> Result<Value, RuntimeError> {
        // Execution is left-to-right.
        let left = self.left.eval(env)?;
        let right = self.right.eval(env)?;
        let line = self.operator.line;

        match self.operator.kind {
            TokenKind::Plus => {
                // We might be adding numbers or concatenating text.
                if let (Value::Number(l), Value::Number(r)) = (&left, &right) {
                    Ok(Value::Number(l + r))
                } else if let (Value::Text(l), Value::Text(r)) = (&left, &right) {
                    let output = l.to_string() + r.as_ref();
                    Ok(Value::Text(Rc::from(output.as_str())))
                } else {
                    Err(RuntimeError::new(
                        RuntimeErrorKind::OperandsMustBeNumbersOrText,
                        line,
                    ))
                }
            }
            TokenKind::Minus
            | TokenKind::Asterisk
            | TokenKind::Slash
            | TokenKind::DoubleSlash
            | TokenKind::Greater
            | TokenKind::GreaterOrEqual
            | TokenKind::Less
            | TokenKind::LessOrEqual => {
                // Math or algebraic comparisons, numbers only.
                if let (Value::Number(l), Value::Number(r)) = (&left, &right) {
                    match self.operator.kind {
                        TokenKind::Minus => Ok(Value::Number(l - r)),
                        TokenKind::Asterisk => Ok(Value::Number(l * r)),
                        TokenKind::Slash => {
                            if *r == 0.0 {
                                Err(RuntimeError::new(
                                    RuntimeErrorKind::DivisorMustBeNonzero,
                                    line,
                                ))
                            } else {
                                Ok(Value::Number(l / r))
                            }
                        }
                        // `//` reads as integer division but computes the
                        // floating-point remainder.
                        TokenKind::DoubleSlash => Ok(Value::Number(l % r)),
                        TokenKind::Greater => Ok(Value::Boolean(l > r)),
                        TokenKind::GreaterOrEqual => Ok(Value::Boolean(l >= r)),
                        TokenKind::Less => Ok(Value::Boolean(l < r)),
                        TokenKind::LessOrEqual => Ok(Value::Boolean(l <= r)),
                        _ => unreachable!(),
                    }
                } else {
                    Err(RuntimeError::new(
                        RuntimeErrorKind::OperandsMustBeNumbers,
                        line,
                    ))
                }
            }
            // Structural equality: cross-variant operands simply compare
            // unequal, they are not an error.
            TokenKind::Equal => Ok(Value::Boolean(left == right)),
            TokenKind::Unequal => Ok(Value::Boolean(left != right)),
            _ => unreachable!(
                "operator {:?} used in BinaryExpr: {:?}",
                self.operator, self
            ),
        }
    }
}
