use serde::{Deserialize, Serialize};

use crate::{expr::Expr, token::Token};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expression(Expr),
    VarDeclaration(VarDeclaration),
}

/// `definir <name> (<= <initializer>)? .` A missing initializer leaves the
/// binding absent. The name token is kept whole so runtime redefinition
/// errors can point at its line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new)]
pub struct VarDeclaration {
    pub name: Token,
    pub initializer: Option<Expr>,
}

impl From<Expr> for Stmt {
    fn from(expr: Expr) -> Self {
        Self::Expression(expr)
    }
}
