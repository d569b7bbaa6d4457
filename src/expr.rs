use std::rc::Rc;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::literal::Literal;
use crate::stmt::Stmt;
use crate::token::Token;

/// Stable identity of an expression node that can name a variable.
///
/// The resolver keys its scope-distance side-table by id, so two
/// structurally equal expressions in different places never collide.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
pub struct ExprId(pub usize);

impl ExprId {
    /// Returns a fresh id. The counter is process-global: the side-table of
    /// an interactive session outlives any single parse, so ids must never
    /// repeat across lines.
    pub fn next() -> ExprId {
        static NEXT: AtomicUsize = AtomicUsize::new(0);
        ExprId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Represents an unary expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct UnaryData {
    pub operator: Token,
    pub expr: Box<Expr>,
}

/// Represents a binary expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct BinaryData {
    pub left: Box<Expr>,
    pub operator: Token,
    pub right: Box<Expr>,
}

/// Represents a logical expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct LogicalData {
    pub left: Box<Expr>,
    pub operator: Token,
    pub right: Box<Expr>,
}

/// Represents a grouping expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct GroupingData {
    pub expr: Box<Expr>,
}

/// Represents a variable access expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct VariableData {
    pub id: ExprId,
    pub name: Token,
}

/// Represents an assignment expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct AssignData {
    pub id: ExprId,
    pub name: Token,
    pub value: Box<Expr>,
}

/// Represents a call expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct CallData {
    pub callee: Box<Expr>,
    pub paren: Token,
    pub arguments: Vec<Expr>,
}

/// Represents a property access expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct GetData {
    pub object: Box<Expr>,
    pub name: Token,
}

/// Represents a property assignment expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct SetData {
    pub object: Box<Expr>,
    pub name: Token,
    pub value: Box<Expr>,
}

/// Represents a `this` expression's data in the language.
#[derive(Debug, PartialEq, Clone)]
pub struct ThisData {
    pub id: ExprId,
    pub keyword: Token,
}

/// The parameter list and body shared by function declarations, methods and
/// anonymous function expressions. Runtime closures keep the `Rc` alive for
/// as long as the function value is reachable.
#[derive(Debug, PartialEq)]
pub struct FunctionExprData {
    pub params: Vec<Token>,
    pub body: Vec<Stmt>,
}

/// Represents an expression in the language.
#[derive(Debug, PartialEq, Clone)]
pub enum Expr {
    Literal(Literal),
    Unary(UnaryData),
    Binary(BinaryData),
    Logical(LogicalData),
    Grouping(GroupingData),
    Variable(VariableData),
    Assign(AssignData),
    Call(CallData),
    Get(GetData),
    Set(SetData),
    This(ThisData),
    Function(Rc<FunctionExprData>),
}

impl Expr {
    /// Accepts a visitor and returns the result of the visit.
    pub fn accept<T>(&self, visitor: &mut dyn ExprVisitor<T>) -> T {
        match self {
            Expr::Literal(literal) => visitor.visit_literal_expr(literal),
            Expr::Unary(data) => visitor.visit_unary_expr(data),
            Expr::Binary(data) => visitor.visit_binary_expr(data),
            Expr::Logical(data) => visitor.visit_logical_expr(data),
            Expr::Grouping(data) => visitor.visit_grouping_expr(data),
            Expr::Variable(data) => visitor.visit_variable_expr(data),
            Expr::Assign(data) => visitor.visit_assign_expr(data),
            Expr::Call(data) => visitor.visit_call_expr(data),
            Expr::Get(data) => visitor.visit_get_expr(data),
            Expr::Set(data) => visitor.visit_set_expr(data),
            Expr::This(data) => visitor.visit_this_expr(data),
            Expr::Function(data) => visitor.visit_function_expr(data),
        }
    }
}

pub trait ExprVisitor<T> {
    fn visit_literal_expr(&mut self, literal: &Literal) -> T;
    fn visit_unary_expr(&mut self, unary: &UnaryData) -> T;
    fn visit_binary_expr(&mut self, binary: &BinaryData) -> T;
    fn visit_logical_expr(&mut self, logical: &LogicalData) -> T;
    fn visit_grouping_expr(&mut self, grouping: &GroupingData) -> T;
    fn visit_variable_expr(&mut self, variable: &VariableData) -> T;
    fn visit_assign_expr(&mut self, assign: &AssignData) -> T;
    fn visit_call_expr(&mut self, call: &CallData) -> T;
    fn visit_get_expr(&mut self, get: &GetData) -> T;
    fn visit_set_expr(&mut self, set: &SetData) -> T;
    fn visit_this_expr(&mut self, this: &ThisData) -> T;
    fn visit_function_expr(&mut self, function: &Rc<FunctionExprData>) -> T;
}
