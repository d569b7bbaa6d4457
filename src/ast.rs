use std::rc::Rc;

use crate::expr::{
    AssignData, BinaryData, CallData, Expr, ExprVisitor, FunctionExprData, GetData,
    GroupingData, LogicalData, SetData, ThisData, UnaryData, VariableData,
};
use crate::literal::Literal;
use crate::stmt::{Stmt, StmtVisitor};

/// Returns a string representation of the expression in parenthesis.
macro_rules! parenthesize {
    ( $self:ident, $name:expr, $( $x:expr ),+ ) => {
        {
            let mut string = String::new();
            string += "(";
            string += $name;
            $(
                string += " ";
                string += &$x.accept($self);
            )*
            string += ")";

            string
        }
    };
}

/// Renders the AST as S-expressions, mostly for debugging the parser.
pub struct ASTPrinter;

impl ASTPrinter {
    /// Prints a statement using the visitor pattern.
    pub fn print(&mut self, stmt: &Stmt) -> String {
        stmt.accept(self)
    }

    /// Prints an expression using the visitor pattern.
    pub fn print_expr(&mut self, expr: &Expr) -> String {
        expr.accept(self)
    }

    fn print_function(&mut self, name: Option<&str>, function: &Rc<FunctionExprData>) -> String {
        let mut string = String::new();
        string += "(fun ";
        if let Some(name) = name {
            string += name;
        }
        string += "(";
        string += &function.params.iter()
            .map(|param| param.lexeme.clone())
            .collect::<Vec<String>>()
            .join(" ");
        string += ") { ";
        string += &function.body.iter()
            .map(|stmt| stmt.accept(self))
            .collect::<Vec<String>>()
            .join(" ");
        string += " })";

        string
    }
}

impl ExprVisitor<String> for ASTPrinter {
    fn visit_literal_expr(&mut self, literal: &Literal) -> String {
        literal.to_string() // Uses fmt::Display impl for Literal
    }

    fn visit_unary_expr(&mut self, unary: &UnaryData) -> String {
        parenthesize!(self, &unary.operator.lexeme, &unary.expr)
    }

    fn visit_binary_expr(&mut self, binary: &BinaryData) -> String {
        parenthesize!(self, &binary.operator.lexeme, &binary.left, &binary.right)
    }

    fn visit_logical_expr(&mut self, logical: &LogicalData) -> String {
        parenthesize!(self, &logical.operator.lexeme, &logical.left, &logical.right)
    }

    fn visit_grouping_expr(&mut self, grouping: &GroupingData) -> String {
        parenthesize!(self, "group", grouping.expr)
    }

    fn visit_variable_expr(&mut self, variable: &VariableData) -> String {
        variable.name.lexeme.clone()
    }

    fn visit_assign_expr(&mut self, assign: &AssignData) -> String {
        parenthesize!(self, format!("= {}", &assign.name.lexeme).as_str(), assign.value)
    }

    fn visit_call_expr(&mut self, call: &CallData) -> String {
        let mut string = String::new();
        string += &call.callee.accept(self);
        string += "(";
        string += &call.arguments.iter()
            .map(|argument| argument.accept(self))
            .collect::<Vec<String>>()
            .join(" ");
        string += ")";
        string
    }

    fn visit_get_expr(&mut self, get: &GetData) -> String {
        format!("(. {} {})", get.object.accept(self), get.name.lexeme)
    }

    fn visit_set_expr(&mut self, set: &SetData) -> String {
        format!(
            "(= (. {} {}) {})",
            set.object.accept(self),
            set.name.lexeme,
            set.value.accept(self),
        )
    }

    fn visit_this_expr(&mut self, _this: &ThisData) -> String {
        "this".to_string()
    }

    fn visit_function_expr(&mut self, function: &Rc<FunctionExprData>) -> String {
        self.print_function(None, function)
    }
}

impl StmtVisitor<String> for ASTPrinter {
    fn visit_expression_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::Expression(data) = stmt else { unreachable!() };

        parenthesize!(self, "expr", data.expr)
    }

    fn visit_print_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::Print(data) = stmt else { unreachable!() };

        parenthesize!(self, "print", data.expr)
    }

    fn visit_var_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::Var(data) = stmt else { unreachable!() };

        let mut string = String::new();
        string += "(var ";
        string += &data.name.lexeme;
        if let Some(initializer) = &data.initializer {
            string += " = ";
            string += &initializer.accept(self);
        }
        string += ")";

        string
    }

    fn visit_block_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::Block(data) = stmt else { unreachable!() };

        let mut string = String::new();
        string += "{";
        for stmt in &data.statements {
            string += " ";
            string += &stmt.accept(self);
        }
        string += " }";

        string
    }

    fn visit_if_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::If(data) = stmt else { unreachable!() };

        let mut string = String::new();
        string += "(if ";
        string += &data.condition.accept(self);
        string += " ";
        string += &data.then_branch.accept(self);
        if let Some(else_branch) = &data.else_branch {
            string += " else ";
            string += &else_branch.accept(self);
        }
        string += ")";

        string
    }

    fn visit_while_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::While(data) = stmt else { unreachable!() };

        parenthesize!(self, "while", data.condition, data.body)
    }

    fn visit_break_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::Break(_) = stmt else { unreachable!() };

        "(break)".to_string()
    }

    fn visit_return_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::Return(data) = stmt else { unreachable!() };

        match &data.value {
            Some(value) => parenthesize!(self, "return", value),
            None => "(return)".to_string(),
        }
    }

    fn visit_function_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::Function(data) = stmt else { unreachable!() };

        self.print_function(Some(&data.name.lexeme), &data.function)
    }

    fn visit_class_stmt(&mut self, stmt: &Stmt) -> String {
        let Stmt::Class(data) = stmt else { unreachable!() };

        let mut string = String::new();
        string += "(class ";
        string += &data.name.lexeme;
        if let Some(Expr::Variable(superclass)) = &data.superclass {
            string += " < ";
            string += &superclass.name.lexeme;
        }
        for method in &data.methods {
            string += " ";
            string += &self.print_function(Some(&method.name.lexeme), &method.function);
        }
        string += ")";

        string
    }
}

#[cfg(test)]
mod test {
    use std::rc::Rc;

    use super::*;
    use crate::error::ErrorReporter;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    fn print(source: &str) -> String {
        let reporter = Rc::new(ErrorReporter::new());
        let tokens = Scanner::new(source, Rc::clone(&reporter)).scan_tokens();
        let statements = Parser::new(tokens, Rc::clone(&reporter)).parse();
        assert!(!reporter.had_error());

        statements.iter()
            .map(|stmt| ASTPrinter.print(stmt))
            .collect::<Vec<String>>()
            .join(" ")
    }

    #[test]
    fn prints_binary_with_precedence() {
        assert_eq!(print("1 + 2 * 3;"), "(expr (+ 1 (* 2 3)))");
    }

    #[test]
    fn prints_grouping_and_unary() {
        assert_eq!(print("print -(1 + 2);"), "(print (- (group (+ 1 2))))");
    }

    #[test]
    fn prints_var_and_assignment() {
        assert_eq!(print("var a = 1; a = 2;"), "(var a = 1) (expr (= a 2))");
    }

    #[test]
    fn prints_property_access() {
        assert_eq!(print("a.b.c = a.b;"), "(expr (= (. (. a b) c) (. a b)))");
    }

    #[test]
    fn prints_functions_and_calls() {
        assert_eq!(
            print("fun add(a, b) { return a + b; } add(1, 2);"),
            "(fun add(a b) { (return (+ a b)) }) (expr add(1 2))",
        );
    }

    #[test]
    fn prints_class_with_superclass() {
        assert_eq!(
            print("class B < A { hi() { print 1; } }"),
            "(class B < A (fun hi() { (print 1) }))",
        );
    }
}
