use std::collections::HashMap;
use std::mem;
use std::rc::Rc;

use crate::error::ErrorReporter;
use crate::expr::{
    AssignData, BinaryData, CallData, ExprId, ExprVisitor, FunctionExprData, GetData,
    GroupingData, LogicalData, SetData, ThisData, UnaryData, VariableData,
};
use crate::interpreter::Interpreter;
use crate::literal::Literal;
use crate::stmt::{Stmt, StmtVisitor};
use crate::token::Token;

enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

enum ClassType {
    None,
    Class,
}

/// What has happened to a local variable so far. `declare` inserts the entry
/// as `Declared`, `define` moves it to `Defined`, and the first resolved read
/// moves it to `Read`. A scope popped with entries still in `Defined` warns
/// about them. `ClassName` marks the implicit `this` binding, which never
/// warns.
#[derive(PartialEq)]
enum VariableState {
    Declared,
    Defined,
    Read,
    ClassName,
}

struct Variable {
    name: Token,
    state: VariableState,
}

/// Walks the freshly parsed program once, before evaluation, to pre-compute
/// lexical distances and enforce the static rules the parser cannot: no
/// duplicate declarations in a scope, no reading a variable in its own
/// initializer, no `this` outside a class, no `return` at the top level, no
/// `break` outside a loop.
///
/// Distances are written straight into the interpreter's side-table; a
/// variable with no entry is a global.
pub struct Resolver<'a, 'w> {
    interpreter: &'a mut Interpreter<'w>,
    reporter: Rc<ErrorReporter>,
    scopes: Vec<HashMap<String, Variable>>,
    current_function: FunctionType,
    current_class: ClassType,
    inside_loop: bool,
}

impl<'a, 'w> Resolver<'a, 'w> {
    pub fn new(interpreter: &'a mut Interpreter<'w>, reporter: Rc<ErrorReporter>) -> Self {
        Resolver {
            interpreter,
            reporter,
            scopes: vec![],
            current_function: FunctionType::None,
            current_class: ClassType::None,
            inside_loop: false,
        }
    }

    pub fn resolve(&mut self, statements: &[Stmt]) {
        for statement in statements {
            self.resolve_stmt(statement);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        stmt.accept(self);
    }

    fn resolve_expr(&mut self, expr: &crate::expr::Expr) {
        expr.accept(self);
    }

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        let scope = self.scopes.pop().expect("scope stack to be not empty");

        for variable in scope.values() {
            if variable.state == VariableState::Defined {
                self.reporter.warn_token(&variable.name, "Local variable is not used");
            }
        }
    }

    fn declare(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };

        if scope.contains_key(&name.lexeme) {
            self.reporter.error_token(name, "Already variable with this name in this scope");
        }

        scope.insert(name.lexeme.clone(), Variable {
            name: name.clone(),
            state: VariableState::Declared,
        });
    }

    fn define(&mut self, name: &Token) {
        let Some(scope) = self.scopes.last_mut() else { return };

        scope.insert(name.lexeme.clone(), Variable {
            name: name.clone(),
            state: VariableState::Defined,
        });
    }

    /// Finds the innermost scope containing `name` and records its distance
    /// for the expression. A read also advances the variable's state so the
    /// scope pop knows it was used.
    fn resolve_local(&mut self, id: ExprId, name: &Token, is_read: bool) {
        for (distance, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(variable) = scope.get_mut(&name.lexeme) {
                self.interpreter.resolve(id, distance);

                if is_read {
                    variable.state = VariableState::Read;
                }

                return;
            }
        }

        // Not found locally; the interpreter falls back to globals.
    }

    /// Resolves a parameter list and body. Function bodies are not part of
    /// any loop that happens to surround the declaration, so `inside_loop`
    /// is cleared for the duration.
    fn resolve_function(&mut self, function: &Rc<FunctionExprData>, r#type: FunctionType) {
        let enclosing_function = mem::replace(&mut self.current_function, r#type);
        let enclosing_loop = mem::replace(&mut self.inside_loop, false);

        self.begin_scope();
        for param in &function.params {
            self.declare(param);
            self.define(param);
        }
        self.resolve(&function.body);
        self.end_scope();

        self.inside_loop = enclosing_loop;
        self.current_function = enclosing_function;
    }
}

impl<'a, 'w> ExprVisitor<()> for Resolver<'a, 'w> {
    fn visit_literal_expr(&mut self, _literal: &Literal) {}

    fn visit_unary_expr(&mut self, unary: &UnaryData) {
        self.resolve_expr(&unary.expr);
    }

    fn visit_binary_expr(&mut self, binary: &BinaryData) {
        self.resolve_expr(&binary.left);
        self.resolve_expr(&binary.right);
    }

    fn visit_logical_expr(&mut self, logical: &LogicalData) {
        self.resolve_expr(&logical.left);
        self.resolve_expr(&logical.right);
    }

    fn visit_grouping_expr(&mut self, grouping: &GroupingData) {
        self.resolve_expr(&grouping.expr);
    }

    fn visit_variable_expr(&mut self, variable: &VariableData) {
        if let Some(scope) = self.scopes.last() {
            if let Some(entry) = scope.get(&variable.name.lexeme) {
                if entry.state == VariableState::Declared {
                    self.reporter.error_token(
                        &variable.name,
                        "Cannot read local variable in its own initializer",
                    );
                }
            }
        }

        self.resolve_local(variable.id, &variable.name, true);
    }

    fn visit_assign_expr(&mut self, assign: &AssignData) {
        self.resolve_expr(&assign.value);
        self.resolve_local(assign.id, &assign.name, false);
    }

    fn visit_call_expr(&mut self, call: &CallData) {
        self.resolve_expr(&call.callee);

        for argument in &call.arguments {
            self.resolve_expr(argument);
        }
    }

    fn visit_get_expr(&mut self, get: &GetData) {
        self.resolve_expr(&get.object);
    }

    fn visit_set_expr(&mut self, set: &SetData) {
        self.resolve_expr(&set.value);
        self.resolve_expr(&set.object);
    }

    fn visit_this_expr(&mut self, this: &ThisData) {
        if let ClassType::None = self.current_class {
            self.reporter.error_token(&this.keyword, "Cannot use 'this' outside of a class");
            return;
        }

        self.resolve_local(this.id, &this.keyword, false);
    }

    fn visit_function_expr(&mut self, function: &Rc<FunctionExprData>) {
        // An anonymous function body is still a function body: `return` is
        // legal inside it no matter where the expression appears.
        self.resolve_function(function, FunctionType::Function);
    }
}

impl<'a, 'w> StmtVisitor<()> for Resolver<'a, 'w> {
    fn visit_expression_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Expression(data) = stmt else { unreachable!() };

        self.resolve_expr(&data.expr);
    }

    fn visit_print_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Print(data) = stmt else { unreachable!() };

        self.resolve_expr(&data.expr);
    }

    fn visit_var_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Var(data) = stmt else { unreachable!() };

        self.declare(&data.name);
        if let Some(initializer) = &data.initializer {
            self.resolve_expr(initializer);
        }
        self.define(&data.name);
    }

    fn visit_block_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Block(data) = stmt else { unreachable!() };

        self.begin_scope();
        self.resolve(&data.statements);
        self.end_scope();
    }

    fn visit_if_stmt(&mut self, stmt: &Stmt) {
        let Stmt::If(data) = stmt else { unreachable!() };

        self.resolve_expr(&data.condition);
        self.resolve_stmt(&data.then_branch);
        if let Some(else_branch) = &data.else_branch {
            self.resolve_stmt(else_branch);
        }
    }

    fn visit_while_stmt(&mut self, stmt: &Stmt) {
        let Stmt::While(data) = stmt else { unreachable!() };

        let enclosing_loop = mem::replace(&mut self.inside_loop, true);
        self.resolve_expr(&data.condition);
        self.resolve_stmt(&data.body);
        self.inside_loop = enclosing_loop;
    }

    fn visit_break_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Break(data) = stmt else { unreachable!() };

        if !self.inside_loop {
            self.reporter.error_token(&data.keyword, "Cannot break from top-level code");
        }
    }

    fn visit_return_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Return(data) = stmt else { unreachable!() };

        if let FunctionType::None = self.current_function {
            self.reporter.error_token(&data.keyword, "Cannot return from top-level code");
        }

        if let Some(value) = &data.value {
            if let FunctionType::Initializer = self.current_function {
                self.reporter.error_token(&data.keyword, "Cannot return a value from an initializer");
                return;
            }

            self.resolve_expr(value);
        }
    }

    fn visit_function_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Function(data) = stmt else { unreachable!() };

        self.declare(&data.name);
        self.define(&data.name);

        self.resolve_function(&data.function, FunctionType::Function);
    }

    fn visit_class_stmt(&mut self, stmt: &Stmt) {
        let Stmt::Class(data) = stmt else { unreachable!() };

        let enclosing_class = mem::replace(&mut self.current_class, ClassType::Class);

        self.declare(&data.name);
        self.define(&data.name);

        if let Some(superclass) = &data.superclass {
            if let crate::expr::Expr::Variable(variable) = superclass {
                if variable.name.lexeme == data.name.lexeme {
                    self.reporter.error_token(&variable.name, "A class cannot inherit from itself");
                }
            }

            self.resolve_expr(superclass);
        }

        self.begin_scope();
        self.scopes
            .last_mut()
            .expect("scope stack to be not empty")
            .insert("this".to_string(), Variable {
                name: data.name.clone(),
                state: VariableState::ClassName,
            });

        for method in &data.methods {
            let declaration = if method.name.lexeme == "init" {
                FunctionType::Initializer
            } else {
                FunctionType::Method
            };

            self.resolve_function(&method.function, declaration);
        }

        self.end_scope();

        self.current_class = enclosing_class;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::scanner::Scanner;

    /// Runs the front half of the pipeline and returns whether resolution
    /// flagged an error.
    fn resolve(source: &str) -> bool {
        let reporter = Rc::new(ErrorReporter::new());
        let tokens = Scanner::new(source, Rc::clone(&reporter)).scan_tokens();
        let statements = Parser::new(tokens, Rc::clone(&reporter)).parse();
        assert!(!reporter.had_error(), "source should scan and parse cleanly");

        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output, Rc::clone(&reporter));
        Resolver::new(&mut interpreter, Rc::clone(&reporter)).resolve(&statements);

        reporter.had_error()
    }

    #[test]
    fn duplicate_declaration_in_scope_errors() {
        assert!(resolve("{ var a = 1; var a = 2; print a; }"));
    }

    #[test]
    fn duplicate_declaration_at_top_level_is_fine() {
        assert!(!resolve("var a = 1; var a = 2; print a;"));
    }

    #[test]
    fn reading_a_variable_in_its_own_initializer_errors() {
        assert!(resolve("{ var a = a; }"));
    }

    #[test]
    fn initializer_may_read_other_variables() {
        assert!(!resolve("var a = 1; { var b = a + 1; print b; }"));
    }

    #[test]
    fn return_at_top_level_errors() {
        assert!(resolve("return 1;"));
    }

    #[test]
    fn return_inside_anonymous_function_is_fine() {
        assert!(!resolve("var f = fun () { return 1; }; print f();"));
    }

    #[test]
    fn return_with_value_in_initializer_errors() {
        assert!(resolve("class A { init() { return 1; } }"));
    }

    #[test]
    fn bare_return_in_initializer_is_fine() {
        assert!(!resolve("class A { init() { return; } }"));
    }

    #[test]
    fn this_outside_a_class_errors() {
        assert!(resolve("fun f() { print this; }"));
    }

    #[test]
    fn break_inside_function_inside_loop_errors() {
        assert!(resolve("while (true) { fun f() { break; } f(); }"));
    }

    #[test]
    fn break_in_nested_loops_is_fine() {
        assert!(!resolve("while (true) { while (true) { break; } break; }"));
    }

    #[test]
    fn class_inheriting_from_itself_errors() {
        assert!(resolve("class A < A {}"));
    }
}
