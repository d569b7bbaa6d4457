use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::mem;
use std::rc::Rc;

use crate::class::Class;
use crate::environment::Environment;
use crate::error::{ErrorReporter, RuntimeError, Signal};
use crate::expr::{
    AssignData, BinaryData, CallData, Expr, ExprId, ExprVisitor, FunctionExprData, GetData,
    GroupingData, LogicalData, SetData, ThisData, UnaryData, VariableData,
};
use crate::function::{Function, NativeFunction};
use crate::literal::Literal;
use crate::object::{Callable, Object};
use crate::stmt::{Stmt, StmtVisitor};
use crate::token::Type;

type EvalResult = Result<Object, Signal>;

/// Walks the AST and produces the program's observable effects.
///
/// The interpreter owns the environment tree and the resolver's side-table.
/// Program output (`print`, interactive echoes) is written to the injected
/// writer; diagnostics go through the error reporter.
pub struct Interpreter<'a> {
    pub globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    locals: HashMap<ExprId, usize>,
    reporter: Rc<ErrorReporter>,
    out: &'a mut dyn Write,
}

impl<'a> Interpreter<'a> {
    pub fn new(out: &'a mut dyn Write, reporter: Rc<ErrorReporter>) -> Self {
        let globals = Rc::new(RefCell::new(Environment::default()));

        for native in NativeFunction::get_globals() {
            let name = native.name;
            globals.borrow_mut().define(name, Object::from(native));
        }

        Interpreter {
            globals: Rc::clone(&globals),
            environment: globals,
            locals: HashMap::new(),
            reporter,
            out,
        }
    }

    /// Executes the statements in order. A runtime error is reported once
    /// and abandons the remaining statements. In interactive mode, non-nil
    /// values yielded by expression statements are echoed back.
    pub fn interpret(&mut self, statements: &[Stmt], interactive: bool) {
        for statement in statements {
            match self.execute(statement) {
                Ok(value) => {
                    if interactive && value != Object::nil() {
                        let _ = writeln!(self.out, "{}", value.quoted());
                    }
                }
                Err(Signal::Error(error)) => {
                    self.reporter.runtime_error(&error);
                    return;
                }
                Err(_) => unreachable!("stray break or return survived resolution"),
            }
        }
    }

    /// Records the lexical distance of a resolved expression.
    pub fn resolve(&mut self, id: ExprId, distance: usize) {
        self.locals.insert(id, distance);
    }

    fn execute(&mut self, stmt: &Stmt) -> EvalResult {
        stmt.accept(self)
    }

    fn evaluate(&mut self, expr: &Expr) -> EvalResult {
        expr.accept(self)
    }

    /// Executes statements in the given environment, restoring the previous
    /// one on every exit path, signal or not.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: Rc<RefCell<Environment>>,
    ) -> Result<(), Signal> {
        let previous = mem::replace(&mut self.environment, environment);

        let mut result = Ok(());
        for statement in statements {
            if let Err(signal) = self.execute(statement) {
                result = Err(signal);
                break;
            }
        }

        self.environment = previous;
        result
    }

    /// Reads a variable at its resolved distance, or from globals when the
    /// resolver has no entry for it.
    fn look_up_variable(&self, id: ExprId, name: &crate::token::Token) -> EvalResult {
        match self.locals.get(&id) {
            Some(&distance) => Ok(self.environment.borrow().get_at(distance, name)?),
            None => Ok(self.globals.borrow().get(name)?),
        }
    }

    fn check_number_operand(
        &self,
        operator: &crate::token::Token,
        operand: &Object,
    ) -> Result<f64, Signal> {
        match operand {
            Object::Literal(Literal::Number(n)) => Ok(*n),
            _ => Err(RuntimeError {
                token: operator.clone(),
                message: "Operand must be a number".to_string(),
            }.into()),
        }
    }

    fn check_number_operands(
        &self,
        operator: &crate::token::Token,
        left: &Object,
        right: &Object,
    ) -> Result<(f64, f64), Signal> {
        match (left, right) {
            (Object::Literal(Literal::Number(l)), Object::Literal(Literal::Number(r))) => Ok((*l, *r)),
            _ => Err(RuntimeError {
                token: operator.clone(),
                message: "Operands must be numbers".to_string(),
            }.into()),
        }
    }
}

impl<'a> ExprVisitor<EvalResult> for Interpreter<'a> {
    fn visit_literal_expr(&mut self, literal: &Literal) -> EvalResult {
        Ok(Object::from(literal.clone()))
    }

    fn visit_grouping_expr(&mut self, grouping: &GroupingData) -> EvalResult {
        self.evaluate(&grouping.expr)
    }

    fn visit_unary_expr(&mut self, unary: &UnaryData) -> EvalResult {
        let right = self.evaluate(&unary.expr)?;

        match unary.operator.r#type {
            Type::Minus => {
                let n = self.check_number_operand(&unary.operator, &right)?;
                Ok(Object::from(-n))
            }
            Type::Bang => Ok(Object::from(!right.is_truthy())),
            _ => unreachable!(),
        }
    }

    fn visit_binary_expr(&mut self, binary: &BinaryData) -> EvalResult {
        let left = self.evaluate(&binary.left)?;
        let right = self.evaluate(&binary.right)?;

        match binary.operator.r#type {
            Type::Greater => {
                let (l, r) = self.check_number_operands(&binary.operator, &left, &right)?;
                Ok(Object::from(l > r))
            }
            Type::GreaterEqual => {
                let (l, r) = self.check_number_operands(&binary.operator, &left, &right)?;
                Ok(Object::from(l >= r))
            }
            Type::Less => {
                let (l, r) = self.check_number_operands(&binary.operator, &left, &right)?;
                Ok(Object::from(l < r))
            }
            Type::LessEqual => {
                let (l, r) = self.check_number_operands(&binary.operator, &left, &right)?;
                Ok(Object::from(l <= r))
            }
            Type::Minus => {
                let (l, r) = self.check_number_operands(&binary.operator, &left, &right)?;
                Ok(Object::from(l - r))
            }
            Type::Star => {
                let (l, r) = self.check_number_operands(&binary.operator, &left, &right)?;
                Ok(Object::from(l * r))
            }
            Type::Slash => {
                let (l, r) = self.check_number_operands(&binary.operator, &left, &right)?;

                if r == 0.0 {
                    return Err(RuntimeError {
                        token: binary.operator.clone(),
                        message: "Cannot divide by zero".to_string(),
                    }.into());
                }

                Ok(Object::from(l / r))
            }
            // `+` also concatenates; a number next to a string is rendered
            // with its trailing `.0` dropped.
            Type::Plus => match (left, right) {
                (Object::Literal(Literal::Number(l)), Object::Literal(Literal::Number(r))) => {
                    Ok(Object::from(l + r))
                }
                (Object::Literal(Literal::String(l)), Object::Literal(Literal::String(r))) => {
                    Ok(Object::from(format!("{l}{r}")))
                }
                (Object::Literal(Literal::String(l)), Object::Literal(Literal::Number(r))) => {
                    Ok(Object::from(format!("{l}{r}")))
                }
                (Object::Literal(Literal::Number(l)), Object::Literal(Literal::String(r))) => {
                    Ok(Object::from(format!("{l}{r}")))
                }
                _ => Err(RuntimeError {
                    token: binary.operator.clone(),
                    message: "Operands must be two numbers or two strings".to_string(),
                }.into()),
            },
            Type::BangEqual => Ok(Object::from(left != right)),
            Type::EqualEqual => Ok(Object::from(left == right)),
            _ => unreachable!(),
        }
    }

    /// `and`/`or` short-circuit and yield the deciding operand itself, not a
    /// boolean.
    fn visit_logical_expr(&mut self, logical: &LogicalData) -> EvalResult {
        let left = self.evaluate(&logical.left)?;

        if logical.operator.r#type == Type::Or {
            if left.is_truthy() {
                return Ok(left);
            }
        } else if !left.is_truthy() {
            return Ok(left);
        }

        self.evaluate(&logical.right)
    }

    fn visit_variable_expr(&mut self, variable: &VariableData) -> EvalResult {
        self.look_up_variable(variable.id, &variable.name)
    }

    fn visit_assign_expr(&mut self, assign: &AssignData) -> EvalResult {
        let value = self.evaluate(&assign.value)?;

        match self.locals.get(&assign.id) {
            Some(&distance) => {
                self.environment.borrow_mut().assign_at(distance, &assign.name, value.clone());
            }
            None => {
                self.globals.borrow_mut().assign(&assign.name, value.clone())?;
            }
        }

        Ok(value)
    }

    fn visit_call_expr(&mut self, call: &CallData) -> EvalResult {
        let callee = self.evaluate(&call.callee)?;

        let mut arguments = Vec::with_capacity(call.arguments.len());
        for argument in &call.arguments {
            arguments.push(self.evaluate(argument)?);
        }

        let callable: &dyn Callable = match &callee {
            Object::Function(function) => function,
            Object::NativeFunction(native) => native,
            Object::Class(class) => class,
            _ => {
                return Err(RuntimeError {
                    token: call.paren.clone(),
                    message: "Can only call functions and classes".to_string(),
                }.into());
            }
        };

        if arguments.len() != callable.arity() {
            return Err(RuntimeError {
                token: call.paren.clone(),
                message: format!(
                    "Expected {} arguments but got {}",
                    callable.arity(),
                    arguments.len(),
                ),
            }.into());
        }

        callable.call(self, arguments)
    }

    fn visit_get_expr(&mut self, get: &GetData) -> EvalResult {
        let object = self.evaluate(&get.object)?;

        if let Object::Instance(instance) = &object {
            Ok(instance.borrow().get(&get.name, &object)?)
        } else {
            Err(RuntimeError {
                token: get.name.clone(),
                message: "Only instances have properties".to_string(),
            }.into())
        }
    }

    fn visit_set_expr(&mut self, set: &SetData) -> EvalResult {
        let object = self.evaluate(&set.object)?;

        let Object::Instance(instance) = object else {
            return Err(RuntimeError {
                token: set.name.clone(),
                message: "Only instances have fields".to_string(),
            }.into());
        };

        let value = self.evaluate(&set.value)?;
        instance.borrow_mut().set(&set.name, value.clone());

        Ok(value)
    }

    fn visit_this_expr(&mut self, this: &ThisData) -> EvalResult {
        self.look_up_variable(this.id, &this.keyword)
    }

    fn visit_function_expr(&mut self, function: &Rc<FunctionExprData>) -> EvalResult {
        Ok(Object::from(Function::new(
            None,
            Rc::clone(function),
            Rc::clone(&self.environment),
            false,
        )))
    }
}

impl<'a> StmtVisitor<EvalResult> for Interpreter<'a> {
    fn visit_expression_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::Expression(data) = stmt else { unreachable!() };

        self.evaluate(&data.expr)
    }

    fn visit_print_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::Print(data) = stmt else { unreachable!() };

        let value = self.evaluate(&data.expr)?;
        let _ = writeln!(self.out, "{value}");

        Ok(Object::nil())
    }

    fn visit_var_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::Var(data) = stmt else { unreachable!() };

        let value = match &data.initializer {
            Some(initializer) => self.evaluate(initializer)?,
            None => Object::nil(),
        };

        self.environment.borrow_mut().define(&data.name.lexeme, value);

        Ok(Object::nil())
    }

    fn visit_block_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::Block(data) = stmt else { unreachable!() };

        let environment = Environment::new(Some(Rc::clone(&self.environment)));
        self.execute_block(&data.statements, Rc::new(RefCell::new(environment)))?;

        Ok(Object::nil())
    }

    fn visit_if_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::If(data) = stmt else { unreachable!() };

        if self.evaluate(&data.condition)?.is_truthy() {
            self.execute(&data.then_branch)?;
        } else if let Some(else_branch) = &data.else_branch {
            self.execute(else_branch)?;
        }

        Ok(Object::nil())
    }

    fn visit_while_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::While(data) = stmt else { unreachable!() };

        while self.evaluate(&data.condition)?.is_truthy() {
            match self.execute(&data.body) {
                Ok(_) => (),
                Err(Signal::Break) => break,
                Err(signal) => return Err(signal),
            }
        }

        Ok(Object::nil())
    }

    fn visit_break_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::Break(_) = stmt else { unreachable!() };

        Err(Signal::Break)
    }

    fn visit_return_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::Return(data) = stmt else { unreachable!() };

        let value = match &data.value {
            Some(value) => self.evaluate(value)?,
            None => Object::nil(),
        };

        Err(Signal::Return(value))
    }

    fn visit_function_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::Function(data) = stmt else { unreachable!() };

        let function = Function::new(
            Some(data.name.lexeme.clone()),
            Rc::clone(&data.function),
            Rc::clone(&self.environment),
            false,
        );

        self.environment.borrow_mut().define(&data.name.lexeme, Object::from(function));

        Ok(Object::nil())
    }

    fn visit_class_stmt(&mut self, stmt: &Stmt) -> EvalResult {
        let Stmt::Class(data) = stmt else { unreachable!() };

        let superclass = match &data.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Object::Class(class) => Some(class),
                _ => {
                    let Expr::Variable(variable) = expr else { unreachable!() };

                    return Err(RuntimeError {
                        token: variable.name.clone(),
                        message: "Super class must be a class".to_string(),
                    }.into());
                }
            },
            None => None,
        };

        // Defining the name first and assigning the finished class after
        // lets methods close over an environment that already knows the
        // class, without a cycle through the class value itself.
        self.environment.borrow_mut().define(&data.name.lexeme, Object::nil());

        let mut methods = HashMap::new();
        for method in &data.methods {
            let function = Function::new(
                Some(method.name.lexeme.clone()),
                Rc::clone(&method.function),
                Rc::clone(&self.environment),
                method.name.lexeme == "init",
            );
            methods.insert(method.name.lexeme.clone(), function);
        }

        let class = Rc::new(Class::new(data.name.lexeme.clone(), superclass, methods));
        self.environment.borrow_mut().assign(&data.name, Object::from(class))?;

        Ok(Object::nil())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::parser::Parser;
    use crate::resolver::Resolver;
    use crate::scanner::Scanner;
    use crate::token::Token;

    /// Runs a full pipeline over `source` and returns the captured output
    /// and whether a runtime error was reported.
    fn run(source: &str) -> (String, bool) {
        let reporter = Rc::new(ErrorReporter::new());
        let tokens = Scanner::new(source, Rc::clone(&reporter)).scan_tokens();
        let statements = Parser::new(tokens, Rc::clone(&reporter)).parse();
        assert!(!reporter.had_error(), "source should scan and parse cleanly");

        let mut output = Vec::new();
        {
            let mut interpreter = Interpreter::new(&mut output, Rc::clone(&reporter));
            Resolver::new(&mut interpreter, Rc::clone(&reporter)).resolve(&statements);
            assert!(!reporter.had_error(), "source should resolve cleanly");
            interpreter.interpret(&statements, false);
        }

        (String::from_utf8(output).unwrap(), reporter.had_runtime_error())
    }

    fn run_interactive(source: &str) -> String {
        let reporter = Rc::new(ErrorReporter::new());
        let tokens = Scanner::new(source, Rc::clone(&reporter)).scan_tokens();
        let statements = Parser::new(tokens, Rc::clone(&reporter)).parse();

        let mut output = Vec::new();
        {
            let mut interpreter = Interpreter::new(&mut output, Rc::clone(&reporter));
            Resolver::new(&mut interpreter, Rc::clone(&reporter)).resolve(&statements);
            interpreter.interpret(&statements, true);
        }

        String::from_utf8(output).unwrap()
    }

    #[test]
    fn evaluate_literal() {
        let reporter = Rc::new(ErrorReporter::new());
        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output, reporter);

        let expr = Expr::Literal(Literal::Number(12.0));
        assert_eq!(interpreter.evaluate(&expr).unwrap(), Object::from(12.0));
    }

    #[test]
    fn evaluate_unary_minus_requires_a_number() {
        let reporter = Rc::new(ErrorReporter::new());
        let mut output = Vec::new();
        let mut interpreter = Interpreter::new(&mut output, reporter);

        let expr = Expr::Unary(UnaryData {
            operator: Token::new(Type::Minus, String::from("-"), None, 1),
            expr: Box::new(Expr::Literal(Literal::from("nope"))),
        });

        assert!(interpreter.evaluate(&expr).is_err());
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(run("print 1 + 2 * 3;").0, "7\n");
        assert_eq!(run("print (1 + 2) * 3;").0, "9\n");
        assert_eq!(run("print 10 - 4 - 3;").0, "3\n");
    }

    #[test]
    fn division_by_zero_is_a_runtime_error() {
        let (output, had_runtime_error) = run("print 1 / 0;");
        assert_eq!(output, "");
        assert!(had_runtime_error);
    }

    #[test]
    fn no_output_after_a_runtime_error() {
        let (output, had_runtime_error) = run("print 1; print 1 / 0; print 2;");
        assert_eq!(output, "1\n");
        assert!(had_runtime_error);
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(run("var a = \"hi\"; print a + \" \" + \"there\";").0, "hi there\n");
        assert_eq!(run("print \"n = \" + 7;").0, "n = 7\n");
        assert_eq!(run("print 7 + \"!\";").0, "7!\n");
        assert_eq!(run("print \"half = \" + 0.5;").0, "half = 0.5\n");
    }

    #[test]
    fn adding_a_bool_is_a_runtime_error() {
        assert!(run("print 1 + true;").1);
    }

    #[test]
    fn logical_operators_yield_the_deciding_operand() {
        assert_eq!(run("print nil or 3;").0, "3\n");
        assert_eq!(run("print 1 and 2;").0, "2\n");
        assert_eq!(run("print false and 2;").0, "false\n");
        assert_eq!(run("print \"yes\" or 2;").0, "yes\n");
    }

    #[test]
    fn logical_operators_short_circuit() {
        let source = "
            fun shout() { print \"called\"; return true; }
            false and shout();
            true or shout();
        ";
        assert_eq!(run(source).0, "");
    }

    #[test]
    fn block_scoping_restores_shadowed_variables() {
        let (output, _) = run("var a = 1; { var a = 2; print a; } print a;");
        assert_eq!(output, "2\n1\n");
    }

    #[test]
    fn closures_capture_their_environment_by_reference() {
        let source = "
            fun make() {
                var i = 0;
                fun inc() { i = i + 1; return i; }
                return inc;
            }
            var c = make();
            print c();
            print c();
            print c();
        ";
        assert_eq!(run(source).0, "1\n2\n3\n");
    }

    #[test]
    fn closures_observe_later_writes_to_captured_variables() {
        let source = "
            var f;
            {
                var a = \"before\";
                fun read() { print a; }
                f = read;
                a = \"after\";
            }
            f();
        ";
        assert_eq!(run(source).0, "after\n");
    }

    #[test]
    fn break_exits_the_innermost_loop_only() {
        let source = "
            var i = 0;
            while (i < 3) {
                var j = 0;
                while (j < 10) {
                    if (j == 1) break;
                    j = j + 1;
                }
                print j;
                i = i + 1;
            }
            print \"done\";
        ";
        assert_eq!(run(source).0, "1\n1\n1\ndone\n");
    }

    #[test]
    fn for_loop_with_break() {
        let source = "
            for (var i = 0; i < 3; i = i + 1) {
                if (i == 2) break;
                print i;
            }
        ";
        assert_eq!(run(source).0, "0\n1\n");
    }

    #[test]
    fn method_binding_keeps_the_receiver() {
        let source = "
            class Greeter {
                init(name) { this.name = name; }
                greet() { return \"hi \" + this.name; }
            }
            var method = Greeter(\"pebble\").greet;
            print method();
        ";
        assert_eq!(run(source).0, "hi pebble\n");
    }

    #[test]
    fn initializer_populates_fields() {
        assert_eq!(run("class C { init(x) { this.x = x; } } print C(7).x;").0, "7\n");
    }

    #[test]
    fn initializer_yields_the_instance_even_on_bare_return() {
        let source = "
            class C {
                init() {
                    this.x = 1;
                    return;
                }
            }
            print C().x;
        ";
        assert_eq!(run(source).0, "1\n");
    }

    #[test]
    fn methods_are_found_through_the_superclass_chain() {
        let source = "
            class A { greet() { return \"hello\"; } }
            class B < A {}
            print B().greet();
        ";
        assert_eq!(run(source).0, "hello\n");
    }

    #[test]
    fn subclass_methods_override() {
        let source = "
            class A { greet() { return \"a\"; } }
            class B < A { greet() { return \"b\"; } }
            print B().greet();
        ";
        assert_eq!(run(source).0, "b\n");
    }

    #[test]
    fn superclass_must_be_a_class() {
        assert!(run("var NotAClass = 1; class A < NotAClass {}").1);
    }

    #[test]
    fn calling_a_non_callable_is_a_runtime_error() {
        assert!(run("var x = 1; x();").1);
    }

    #[test]
    fn arity_is_checked() {
        assert!(run("fun f(a, b) { return a; } f(1);").1);
    }

    #[test]
    fn fields_shadow_methods() {
        let source = "
            class C { label() { return \"method\"; } }
            var c = C();
            c.label = fun () { return \"field\"; };
            print c.label();
        ";
        assert_eq!(run(source).0, "field\n");
    }

    #[test]
    fn undefined_property_is_a_runtime_error() {
        assert!(run("class C {} print C().missing;").1);
    }

    #[test]
    fn anonymous_functions_are_values() {
        let source = "
            var twice = fun (f, x) { return f(f(x)); };
            print twice(fun (n) { return n + 1; }, 5);
        ";
        assert_eq!(run(source).0, "7\n");
    }

    #[test]
    fn stringification_of_functions_and_instances() {
        let source = "
            fun named() { return 1; }
            class Thing {}
            print named;
            print fun () { return 1; };
            print Thing;
            print Thing();
            print clock;
        ";
        assert_eq!(run(source).0, "<fn named>\n<fn>\nThing\nThing instance\n<native fn clock>\n");
    }

    #[test]
    fn interactive_mode_echoes_expression_values() {
        assert_eq!(run_interactive("1 + 1;"), "2\n");
        assert_eq!(run_interactive("\"hi\";"), "\"hi\"\n");
        assert_eq!(run_interactive("nil;"), "");
        assert_eq!(run_interactive("var a = 1;"), "");
    }

    #[test]
    fn clock_is_a_number_of_seconds() {
        let (output, had_runtime_error) = run("print clock() >= 0;");
        assert!(!had_runtime_error);
        assert_eq!(output, "true\n");
    }
}
