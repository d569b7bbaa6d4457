use std::rc::Rc;

use crate::error::{ErrorReporter, ParseError};
use crate::expr::*;
use crate::literal::Literal;
use crate::stmt::*;
use crate::token::{Token, Type};

type ParseResult<T> = Result<T, ParseError>;

/// Consumes the next token if it is any of the given types.
macro_rules! matches {
    ( $self:ident, $( $type:expr ),+ ) => {
        {
            if $( $self.check($type) ) ||* {
                $self.advance();
                true
            } else {
                false
            }
        }
    }
}

/// Parses the tokens and returns the resulting statements.
///
/// - Program     -> Declaration* EOF ;
/// - Declaration -> ClassDecl | FunDecl | VarDecl | Statement ;
/// - ClassDecl   -> "class" IDENTIFIER ( "<" IDENTIFIER )? "{" Function* "}" ;
/// - FunDecl     -> "fun" Function ;
/// - Function    -> IDENTIFIER FunctionBody ;
/// - FunctionBody-> "(" Parameters? ")" Block ;
/// - Parameters  -> IDENTIFIER ( "," IDENTIFIER )* ;
/// - VarDecl     -> "var" IDENTIFIER ( "=" Expression )? ";" ;
/// - Statement   -> ExprStmt | ForStmt | IfStmt | PrintStmt | ReturnStmt
///                | WhileStmt | Block | BreakStmt ;
/// - ExprStmt    -> Expression ";" ;
/// - ForStmt     -> "for" "(" ( VarDecl | ExprStmt | ";" ) Expression? ";" Expression? ")" Statement ;
/// - IfStmt      -> "if" "(" Expression ")" Statement ( "else" Statement )? ;
/// - PrintStmt   -> "print" Expression ";" ;
/// - ReturnStmt  -> "return" Expression? ";" ;
/// - WhileStmt   -> "while" "(" Expression ")" Statement ;
/// - BreakStmt   -> "break" ";" ;
/// - Block       -> "{" Declaration* "}" ;
/// - Expression  -> Assignment ;
/// - Assignment  -> ( Call "." )? IDENTIFIER "=" Assignment | LogicOr ;
/// - LogicOr     -> LogicAnd ( "or" LogicAnd )* ;
/// - LogicAnd    -> Equality ( "and" Equality )* ;
/// - Equality    -> Comparison ( ( "!=" | "==" ) Comparison )* ;
/// - Comparison  -> Term ( ( ">" | ">=" | "<" | "<=" ) Term )* ;
/// - Term        -> Factor ( ( "+" | "-" ) Factor )* ;
/// - Factor      -> Unary ( ( "*" | "/" ) Unary )* ;
/// - Unary       -> ( "!" | "-" ) Unary | Call ;
/// - Arguments   -> Expression ( "," Expression )* ;
/// - Call        -> Primary ( "(" Arguments? ")" | "." IDENTIFIER )* ;
/// - Primary     -> NUMBER | STRING | "false" | "true" | "nil" | "this"
///                | IDENTIFIER | "(" Expression ")" | "fun" FunctionBody ;
pub struct Parser {
    tokens: Vec<Token>,
    reporter: Rc<ErrorReporter>,
    current: usize,
    loop_depth: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, reporter: Rc<ErrorReporter>) -> Self {
        Parser {
            tokens,
            reporter,
            current: 0,
            loop_depth: 0,
        }
    }

    /// Parses the tokens and returns the resulting statements. Parse errors
    /// are reported to the sink; the parser synchronizes to the next
    /// statement boundary and keeps going, so the returned list may be
    /// partial.
    pub fn parse(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        statements
    }

    /// Returns the next token without consuming it.
    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    /// Returns the previous token without consuming it.
    fn previous(&self) -> &Token {
        &self.tokens[self.current - 1]
    }

    /// Returns if the parser has reached the end of the file.
    fn is_at_end(&self) -> bool {
        self.peek().r#type == Type::EOF
    }

    /// Returns if the next token is of the given type.
    fn check(&self, r#type: Type) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().r#type == r#type
    }

    /// Returns if the token after the next one is of the given type.
    fn check_next(&self, r#type: Type) -> bool {
        if self.is_at_end() {
            return false;
        }

        match self.tokens.get(self.current + 1) {
            Some(token) => token.r#type == r#type,
            None => false,
        }
    }

    /// Consumes the next token and returns it.
    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }

        self.previous()
    }

    /// Consumes the next token if it is of the given type.
    fn consume(&mut self, r#type: Type, message: &str) -> ParseResult<&Token> {
        if self.check(r#type) {
            return Ok(self.advance());
        }

        Err(ParseError {
            token: self.peek().clone(),
            message: message.to_string(),
        })
    }

    /// Parses a declaration. On a parse error, reports it, synchronizes and
    /// returns `None`.
    fn declaration(&mut self) -> Option<Stmt> {
        let statement = if matches!(self, Type::Class) {
            self.class_declaration()
        } else if self.check(Type::Fun) && self.check_next(Type::Identifier) {
            self.advance();
            self.function("function")
        } else if matches!(self, Type::Var) {
            self.var_declaration()
        } else {
            self.statement()
        };

        match statement {
            Ok(stmt) => Some(stmt),
            Err(error) => {
                self.reporter.error_token(&error.token, &error.message);
                self.synchronize();
                None
            }
        }
    }

    /// Parses a class declaration.
    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, "Expect class name")?.clone();

        let superclass = if matches!(self, Type::Less) {
            let name = self.consume(Type::Identifier, "Expect superclass name")?.clone();
            Some(Expr::Variable(VariableData { id: ExprId::next(), name }))
        } else {
            None
        };

        self.consume(Type::LeftBrace, "Expect '{' before class body")?;

        let mut methods = vec![];
        while !self.check(Type::RightBrace) && !self.is_at_end() {
            if let Stmt::Function(method) = self.function("method")? {
                methods.push(method);
            }
        }

        self.consume(Type::RightBrace, "Expect '}' after class body")?;

        Ok(Stmt::Class(ClassData { name, superclass, methods }))
    }

    /// Parses a named function declaration or a method.
    fn function(&mut self, kind: &str) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, &format!("Expect {kind} name"))?.clone();
        let function = self.function_body(kind)?;

        Ok(Stmt::Function(FunctionData { name, function }))
    }

    /// Parses a parameter list and body, shared between declarations and
    /// anonymous function expressions.
    fn function_body(&mut self, kind: &str) -> ParseResult<Rc<FunctionExprData>> {
        self.consume(Type::LeftParen, &format!("Expect '(' after {kind} name"))?;

        let mut params = vec![];
        if !self.check(Type::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.reporter.error_token(&token, "Cannot have more than 255 parameters");
                }

                params.push(self.consume(Type::Identifier, "Expect parameter name")?.clone());

                if !matches!(self, Type::Comma) {
                    break;
                }
            }
        }

        self.consume(Type::RightParen, "Expect ')' after parameters")?;
        self.consume(Type::LeftBrace, &format!("Expect '{{' before {kind} body"))?;

        let body = self.block()?;

        Ok(Rc::new(FunctionExprData { params, body }))
    }

    /// Parses a variable declaration.
    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(Type::Identifier, "Expect variable name")?.clone();

        let initializer = match matches!(self, Type::Equal) {
            true => Some(self.expression()?),
            false => None,
        };

        self.consume(Type::Semicolon, "Expect ';' after variable declaration")?;
        Ok(Stmt::Var(VarData { name, initializer }))
    }

    /// Parses a statement.
    fn statement(&mut self) -> ParseResult<Stmt> {
        if matches!(self, Type::For) {
            return self.for_statement();
        }

        if matches!(self, Type::If) {
            return self.if_statement();
        }

        if matches!(self, Type::Print) {
            return self.print_statement();
        }

        if matches!(self, Type::Return) {
            return self.return_statement();
        }

        if matches!(self, Type::While) {
            return self.while_statement();
        }

        if matches!(self, Type::Break) {
            return self.break_statement();
        }

        if matches!(self, Type::LeftBrace) {
            return Ok(Stmt::Block(BlockData { statements: self.block()? }));
        }

        self.expression_statement()
    }

    /// Parses a for statement into the equivalent while loop:
    /// `{ initializer; while (condition) { body; increment; } }`.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'for'")?;

        let initializer = if matches!(self, Type::Semicolon) {
            None
        } else if matches!(self, Type::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = match !self.check(Type::Semicolon) {
            true => Some(self.expression()?),
            false => None,
        };
        self.consume(Type::Semicolon, "Expect ';' after loop condition")?;

        let increment = match !self.check(Type::RightParen) {
            true => Some(self.expression()?),
            false => None,
        };
        self.consume(Type::RightParen, "Expect ')' after for clauses")?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;
        let mut body = body?;

        // Execute the increment after the body.
        if let Some(increment) = increment {
            body = Stmt::Block(BlockData {
                statements: vec![
                    body,
                    Stmt::Expression(ExpressionData { expr: increment }),
                ],
            });
        }

        // Wrap the body into a while loop. No condition means loop forever.
        body = Stmt::While(WhileData {
            condition: condition.unwrap_or(Expr::Literal(Literal::Bool(true))),
            body: Box::new(body),
        });

        // Run the initializer once, before the loop.
        if let Some(initializer) = initializer {
            body = Stmt::Block(BlockData {
                statements: vec![initializer, body],
            });
        }

        Ok(body)
    }

    /// Parses an if statement.
    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'if'")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = match matches!(self, Type::Else) {
            true => Some(Box::new(self.statement()?)),
            false => None,
        };

        Ok(Stmt::If(IfData { condition, then_branch, else_branch }))
    }

    /// Parses a print statement.
    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(Type::Semicolon, "Expect ';' after value")?;

        Ok(Stmt::Print(PrintData { expr }))
    }

    /// Parses a return statement.
    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();

        let value = match self.check(Type::Semicolon) {
            true => None,
            false => Some(self.expression()?),
        };

        self.consume(Type::Semicolon, "Expect ';' after return value")?;
        Ok(Stmt::Return(ReturnData { keyword, value }))
    }

    /// Parses a while statement.
    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(Type::LeftParen, "Expect '(' after 'while'")?;
        let condition = self.expression()?;
        self.consume(Type::RightParen, "Expect ')' after condition")?;

        self.loop_depth += 1;
        let body = self.statement();
        self.loop_depth -= 1;

        Ok(Stmt::While(WhileData {
            condition,
            body: Box::new(body?),
        }))
    }

    /// Parses a break statement. Outside of a loop the statement is
    /// reported but still produced; the resolver checks again.
    fn break_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();

        if self.loop_depth == 0 {
            self.reporter.error_token(&keyword, "Must be inside a loop to use 'break'");
        }

        self.consume(Type::Semicolon, "Expect ';' after 'break'")?;
        Ok(Stmt::Break(BreakData { keyword }))
    }

    /// Parses an expression statement.
    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(Type::Semicolon, "Expect ';' after expression")?;

        Ok(Stmt::Expression(ExpressionData { expr }))
    }

    /// Parses a block statement.
    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();

        while !self.check(Type::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        self.consume(Type::RightBrace, "Expect '}' after block")?;

        Ok(statements)
    }

    /// Parses an expression.
    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    /// Parses an assignment expression. The left-hand side is parsed as an
    /// ordinary expression first and reinterpreted once a `=` shows up.
    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if matches!(self, Type::Equal) {
            let equals = self.previous().clone();
            let value = self.assignment()?;

            match expr {
                Expr::Variable(data) => {
                    return Ok(Expr::Assign(AssignData {
                        id: ExprId::next(),
                        name: data.name,
                        value: Box::new(value),
                    }));
                }
                Expr::Get(data) => {
                    return Ok(Expr::Set(SetData {
                        object: data.object,
                        name: data.name,
                        value: Box::new(value),
                    }));
                }
                _ => self.reporter.error_token(&equals, "Invalid assignment target"),
            }
        }

        Ok(expr)
    }

    /// Parses an or expression.
    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;

        while matches!(self, Type::Or) {
            let operator = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical(LogicalData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    /// Parses an and expression.
    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;

        while matches!(self, Type::And) {
            let operator = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical(LogicalData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    /// Parses an equality expression.
    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;

        while matches!(self, Type::BangEqual, Type::EqualEqual) {
            let operator = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary(BinaryData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    /// Parses a comparison expression.
    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;

        while matches!(self, Type::Greater, Type::GreaterEqual, Type::Less, Type::LessEqual) {
            let operator = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary(BinaryData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    /// Parses a term expression.
    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;

        while matches!(self, Type::Minus, Type::Plus) {
            let operator = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary(BinaryData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    /// Parses a factor expression.
    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;

        while matches!(self, Type::Slash, Type::Star) {
            let operator = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary(BinaryData {
                left: Box::new(expr),
                operator,
                right: Box::new(right),
            });
        }

        Ok(expr)
    }

    /// Parses a unary expression.
    fn unary(&mut self) -> ParseResult<Expr> {
        if matches!(self, Type::Bang, Type::Minus) {
            let operator = self.previous().clone();
            let right = self.unary()?;

            return Ok(Expr::Unary(UnaryData {
                operator,
                expr: Box::new(right),
            }));
        }

        self.call()
    }

    /// Parses the arguments of a call.
    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = vec![];

        if !self.check(Type::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    let token = self.peek().clone();
                    self.reporter.error_token(&token, "Cannot have more than 255 arguments");
                }

                arguments.push(self.expression()?);

                if !matches!(self, Type::Comma) {
                    break;
                }
            }
        }

        let paren = self.consume(Type::RightParen, "Expect ')' after arguments")?.clone();

        Ok(Expr::Call(CallData {
            callee: Box::new(callee),
            paren,
            arguments,
        }))
    }

    /// Parses a call expression.
    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;

        loop {
            if matches!(self, Type::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if matches!(self, Type::Dot) {
                let name = self.consume(Type::Identifier, "Expect property name after '.'")?.clone();
                expr = Expr::Get(GetData { object: Box::new(expr), name });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// Parses a primary expression.
    fn primary(&mut self) -> ParseResult<Expr> {
        if matches!(self, Type::False) {
            return Ok(Expr::Literal(Literal::Bool(false)));
        }

        if matches!(self, Type::True) {
            return Ok(Expr::Literal(Literal::Bool(true)));
        }

        if matches!(self, Type::Nil) {
            return Ok(Expr::Literal(Literal::Nil));
        }

        if matches!(self, Type::Number, Type::String) {
            return Ok(Expr::Literal(self.previous().literal.clone()
                .expect("number or string to have a literal value")));
        }

        if matches!(self, Type::This) {
            return Ok(Expr::This(ThisData {
                id: ExprId::next(),
                keyword: self.previous().clone(),
            }));
        }

        if matches!(self, Type::Identifier) {
            return Ok(Expr::Variable(VariableData {
                id: ExprId::next(),
                name: self.previous().clone(),
            }));
        }

        if matches!(self, Type::Fun) {
            return Ok(Expr::Function(self.function_body("function")?));
        }

        if matches!(self, Type::LeftParen) {
            let expr = self.expression()?;
            self.consume(Type::RightParen, "Expect ')' after expression")?;

            return Ok(Expr::Grouping(GroupingData { expr: Box::new(expr) }));
        }

        Err(ParseError {
            token: self.peek().clone(),
            message: "Expect expression".to_string(),
        })
    }

    /// Tries to recover from a parse error by skipping to the next
    /// statement boundary.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().r#type == Type::Semicolon {
                return;
            }

            match self.peek().r#type {
                Type::Class => return,
                Type::Fun => return,
                Type::Var => return,
                Type::For => return,
                Type::If => return,
                Type::While => return,
                Type::Print => return,
                Type::Return => return,
                _ => self.advance(),
            };
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scanner::Scanner;

    fn parse(source: &str) -> (Vec<Stmt>, Rc<ErrorReporter>) {
        let reporter = Rc::new(ErrorReporter::new());
        let tokens = Scanner::new(source, Rc::clone(&reporter)).scan_tokens();
        let statements = Parser::new(tokens, Rc::clone(&reporter)).parse();
        (statements, reporter)
    }

    #[test]
    fn precedence_climbs_from_term_to_factor() {
        let (statements, reporter) = parse("1 + 2 * 3;");
        assert!(!reporter.had_error());

        let Stmt::Expression(data) = &statements[0] else { panic!("expected expression statement") };
        let Expr::Binary(sum) = &data.expr else { panic!("expected binary expression") };
        assert_eq!(sum.operator.r#type, Type::Plus);
        let Expr::Binary(product) = sum.right.as_ref() else { panic!("expected nested product") };
        assert_eq!(product.operator.r#type, Type::Star);
    }

    #[test]
    fn assignment_to_variable_and_property() {
        let (statements, reporter) = parse("a = 1; a.b = 2;");
        assert!(!reporter.had_error());

        let Stmt::Expression(first) = &statements[0] else { panic!() };
        assert!(match first.expr { Expr::Assign(_) => true, _ => false });

        let Stmt::Expression(second) = &statements[1] else { panic!() };
        assert!(match second.expr { Expr::Set(_) => true, _ => false });
    }

    #[test]
    fn invalid_assignment_target_is_reported() {
        let (statements, reporter) = parse("1 = 2;");
        assert!(reporter.had_error());
        // The statement still parses; the error is not fatal.
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn for_desugars_into_while() {
        let (statements, reporter) = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        assert!(!reporter.had_error());
        assert_eq!(statements.len(), 1);

        let Stmt::Block(outer) = &statements[0] else { panic!("expected initializer block") };
        assert!(match outer.statements[0] { Stmt::Var(_) => true, _ => false });
        let Stmt::While(while_stmt) = &outer.statements[1] else { panic!("expected while loop") };
        let Stmt::Block(body) = while_stmt.body.as_ref() else { panic!("expected body block") };
        assert!(match body.statements[1] { Stmt::Expression(_) => true, _ => false });
    }

    #[test]
    fn for_without_condition_loops_forever() {
        let (statements, _) = parse("for (;;) break;");
        let Stmt::While(while_stmt) = &statements[0] else { panic!("expected while loop") };
        assert_eq!(while_stmt.condition, Expr::Literal(Literal::Bool(true)));
    }

    #[test]
    fn fun_keyword_splits_on_lookahead() {
        let (statements, reporter) = parse("fun named() { return 1; } var f = fun () { return 2; };");
        assert!(!reporter.had_error());

        assert!(match statements[0] { Stmt::Function(_) => true, _ => false });
        let Stmt::Var(declaration) = &statements[1] else { panic!() };
        assert!(match declaration.initializer { Some(Expr::Function(_)) => true, _ => false });
    }

    #[test]
    fn break_outside_loop_is_reported_but_parsed() {
        let (statements, reporter) = parse("break;");
        assert!(reporter.had_error());
        assert!(match statements[0] { Stmt::Break(_) => true, _ => false });
    }

    #[test]
    fn break_inside_loop_is_fine() {
        let (_, reporter) = parse("while (true) break;");
        assert!(!reporter.had_error());
    }

    #[test]
    fn class_with_superclass() {
        let (statements, reporter) = parse("class B < A { method() { return 1; } }");
        assert!(!reporter.had_error());

        let Stmt::Class(class) = &statements[0] else { panic!() };
        assert_eq!(class.name.lexeme, "B");
        assert!(class.superclass.is_some());
        assert_eq!(class.methods.len(), 1);
    }

    #[test]
    fn synchronizes_after_an_error() {
        let (statements, reporter) = parse("var = 1; print 2;");
        assert!(reporter.had_error());
        assert_eq!(statements.len(), 1);
        assert!(match statements[0] { Stmt::Print(_) => true, _ => false });
    }

    #[test]
    fn expression_ids_are_unique() {
        let (statements, _) = parse("a; a; a = b;");

        let mut ids = vec![];
        for statement in &statements {
            let Stmt::Expression(data) = statement else { panic!() };
            match &data.expr {
                Expr::Variable(variable) => ids.push(variable.id),
                Expr::Assign(assign) => ids.push(assign.id),
                _ => panic!(),
            }
        }

        ids.sort_by_key(|id| id.0);
        ids.dedup();
        assert_eq!(ids.len(), 3);
    }
}
