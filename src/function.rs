use std::cell::RefCell;
use std::fmt::{Debug, Display};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::environment::Environment;
use crate::error::Signal;
use crate::expr::FunctionExprData;
use crate::interpreter::Interpreter;
use crate::literal::Literal;
use crate::object::{Callable, Object};
use crate::token::Token;

/// A user-defined function: a shared handle to its declaration plus the
/// environment it closed over. Methods are functions whose closure has been
/// rebound to a receiver; initializers additionally always yield `this`.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: Option<String>,
    declaration: Rc<FunctionExprData>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
}

impl Function {
    pub fn new(
        name: Option<String>,
        declaration: Rc<FunctionExprData>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Function {
        Function { name, declaration, closure, is_initializer }
    }

    /// Returns a copy of this function whose closure is extended with one
    /// environment binding `this` to the receiver.
    pub fn bind(&self, instance: Object) -> Function {
        let mut environment = Environment::new(Some(Rc::clone(&self.closure)));
        environment.define("this", instance);

        Function {
            name: self.name.clone(),
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(environment)),
            is_initializer: self.is_initializer,
        }
    }
}

impl Callable for Function {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Object>) -> Result<Object, Signal> {
        let mut environment = Environment::new(Some(Rc::clone(&self.closure)));

        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment.define(&param.lexeme, argument);
        }

        match interpreter.execute_block(&self.declaration.body, Rc::new(RefCell::new(environment))) {
            Ok(()) => (),
            Err(Signal::Return(value)) => {
                if !self.is_initializer {
                    return Ok(value);
                }
            }
            Err(signal) => return Err(signal),
        }

        if self.is_initializer {
            // The closure of a bound initializer is the environment that
            // defines `this`.
            return Ok(self.closure.borrow().get_at(0, &Token::from("this"))?);
        }

        Ok(Object::from(Literal::Nil))
    }

    fn arity(&self) -> usize {
        self.declaration.params.len()
    }
}

/// Two function values are the same function only if they share a
/// declaration and a closure.
impl PartialEq for Function {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.declaration, &other.declaration)
            && Rc::ptr_eq(&self.closure, &other.closure)
    }
}

impl Display for Function {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.name {
            Some(name) => write!(f, "<fn {name}>"),
            None => write!(f, "<fn>"),
        }
    }
}

/// A function implemented by the host.
#[derive(Clone)]
pub struct NativeFunction {
    pub name: &'static str,
    arity: usize,
    function: fn(&mut Interpreter, Vec<Object>) -> Result<Object, Signal>,
}

impl NativeFunction {
    /// The functions bound in `globals` when an interpreter is created.
    pub fn get_globals() -> Vec<NativeFunction> {
        vec![
            NativeFunction {
                name: "clock",
                arity: 0,
                function: |_, _| {
                    let now = SystemTime::now()
                        .duration_since(UNIX_EPOCH)
                        .expect("system clock to be past the unix epoch");
                    Ok(Object::from(now.as_secs_f64()))
                },
            },
        ]
    }
}

impl Callable for NativeFunction {
    fn call(&self, interpreter: &mut Interpreter, arguments: Vec<Object>) -> Result<Object, Signal> {
        (self.function)(interpreter, arguments)
    }

    fn arity(&self) -> usize {
        self.arity
    }
}

impl PartialEq for NativeFunction {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.function == other.function
    }
}

impl Display for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}

impl Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "<native fn {}>", self.name)
    }
}
