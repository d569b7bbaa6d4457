use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::RuntimeError;
use crate::object::Object;
use crate::token::Token;

/// A single scope in the chain of environments.
///
/// Environments form a singly-linked list through `enclosing`; the root of
/// the chain is the interpreter's globals. Closures keep their defining
/// environment alive by holding a shared reference to it.
#[derive(Debug, Clone)]
pub struct Environment {
    pub enclosing: Option<Rc<RefCell<Environment>>>,
    variables: HashMap<String, Object>,
}

impl Environment {
    pub fn new(enclosing: Option<Rc<RefCell<Environment>>>) -> Self {
        Environment {
            enclosing,
            variables: HashMap::new(),
        }
    }

    /// Binds a name in this scope, shadowing any enclosing binding.
    pub fn define(&mut self, name: &str, value: Object) {
        self.variables.insert(name.to_string(), value);
    }

    /// Returns the environment exactly `distance` hops up the chain.
    /// The resolver guarantees the hop count, so a missing parent is a bug.
    fn ancestor(&self, distance: usize) -> Rc<RefCell<Environment>> {
        let mut environment = self.enclosing.clone()
            .expect("enclosing environment to exist at depth 1");

        for depth in 2..=distance {
            let parent = environment.borrow().enclosing.clone()
                .unwrap_or_else(|| panic!("enclosing environment to exist at depth {depth}"));
            environment = parent;
        }

        environment
    }

    /// Rebinds an existing name, walking the chain outwards until found.
    pub fn assign(&mut self, name: &Token, value: Object) -> Result<(), RuntimeError> {
        if self.variables.contains_key(&name.lexeme) {
            self.variables.insert(name.lexeme.clone(), value);
            return Ok(());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow_mut().assign(name, value);
        }

        Err(RuntimeError {
            token: name.clone(),
            message: format!("Undefined variable '{}'", name.lexeme),
        })
    }

    /// Rebinds a name in the scope exactly `distance` hops up.
    pub fn assign_at(&mut self, distance: usize, name: &Token, value: Object) {
        if distance > 0 {
            self.ancestor(distance).borrow_mut().variables.insert(name.lexeme.clone(), value);
        } else {
            self.variables.insert(name.lexeme.clone(), value);
        }
    }

    /// Reads a name, walking the chain outwards until found.
    pub fn get(&self, name: &Token) -> Result<Object, RuntimeError> {
        if let Some(variable) = self.variables.get(&name.lexeme) {
            return Ok(variable.clone());
        }

        if let Some(enclosing) = &self.enclosing {
            return enclosing.borrow().get(name);
        }

        Err(RuntimeError {
            token: name.clone(),
            message: format!("Undefined variable '{}'", name.lexeme),
        })
    }

    /// Reads a name from the scope exactly `distance` hops up.
    pub fn get_at(&self, distance: usize, name: &Token) -> Result<Object, RuntimeError> {
        let lookup = |variables: &HashMap<String, Object>| {
            variables.get(&name.lexeme).cloned().ok_or_else(|| RuntimeError {
                token: name.clone(),
                message: format!("Undefined variable '{}'", name.lexeme),
            })
        };

        if distance > 0 {
            lookup(&self.ancestor(distance).borrow().variables)
        } else {
            lookup(&self.variables)
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(None)
    }
}
