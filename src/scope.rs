use std::{cell::RefCell, collections::HashMap};

use typed_arena::Arena;

use crate::ir::{FunctionRef, VarRef};

pub type ScopeArena<'a> = Arena<SymbolScope<'a>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VarLookupResult {
    Variable(VarRef),
    Function(FunctionRef),
}

/// Name table of one lexical scope. Scopes live in a [`ScopeArena`] and link to
/// their parent, so lookups fall back outward.
#[derive(Debug)]
pub struct SymbolScope<'a> {
    pub parent: Option<&'a SymbolScope<'a>>,
    variables: RefCell<HashMap<String, VarRef>>,
    functions: RefCell<HashMap<String, FunctionRef>>,
}
impl<'a> SymbolScope<'a> {
    pub fn new(parent: Option<&'a SymbolScope<'a>>) -> Self {
        Self {
            parent,
            variables: RefCell::new(HashMap::new()),
            functions: RefCell::new(HashMap::new()),
        }
    }

    #[inline]
    pub fn new_toplevel(arena: &'a ScopeArena<'a>) -> &'a Self {
        arena.alloc(Self::new(None))
    }

    #[inline]
    pub fn new_child(&'a self, arena: &'a ScopeArena<'a>) -> &'a Self {
        arena.alloc(Self::new(Some(self)))
    }

    /// Registers `name` in this scope. Returns `false` and keeps the existing entry if
    /// the name is already declared here.
    pub fn add_variable(&self, name: &str, var: VarRef) -> bool {
        if self.is_declared_locally(name) {
            return false;
        }

        self.variables.borrow_mut().insert(name.to_owned(), var);
        true
    }

    pub fn add_function(&self, name: &str, function: FunctionRef) -> bool {
        if self.is_declared_locally(name) {
            return false;
        }

        self.functions
            .borrow_mut()
            .insert(name.to_owned(), function);
        true
    }

    pub fn is_declared_locally(&self, name: &str) -> bool {
        self.variables.borrow().contains_key(name) || self.functions.borrow().contains_key(name)
    }

    pub fn lookup(&self, name: &str) -> Option<VarLookupResult> {
        if let Some(&v) = self.variables.borrow().get(name) {
            return Some(VarLookupResult::Variable(v));
        }
        if let Some(&f) = self.functions.borrow().get(name) {
            return Some(VarLookupResult::Function(f));
        }

        match self.parent {
            Some(p) => p.lookup(name),
            None => None,
        }
    }

    pub fn lookup_variable(&self, name: &str) -> Option<VarRef> {
        match self.lookup(name) {
            Some(VarLookupResult::Variable(v)) => Some(v),
            _ => None,
        }
    }

    pub fn lookup_function(&self, name: &str) -> Option<FunctionRef> {
        match self.lookup(name) {
            Some(VarLookupResult::Function(f)) => Some(f),
            _ => None,
        }
    }
}
