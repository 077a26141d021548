use crate::expr::Val;
use rustc_hash::FxHashMap;
use std::{cell::RefCell, rc::Rc};
use thiserror::Error;

pub type ScopeLink = Rc<RefCell<Scope>>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unbound name '{0}'.")]
pub struct UnboundName(pub Rc<str>);

/// One frame of the scope chain.
///
/// A frame owns its bindings and holds a strong link to its parent, so a
/// closure that keeps a frame alive keeps every enclosing frame alive too.
#[derive(Debug, Default)]
pub struct Scope {
    stack: FxHashMap<Rc<str>, Val>,
    parent: Option<ScopeLink>,
}

impl Scope {
    pub fn new_child(this: ScopeLink) -> Scope {
        Scope {
            stack: Default::default(),
            parent: Some(this),
        }
    }

    pub fn new_link(scope: Scope) -> ScopeLink {
        Rc::new(RefCell::new(scope))
    }

    pub fn try_get_here(&self, id: &str) -> Option<Val> {
        self.stack.get(id).cloned()
    }

    pub fn get(&self, id: &str) -> Result<Val, UnboundName> {
        if let Some(val) = self.stack.get(id) {
            return Ok(val.clone());
        }

        // self is of type &Scope, the rest of the elements
        // of the chain are of type ScopeLink.
        let mut cur = self.parent.clone();
        while let Some(link) = cur {
            let borrow = (*link).borrow();
            if let Some(val) = borrow.stack.get(id) {
                return Ok(val.clone());
            }
            cur = borrow.parent.clone();
        }

        Err(UnboundName(id.into()))
    }

    /// Binds `id` in this frame, replacing a binding of the same name here.
    pub fn define(&mut self, id: Rc<str>, val: Val) {
        self.stack.insert(id, val);
    }

    /// Overwrites the nearest existing binding of `id`. Never creates one.
    pub fn assign(&mut self, id: &str, val: Val) -> Result<(), UnboundName> {
        if let Some(slot) = self.stack.get_mut(id) {
            *slot = val;
            return Ok(());
        }

        let mut cur = self.parent.clone();
        while let Some(link) = cur {
            let mut borrow = (*link).borrow_mut();
            if let Some(slot) = borrow.stack.get_mut(id) {
                *slot = val;
                return Ok(());
            }
            cur = borrow.parent.clone();
        }

        Err(UnboundName(id.into()))
    }
}
