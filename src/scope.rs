//! The scope tree: insertion-ordered nodes of named entries, each entry a
//! nested scope or a parameter.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::ParamError;
use crate::variable::Variable;

/// Shared handle to a scope node, aliased by the tree and by the store's
/// current-scope pointer.
pub type SharedScope = Rc<RefCell<ScopeNode>>;

/// One slot in a scope: a nested scope or a registered parameter.
///
/// A given name keeps the same kind for the life of the node; the store
/// rejects uses that would flip it.
#[derive(Clone, Debug)]
pub enum ScopeEntry {
    Scope(SharedScope),
    Param(Variable),
}

impl ScopeEntry {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scope(_) => "scope",
            Self::Param(_) => "parameter",
        }
    }
}

/// A node of the scope tree. Entries keep insertion order, which is
/// semantically significant: enumeration and serialization walk entries in
/// the order they were first inserted.
#[derive(Default, Debug)]
pub struct ScopeNode {
    entries: Vec<(String, ScopeEntry)>,
}

impl ScopeNode {
    pub fn get(&self, name: &str) -> Option<&ScopeEntry> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, entry)| entry)
    }

    /// Returns the subscope under `name`, creating an empty one when absent.
    pub fn child_scope(&mut self, name: &str) -> Result<SharedScope, ParamError> {
        if let Some(entry) = self.get(name) {
            return match entry {
                ScopeEntry::Scope(child) => Ok(Rc::clone(child)),
                ScopeEntry::Param(_) => {
                    Err(ParamError::type_mismatch(name, "scope", entry.kind()))
                }
            };
        }
        let child: SharedScope = Rc::new(RefCell::new(ScopeNode::default()));
        self.entries
            .push((name.to_string(), ScopeEntry::Scope(Rc::clone(&child))));
        Ok(child)
    }

    /// Binds `name` to `variable`, overwriting a previously registered
    /// parameter. Rebinding a name that holds a subscope is rejected.
    pub fn insert_param(&mut self, name: &str, variable: Variable) -> Result<(), ParamError> {
        for (key, entry) in self.entries.iter_mut() {
            if key == name {
                return match entry {
                    ScopeEntry::Param(_) => {
                        *entry = ScopeEntry::Param(variable);
                        Ok(())
                    }
                    ScopeEntry::Scope(_) => {
                        Err(ParamError::type_mismatch(name, "parameter", entry.kind()))
                    }
                };
            }
        }
        self.entries
            .push((name.to_string(), ScopeEntry::Param(variable)));
        Ok(())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(String, ScopeEntry)> {
        self.entries.iter()
    }

    /// Drops every entry of this node. Subtrees hanging off dropped scope
    /// entries become unreachable.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
