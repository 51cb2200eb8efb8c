//! Evaluation scopes and circularity detection
//!
//! Every formula cell being evaluated has a scope on the stack. Reaching an
//! address that collides with an active scope means the evaluation has come
//! back around to itself.

use gridcalc_core::RangeAddress;
use std::cell::RefCell;

/// A frame recording the address currently being evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingScope {
    address: RangeAddress,
}

impl ParsingScope {
    pub fn new(address: RangeAddress) -> Self {
        Self { address }
    }

    pub fn address(&self) -> &RangeAddress {
        &self.address
    }

    /// Top-left (row, column) of the scope's address
    pub fn cell(&self) -> (u32, u32) {
        (self.address.from_row, self.address.from_col)
    }

    pub fn worksheet(&self) -> Option<&str> {
        self.address.worksheet.as_deref()
    }
}

/// Notified whenever a scope is popped
pub trait ParsingScopeListener {
    fn on_scope_disposed(&self, scope: &ParsingScope);
}

/// The stack of active scopes for one session
#[derive(Default)]
pub struct ParsingScopes {
    stack: RefCell<Vec<ParsingScope>>,
    listener: Option<Box<dyn ParsingScopeListener>>,
}

impl std::fmt::Debug for ParsingScopes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsingScopes")
            .field("stack", &self.stack.borrow())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl ParsingScopes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listener(listener: Box<dyn ParsingScopeListener>) -> Self {
        Self {
            stack: RefCell::new(Vec::new()),
            listener: Some(listener),
        }
    }

    /// Push a scope; it is popped when the returned guard drops
    #[must_use = "the scope is popped as soon as the guard is dropped"]
    pub fn new_scope(&self, address: RangeAddress) -> ScopeGuard<'_> {
        self.stack.borrow_mut().push(ParsingScope::new(address));
        ScopeGuard { scopes: self }
    }

    /// The innermost active scope
    pub fn current(&self) -> Option<ParsingScope> {
        self.stack.borrow().last().cloned()
    }

    pub fn depth(&self) -> usize {
        self.stack.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.borrow().is_empty()
    }

    /// Whether `address` equals or overlaps any active scope
    pub fn collides_with(&self, address: &RangeAddress) -> bool {
        self.stack
            .borrow()
            .iter()
            .any(|scope| scope.address.collides_with(address))
    }

    fn pop(&self) {
        let popped = self.stack.borrow_mut().pop();
        if let (Some(scope), Some(listener)) = (popped, &self.listener) {
            listener.on_scope_disposed(&scope);
        }
    }
}

/// Pops its scope on drop
pub struct ScopeGuard<'s> {
    scopes: &'s ParsingScopes,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.scopes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    struct Recorder(Rc<RefCell<Vec<String>>>);

    impl ParsingScopeListener for Recorder {
        fn on_scope_disposed(&self, scope: &ParsingScope) {
            self.0.borrow_mut().push(scope.address().to_string());
        }
    }

    fn cell(row: u32, col: u32) -> RangeAddress {
        RangeAddress::single(Some("Sheet1".into()), row, col)
    }

    #[test]
    fn test_guards_pop_in_reverse_order() {
        let disposed = Rc::new(RefCell::new(Vec::new()));
        let scopes = ParsingScopes::with_listener(Box::new(Recorder(disposed.clone())));
        {
            let _outer = scopes.new_scope(cell(1, 1));
            {
                let _inner = scopes.new_scope(cell(2, 1));
                assert_eq!(scopes.depth(), 2);
                assert_eq!(scopes.current().unwrap().cell(), (2, 1));
            }
            assert_eq!(scopes.current().unwrap().cell(), (1, 1));
        }
        assert!(scopes.is_empty());
        assert_eq!(*disposed.borrow(), vec!["Sheet1!A2", "Sheet1!A1"]);
    }

    #[test]
    fn test_collision_with_active_scope() {
        let scopes = ParsingScopes::new();
        let _guard = scopes.new_scope(cell(3, 2));
        assert!(scopes.collides_with(&RangeAddress::new(Some("Sheet1".into()), 1, 1, 5, 5)));
        assert!(!scopes.collides_with(&RangeAddress::new(Some("Sheet2".into()), 1, 1, 5, 5)));
        assert!(!scopes.collides_with(&cell(3, 3)));
    }
}
