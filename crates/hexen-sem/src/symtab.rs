//! The symbol table (spec §4.1): a scope stack of ribs, each holding its
//! own bindings and, for loop ribs, the label that reaches it.

use std::collections::HashMap;

use hexen_util::{DefId, DefIdGenerator, Idx, IndexVec, Symbol};

use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RibId(u32);

impl Idx for RibId {
    fn from_usize(idx: usize) -> Self {
        RibId(idx as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    Variable,
    Parameter,
    /// The `x` in `for x in iter { ... }` — never declarable `mut`, so an
    /// assignment to it is reported differently from a plain `val`.
    LoopVariable,
}

#[derive(Debug, Clone)]
pub struct BindingInfo {
    pub name: Symbol,
    pub ty: Type,
    pub mutable: bool,
    pub kind: BindingKind,
    /// Set once an assignment targets this binding. Only meaningful for
    /// parameters (spec §4.7's mut-parameter return obligation).
    pub modified: bool,
}

#[derive(Debug, Clone, Copy)]
pub enum RibKind {
    Function,
    Block,
    Loop(Option<Symbol>),
}

#[derive(Debug)]
struct Rib {
    bindings: HashMap<Symbol, DefId>,
    parent: Option<RibId>,
    kind: RibKind,
}

#[derive(Debug)]
pub enum DeclareError {
    /// A binding with this name already exists in the *same* scope.
    Duplicate,
}

pub enum LabelError {
    /// A loop with this label is already open (an enclosing loop rib
    /// currently on the stack carries the same label).
    Duplicate,
}

/// Scope stack for a single function body. Each function gets a fresh
/// table — there is no cross-function scope, so this also owns a local
/// `DefId` generator rather than sharing the driver's.
pub struct ScopeTree {
    ribs: IndexVec<RibId, Rib>,
    current: RibId,
    bindings: IndexVec<DefId, BindingInfo>,
    def_ids: DefIdGenerator,
}

impl ScopeTree {
    pub fn new() -> Self {
        let mut ribs = IndexVec::new();
        let root = ribs.push(Rib {
            bindings: HashMap::new(),
            parent: None,
            kind: RibKind::Block,
        });
        Self {
            ribs,
            current: root,
            bindings: IndexVec::new(),
            def_ids: DefIdGenerator::new(),
        }
    }

    pub fn enter_scope(&mut self, kind: RibKind) -> RibId {
        let rib = self.ribs.push(Rib {
            bindings: HashMap::new(),
            parent: Some(self.current),
            kind,
        });
        self.current = rib;
        rib
    }

    pub fn exit_scope(&mut self) {
        if let Some(parent) = self.ribs[self.current].parent {
            self.current = parent;
        }
    }

    /// Depth of the scope stack, root counted as 1. Used to check the
    /// "stack depth returns to its pre-call value" invariant (spec §3, §8).
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut rib = self.current;
        while let Some(parent) = self.ribs[rib].parent {
            depth += 1;
            rib = parent;
        }
        depth
    }

    fn declare(&mut self, name: Symbol, info: BindingInfo) -> Result<DefId, DeclareError> {
        if self.ribs[self.current].bindings.contains_key(&name) {
            return Err(DeclareError::Duplicate);
        }
        let def_id = self.def_ids.next();
        self.bindings.push(info);
        debug_assert_eq!(self.bindings.len() - 1, def_id.index());
        self.ribs[self.current].bindings.insert(name, def_id);
        Ok(def_id)
    }

    pub fn declare_variable(
        &mut self,
        name: Symbol,
        ty: Type,
        mutable: bool,
    ) -> Result<DefId, DeclareError> {
        self.declare(
            name,
            BindingInfo { name, ty, mutable, kind: BindingKind::Variable, modified: false },
        )
    }

    pub fn declare_parameter(
        &mut self,
        name: Symbol,
        ty: Type,
        mutable: bool,
    ) -> Result<DefId, DeclareError> {
        self.declare(
            name,
            BindingInfo { name, ty, mutable, kind: BindingKind::Parameter, modified: false },
        )
    }

    /// Declares a `for-in` loop variable. Always immutable — spec §4.5
    /// never allows `mut` on a loop variable, so it is tracked under its own
    /// `BindingKind` rather than as an ordinary `val`.
    pub fn declare_loop_variable(&mut self, name: Symbol, ty: Type) -> Result<DefId, DeclareError> {
        self.declare(
            name,
            BindingInfo { name, ty, mutable: false, kind: BindingKind::LoopVariable, modified: false },
        )
    }

    /// Innermost-first lookup (spec §4.1).
    pub fn resolve(&self, name: Symbol) -> Option<DefId> {
        let mut rib = self.current;
        loop {
            if let Some(&def_id) = self.ribs[rib].bindings.get(&name) {
                return Some(def_id);
            }
            rib = self.ribs[rib].parent?;
        }
    }

    pub fn binding(&self, def_id: DefId) -> &BindingInfo {
        &self.bindings[def_id]
    }

    pub fn binding_mut(&mut self, def_id: DefId) -> &mut BindingInfo {
        &mut self.bindings[def_id]
    }

    pub fn is_parameter(&self, def_id: DefId) -> bool {
        matches!(self.binding(def_id).kind, BindingKind::Parameter)
    }

    pub fn set_parameter_modified(&mut self, def_id: DefId) {
        self.binding_mut(def_id).modified = true;
    }

    /// Every parameter in this function's own frame whose `modified` bit is
    /// set. Used for the mut-parameter return obligation at body exit.
    pub fn modified_parameters(&self) -> Vec<Symbol> {
        self.bindings
            .iter_enumerated()
            .filter(|(_, b)| b.kind == BindingKind::Parameter && b.modified)
            .map(|(_, b)| b.name)
            .collect()
    }

    /// Reject a label already open on an enclosing loop rib; otherwise
    /// accept it (label uniqueness is scoped to *currently open* loops —
    /// once a loop's scope exits, its label may be reused by a sibling).
    pub fn check_label(&self, label: Symbol) -> Result<(), LabelError> {
        let mut rib = self.current;
        loop {
            if let RibKind::Loop(Some(existing)) = self.ribs[rib].kind {
                if existing == label {
                    return Err(LabelError::Duplicate);
                }
            }
            match self.ribs[rib].parent {
                Some(parent) => rib = parent,
                None => return Ok(()),
            }
        }
    }

    /// The nearest enclosing loop rib, for unlabeled `break`/`continue`.
    pub fn innermost_loop(&self) -> Option<RibId> {
        self.find_loop(|_| true)
    }

    /// The nearest enclosing loop rib carrying `label`, for labeled
    /// `break`/`continue`.
    pub fn loop_with_label(&self, label: Symbol) -> Option<RibId> {
        self.find_loop(|l| l == Some(label))
    }

    fn find_loop(&self, matches_label: impl Fn(Option<Symbol>) -> bool) -> Option<RibId> {
        let mut rib = self.current;
        loop {
            if let RibKind::Loop(label) = self.ribs[rib].kind {
                if matches_label(label) {
                    return Some(rib);
                }
            }
            rib = self.ribs[rib].parent?;
        }
    }

    /// Whether any loop is currently open at all — used to distinguish
    /// "no loop in scope" from "label not found" for break/continue errors.
    pub fn any_loop_open(&self) -> bool {
        self.innermost_loop().is_some()
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    #[test]
    fn shadowing_across_frames_is_allowed() {
        let mut scope = ScopeTree::new();
        scope.declare_variable(sym("shadow_case_a"), Type::I32, false).unwrap();
        scope.enter_scope(RibKind::Block);
        // A nested scope may redeclare the same name.
        assert!(scope.declare_variable(sym("shadow_case_a"), Type::Bool, false).is_ok());
        let inner = scope.resolve(sym("shadow_case_a")).unwrap();
        assert_eq!(scope.binding(inner).ty, Type::Bool);
        scope.exit_scope();
        let outer = scope.resolve(sym("shadow_case_a")).unwrap();
        assert_eq!(scope.binding(outer).ty, Type::I32);
    }

    #[test]
    fn duplicate_declaration_in_same_scope_is_rejected() {
        let mut scope = ScopeTree::new();
        scope.declare_variable(sym("dup_case"), Type::I32, false).unwrap();
        assert!(matches!(
            scope.declare_variable(sym("dup_case"), Type::I32, false),
            Err(DeclareError::Duplicate)
        ));
    }

    #[test]
    fn resolve_fails_after_scope_exits() {
        let mut scope = ScopeTree::new();
        scope.enter_scope(RibKind::Block);
        scope.declare_variable(sym("gone_case"), Type::I32, false).unwrap();
        scope.exit_scope();
        assert!(scope.resolve(sym("gone_case")).is_none());
    }

    #[test]
    fn mut_parameter_tracks_modification_only_after_assignment() {
        let mut scope = ScopeTree::new();
        let p = scope.declare_parameter(sym("mut_case"), Type::I32, true).unwrap();
        assert!(scope.modified_parameters().is_empty());
        scope.set_parameter_modified(p);
        assert_eq!(scope.modified_parameters(), vec![sym("mut_case")]);
    }

    #[test]
    fn loop_variable_is_declared_immutable_regardless_of_caller_input() {
        let mut scope = ScopeTree::new();
        let id = scope.declare_loop_variable(sym("i"), Type::I32).unwrap();
        assert!(!scope.binding(id).mutable);
        assert_eq!(scope.binding(id).kind, BindingKind::LoopVariable);
    }

    #[test]
    fn duplicate_label_is_rejected_only_while_the_loop_is_open() {
        let mut scope = ScopeTree::new();
        let label = sym("outer_loop_case");
        scope.enter_scope(RibKind::Loop(Some(label)));
        assert!(matches!(scope.check_label(label), Err(LabelError::Duplicate)));
        scope.exit_scope();
        // The label is free again once its loop's scope has exited.
        assert!(scope.check_label(label).is_ok());
    }

    #[test]
    fn break_resolves_labeled_loop_through_an_intervening_nested_loop() {
        let mut scope = ScopeTree::new();
        let outer = sym("outer_case");
        scope.enter_scope(RibKind::Loop(Some(outer)));
        scope.enter_scope(RibKind::Loop(None));
        assert!(scope.loop_with_label(outer).is_some());
        assert!(scope.innermost_loop().is_some());
        assert!(scope.loop_with_label(sym("nonexistent_case")).is_none());
    }

    /// Entering and exiting any number of nested scopes always returns the
    /// stack to its starting depth (spec §8's scope-depth invariant).
    #[quickcheck_macros::quickcheck]
    fn scope_depth_returns_to_one_after_matching_enter_exit(depth: u8) -> bool {
        let depth = (depth % 64) as usize;
        let mut scope = ScopeTree::new();
        for _ in 0..depth {
            scope.enter_scope(RibKind::Block);
        }
        for _ in 0..depth {
            scope.exit_scope();
        }
        scope.depth() == 1
    }
}
