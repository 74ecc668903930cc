//! Reach-set liveness
//!
//! Boundaries are numbered 1, 2, ... in pre-order; state 0 is the function
//! entry. Walking the body in program order, every statement is tagged with
//! the set of states that can be current when it executes. A boundary ends the
//! states that reach it and opens a new one, a `return` (or `break`,
//! `continue`) ends every state, and the two arms of an `if` join by union.
//!
//! A local declaration escapes when some use of it is reached by a different
//! set of states than its declaration. Its value then has to survive a
//! suspension and it moves to the persistent record.

use crate::analysis::boundary::Boundaries;
use crate::compiler::context::CompilerCtx;
use crate::parser::cst::UnOp;
use crate::parser::lexer::Token;
use crate::syntax::tree::{NodeId, NodeKind, Tree};
use crate::syntax::visit::{visit_node, walk_children, Visitor};
use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeSet;
use tracing::{debug, trace};

pub type StateId = u32;

/// States that can be current at a program point
pub type ReachSet = BTreeSet<StateId>;

/// Where a local's value lives in the rewritten function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageClass {
    /// Never live across a suspension, stays an ordinary local
    Stack,
    /// Moves to the persistent record
    Persistent,
    /// `static` locals already outlive every invocation
    Static,
    /// Leading declaration whose initializer gives the same value on every entry,
    /// re-run before dispatch
    Prologue,
}

#[derive(Debug, Clone, Default)]
pub struct Liveness {
    /// Reach set on entry to every visited statement
    reach: FxHashMap<NodeId, ReachSet>,
    /// State opened by each boundary statement
    opens: FxHashMap<NodeId, StateId>,
    storage: FxHashMap<NodeId, StorageClass>,
    /// Persistent declarations in declaration order
    escaping: Vec<NodeId>,
    /// Leading declaration statements kept ahead of the dispatch
    prologue: Vec<NodeId>,
    /// States that can run off the end of the body
    exit: ReachSet,
    state_count: u32,
}

impl Liveness {
    pub fn reach_of(&self, stmt: NodeId) -> Option<&ReachSet> {
        self.reach.get(&stmt)
    }

    /// The state a statement belongs to: the latest one that reaches it
    pub fn home_state(&self, stmt: NodeId) -> Option<StateId> {
        self.reach.get(&stmt)?.last().copied()
    }

    pub fn opened_by(&self, stmt: NodeId) -> Option<StateId> {
        self.opens.get(&stmt).copied()
    }

    pub fn storage(&self, decl: NodeId) -> Option<StorageClass> {
        self.storage.get(&decl).copied()
    }

    pub fn escapes(&self, decl: NodeId) -> bool {
        self.storage(decl) == Some(StorageClass::Persistent)
    }

    pub fn escaping(&self) -> &[NodeId] {
        &self.escaping
    }

    pub fn prologue(&self) -> &[NodeId] {
        &self.prologue
    }

    pub fn exit(&self) -> &ReachSet {
        &self.exit
    }

    /// Number of states including the entry state
    pub fn state_count(&self) -> u32 {
        self.state_count
    }
}

struct Walker<'r, 'b, 'a> {
    ctx: &'r mut CompilerCtx<'a>,
    boundaries: &'b Boundaries,
    current: ReachSet,
    next_state: StateId,
    if_depth: usize,
    /// Innermost-last stack of enclosing loops and switches
    enclosing: Vec<&'static str>,
    reach: FxHashMap<NodeId, ReachSet>,
    opens: FxHashMap<NodeId, StateId>,
    decl_reach: FxHashMap<NodeId, ReachSet>,
    declared: Vec<NodeId>,
    static_decls: FxHashSet<NodeId>,
    crossing: FxHashSet<NodeId>,
    written: FxHashSet<NodeId>,
    address_taken: FxHashSet<NodeId>,
    /// Reach sets under which each parameter is assigned
    param_writes: FxHashMap<NodeId, Vec<ReachSet>>,
    /// Parameters read under a different reach than an earlier assignment, with the read
    stale_params: Vec<(NodeId, NodeId)>,
    jumps: Vec<NodeId>,
    unreachable_reported: bool,
}

/// Compute reach sets and storage classes for the function's locals
pub fn analyze(ctx: &mut CompilerCtx, tree: &Tree, boundaries: &Boundaries) -> Liveness {
    let mut walker = Walker {
        ctx,
        boundaries,
        current: ReachSet::from([0]),
        next_state: 1,
        if_depth: 0,
        enclosing: Vec::new(),
        reach: FxHashMap::default(),
        opens: FxHashMap::default(),
        decl_reach: FxHashMap::default(),
        declared: Vec::new(),
        static_decls: FxHashSet::default(),
        crossing: FxHashSet::default(),
        written: FxHashSet::default(),
        address_taken: FxHashSet::default(),
        param_writes: FxHashMap::default(),
        stale_params: Vec::new(),
        jumps: Vec::new(),
        unreachable_reported: false,
    };
    visit_node(&mut walker, tree, tree.root());

    if !boundaries.is_empty() {
        let mut reported = FxHashSet::default();
        for &(param, read) in &walker.stale_params {
            if !reported.insert(param) {
                continue;
            }
            walker.ctx.error(
                tree.tokens(read),
                format!(
                    "unsupported control flow across suspension: parameter `{}` is assigned before a blocking call and read after it",
                    tree.decl_name(param).unwrap_or("")
                ),
            );
        }
        for &jump in &walker.jumps {
            walker.ctx.error(
                tree.tokens(jump),
                format!(
                    "unsupported control flow across suspension: {} in a function with blocking calls",
                    tree.kind(jump).describe()
                ),
            );
        }
    }

    let prologue = walker.prologue(tree);
    let prologue_decls: FxHashSet<NodeId> = prologue
        .iter()
        .flat_map(|&stmt| tree.children(stmt))
        .collect();

    let mut storage = FxHashMap::default();
    let mut escaping = Vec::new();
    let declared = std::mem::take(&mut walker.declared);
    for decl in declared {
        let class = if walker.static_decls.contains(&decl) {
            StorageClass::Static
        } else if prologue_decls.contains(&decl) {
            StorageClass::Prologue
        } else if walker.crossing.contains(&decl) {
            StorageClass::Persistent
        } else {
            StorageClass::Stack
        };
        if class == StorageClass::Persistent {
            walker.check_persistent(tree, decl);
            escaping.push(decl);
        }
        trace!(decl = tree.decl_name(decl).unwrap_or(""), ?class, "storage class");
        storage.insert(decl, class);
    }

    debug!(
        function = tree.function_name(),
        "{} state(s), {} escaping variable(s), {} prologue declaration(s)",
        walker.next_state,
        escaping.len(),
        prologue.len()
    );

    Liveness {
        reach: walker.reach,
        opens: walker.opens,
        storage,
        escaping,
        prologue,
        exit: walker.current,
        state_count: walker.next_state,
    }
}

impl Walker<'_, '_, '_> {
    fn enter(&mut self, tree: &Tree, stmt: NodeId) {
        if self.current.is_empty() && !self.unreachable_reported {
            if !matches!(tree.kind(stmt), NodeKind::Empty | NodeKind::Label { .. }) {
                self.ctx.warning(tree.tokens(stmt), "unreachable statement");
                self.unreachable_reported = true;
            }
        } else if !self.current.is_empty() {
            self.unreachable_reported = false;
        }
        self.reach.insert(stmt, self.current.clone());
    }

    fn reference(&mut self, decl: NodeId, read: NodeId) {
        if let Some(declared) = self.decl_reach.get(&decl) {
            if *declared != self.current {
                self.crossing.insert(decl);
            }
            return;
        }
        // Parameters are passed in afresh on every entry, so an assignment is lost on resume
        if let Some(writes) = self.param_writes.get(&decl) {
            if writes.iter().any(|reach| *reach != self.current) {
                self.stale_params.push((decl, read));
            }
        }
    }

    /// Leading declarations whose initializers can be re-evaluated on every entry
    fn prologue(&self, tree: &Tree) -> Vec<NodeId> {
        let Some(body) = tree.body() else {
            return Vec::new();
        };
        let NodeKind::Block { statements } = tree.kind(body) else {
            return Vec::new();
        };

        let mut replayable = FxHashSet::default();
        let mut prologue = Vec::new();
        for &stmt in statements {
            let NodeKind::DeclStmt {
                is_static: false,
                decls,
                ..
            } = tree.kind(stmt)
            else {
                break;
            };
            if !decls.iter().all(|&decl| self.is_replayable(tree, decl, &replayable)) {
                break;
            }
            replayable.extend(decls.iter().copied());
            prologue.push(stmt);
        }
        prologue
    }

    fn is_replayable(&self, tree: &Tree, decl: NodeId, earlier: &FxHashSet<NodeId>) -> bool {
        let NodeKind::VarDecl { init: Some(init), .. } = tree.kind(decl) else {
            return false;
        };
        if self.written.contains(&decl) || self.address_taken.contains(&decl) {
            return false;
        }
        is_entry_invariant(tree, *init, earlier)
    }

    fn check_persistent(&mut self, tree: &Tree, decl: NodeId) {
        let name = tree.decl_name(decl).unwrap_or("");
        if let NodeKind::VarDecl {
            init: Some(init),
            declarator,
            ..
        } = tree.kind(decl)
        {
            let is_array = self.ctx.program.tokens[declarator.start..=declarator.stop]
                .iter()
                .any(|token| matches!(token, Token::LBracket(_)));
            if matches!(tree.kind(*init), NodeKind::InitList) {
                self.ctx.error(
                    tree.tokens(decl),
                    format!("variable `{}` lives across a blocking call but has a brace initializer", name),
                );
            } else if is_array {
                self.ctx.error(
                    tree.tokens(decl),
                    format!("array `{}` lives across a blocking call but has an initializer", name),
                );
            }
        }

        let shared = tree.ids().any(|id| {
            matches!(tree.kind(id), NodeKind::DeclStmt { decls, .. } if decls.len() > 1 && decls.contains(&decl))
        });
        if shared {
            self.ctx.error(
                tree.tokens(decl),
                format!(
                    "variable `{}` lives across a blocking call and must be declared on its own",
                    name
                ),
            );
        }
    }
}

impl Visitor for Walker<'_, '_, '_> {
    fn default_visit(&mut self, tree: &Tree, id: NodeId) {
        self.ctx.error(
            tree.tokens(id),
            format!("unsupported statement: {}", tree.kind(id).describe()),
        );
    }

    fn visit_function(&mut self, tree: &Tree, _id: NodeId) {
        if let Some(body) = tree.body() {
            visit_node(self, tree, body);
        }
    }

    fn visit_block(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        walk_children(self, tree, id);
    }

    fn visit_decl_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        if let NodeKind::DeclStmt {
            is_static: true,
            decls,
            ..
        } = tree.kind(id)
        {
            self.static_decls.extend(decls.iter().copied());
        }
        walk_children(self, tree, id);
    }

    fn visit_var_decl(&mut self, tree: &Tree, id: NodeId) {
        walk_children(self, tree, id);
        self.decl_reach.insert(id, self.current.clone());
        self.declared.push(id);
    }

    fn visit_expr_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        let Some(site) = self.boundaries.site_for(id) else {
            walk_children(self, tree, id);
            return;
        };

        if let Some(construct) = self.enclosing.last() {
            self.ctx.error(
                tree.tokens(id),
                format!(
                    "unsupported control flow across suspension: blocking call inside a {}",
                    construct
                ),
            );
        } else if self.if_depth > 1 {
            self.ctx.error(
                tree.tokens(id),
                "unsupported control flow across suspension: blocking call inside nested conditionals",
            );
        }

        // The call itself runs in the states that reach it
        for &arg in &site.args {
            visit_node(self, tree, arg);
        }

        let state = self.next_state;
        self.next_state += 1;
        self.opens.insert(id, state);
        self.current = ReachSet::from([state]);

        // The completion check runs again in the new state
        for arg in site.pending_args() {
            visit_node(self, tree, arg);
        }
    }

    fn visit_empty(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
    }

    fn visit_return(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        walk_children(self, tree, id);
        self.current.clear();
    }

    fn visit_if(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        let NodeKind::If {
            condition,
            then_branch,
            else_branch,
        } = tree.kind(id)
        else {
            return;
        };

        visit_node(self, tree, *condition);
        let entry = self.current.clone();

        self.if_depth += 1;
        visit_node(self, tree, *then_branch);
        let then_exit = std::mem::replace(&mut self.current, entry);
        if let Some(else_branch) = else_branch {
            visit_node(self, tree, *else_branch);
        }
        self.if_depth -= 1;

        self.current.extend(then_exit);
    }

    fn visit_loop(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        // A loop may run zero times, so its exit reach is its entry reach
        let entry = self.current.clone();
        self.enclosing.push("loop");
        walk_children(self, tree, id);
        self.enclosing.pop();
        self.current = entry;
    }

    fn visit_switch(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        let NodeKind::Switch { expr, cases } = tree.kind(id) else {
            return;
        };
        visit_node(self, tree, *expr);

        let entry = self.current.clone();
        self.enclosing.push("switch");
        for &case in cases {
            self.current = entry.clone();
            visit_node(self, tree, case);
        }
        self.enclosing.pop();
        self.current = entry;
    }

    fn visit_case(&mut self, tree: &Tree, id: NodeId) {
        walk_children(self, tree, id);
    }

    fn visit_jump(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        if matches!(tree.kind(id), NodeKind::Goto { .. }) {
            self.jumps.push(id);
        }
        self.current.clear();
    }

    fn visit_label(&mut self, tree: &Tree, id: NodeId) {
        self.enter(tree, id);
        self.jumps.push(id);
        // Any state seen so far may jump here
        self.current.extend(0..self.next_state);
    }

    fn visit_expr(&mut self, tree: &Tree, id: NodeId) {
        match tree.kind(id) {
            NodeKind::Var {
                decl: Some(decl), ..
            } => self.reference(*decl, id),
            NodeKind::Assign { lhs, .. } => self.note_write(tree, *lhs),
            NodeKind::Unary { op, operand } if op.is_mutation() => self.note_write(tree, *operand),
            NodeKind::Unary {
                op: UnOp::AddrOf,
                operand,
            } => {
                if let Some(decl) = self.resolved(tree, *operand) {
                    self.address_taken.insert(decl);
                }
            }
            _ => {}
        }
        walk_children(self, tree, id);
    }
}

/// Whether `expr` yields the same value on every entry into the function
///
/// Only literals, parameters and earlier prologue locals qualify, combined by
/// arithmetic, casts and `sizeof`. Globals and reads through pointers can change
/// between invocations.
fn is_entry_invariant(tree: &Tree, expr: NodeId, earlier: &FxHashSet<NodeId>) -> bool {
    match tree.kind(expr) {
        NodeKind::Literal { .. } | NodeKind::SizeofType { .. } | NodeKind::SizeofExpr { .. } => true,
        NodeKind::Var {
            decl: Some(decl), ..
        } => earlier.contains(decl) || matches!(tree.kind(*decl), NodeKind::Param { .. }),
        NodeKind::Cast { expr, .. } => is_entry_invariant(tree, *expr, earlier),
        NodeKind::Unary { op, operand } => {
            matches!(op, UnOp::Neg | UnOp::Plus | UnOp::Not | UnOp::BitNot)
                && is_entry_invariant(tree, *operand, earlier)
        }
        NodeKind::Binary { left, right, .. } => {
            is_entry_invariant(tree, *left, earlier) && is_entry_invariant(tree, *right, earlier)
        }
        NodeKind::Ternary {
            condition,
            true_expr,
            false_expr,
        } => [condition, true_expr, false_expr]
            .into_iter()
            .all(|&part| is_entry_invariant(tree, part, earlier)),
        _ => false,
    }
}

impl Walker<'_, '_, '_> {
    fn note_write(&mut self, tree: &Tree, lvalue: NodeId) {
        let Some(decl) = self.resolved(tree, lvalue) else {
            return;
        };
        self.written.insert(decl);
        if matches!(tree.kind(decl), NodeKind::Param { .. }) {
            let reach = self.current.clone();
            let writes = self.param_writes.entry(decl).or_default();
            if !writes.contains(&reach) {
                writes.push(reach);
            }
        }
    }

    fn resolved(&self, tree: &Tree, lvalue: NodeId) -> Option<NodeId> {
        match tree.kind(tree.lvalue_root(lvalue)?) {
            NodeKind::Var { decl, .. } => *decl,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::boundary::find_boundaries;
    use crate::catalog::Catalog;
    use crate::parser::parse;
    use crate::syntax::lower::lower_function;

    struct Analyzed {
        tree: Tree,
        liveness: Liveness,
        failed: bool,
        messages: Vec<String>,
    }

    fn analyze_source(source: &str) -> Analyzed {
        let program = parse(source).unwrap();
        let mut ctx = CompilerCtx::new(&program);
        let tree = lower_function(&mut ctx, program.functions().last().unwrap());
        let boundaries = find_boundaries(&mut ctx, &tree, &Catalog::builtin());
        let liveness = analyze(&mut ctx, &tree, &boundaries);
        Analyzed {
            failed: ctx.failed(),
            messages: ctx.diagnostics().iter().map(|d| d.message.clone()).collect(),
            tree,
            liveness,
        }
    }

    fn escaping_names(analyzed: &Analyzed) -> Vec<String> {
        analyzed
            .liveness
            .escaping()
            .iter()
            .map(|&decl| analyzed.tree.decl_name(decl).unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_straight_line_escape() {
        let analyzed = analyze_source(
            "void f(h) { int x; int y; x = 1; y = 2; wait_op(h, 10); x = x + 1; wait_op(h, 10); use(y); }",
        );
        assert!(!analyzed.failed);
        assert_eq!(analyzed.liveness.state_count(), 3);
        assert_eq!(escaping_names(&analyzed), vec!["x", "y"]);
    }

    #[test]
    fn test_local_to_one_state() {
        let analyzed = analyze_source("void f(h) { wait_op(h, 1); int t; t = 2; use(t); }");
        assert!(!analyzed.failed);
        assert!(analyzed.liveness.escaping().is_empty());
        assert_eq!(
            analyzed.liveness.storage(analyzed.tree.ids().find(|&id| analyzed.tree.decl_name(id) == Some("t")).unwrap()),
            Some(StorageClass::Stack)
        );
    }

    #[test]
    fn test_branch_join_is_conservative() {
        let analyzed = analyze_source(
            "void f(h, c) { int x; x = 1; if (c) { wait_op(h, 1); } use(x); }",
        );
        assert!(!analyzed.failed);
        assert_eq!(escaping_names(&analyzed), vec!["x"]);
        assert_eq!(analyzed.liveness.exit(), &ReachSet::from([0, 1]));
    }

    #[test]
    fn test_pending_argument_crosses() {
        let analyzed = analyze_source("void f() { int h; h = open(); wait_op(h, 5); }");
        assert_eq!(escaping_names(&analyzed), vec!["h"]);
    }

    #[test]
    fn test_prologue_and_static() {
        let analyzed = analyze_source(
            "void f(h, cfg) { int n = cfg + 1; static int calls; wait_op(h, 1); calls++; use(n); }",
        );
        assert!(!analyzed.failed);
        assert!(analyzed.liveness.escaping().is_empty());
        assert_eq!(analyzed.liveness.prologue().len(), 1);
    }

    #[test]
    fn test_global_initializer_is_not_prologue() {
        let analyzed = analyze_source("int g; void f(h) { int n = g; g = 5; wait_op(h, 1); use(n); }");
        assert!(!analyzed.failed);
        assert!(analyzed.liveness.prologue().is_empty());
        assert_eq!(escaping_names(&analyzed), vec!["n"]);
    }

    #[test]
    fn test_pointer_read_is_not_prologue() {
        let analyzed = analyze_source("void f(h, int *p) { int v = *p; *p = 9; wait_op(h, 1); use(v); }");
        assert!(!analyzed.failed);
        assert!(analyzed.liveness.prologue().is_empty());
        assert_eq!(escaping_names(&analyzed), vec!["v"]);

        let analyzed = analyze_source(
            "void f(h, cfg_t *cfg) { int a = cfg->limit; int b = cfg[1].limit; wait_op(h, 1); use(a, b); }",
        );
        assert!(analyzed.liveness.prologue().is_empty());
        assert_eq!(escaping_names(&analyzed), vec!["a", "b"]);
    }

    #[test]
    fn test_prologue_chains_through_earlier_locals() {
        let analyzed = analyze_source(
            "void f(h, n) { int twice = n * 2; long wide = (long) twice + sizeof(int); wait_op(h, 1); use(twice, wide); }",
        );
        assert!(!analyzed.failed);
        assert_eq!(analyzed.liveness.prologue().len(), 2);
        assert!(analyzed.liveness.escaping().is_empty());
    }

    #[test]
    fn test_parameter_assigned_across_suspension_is_rejected() {
        let analyzed = analyze_source("void f(h, int c) { c = c + 1; wait_op(h, 1); use(c); }");
        assert!(analyzed.failed);
        assert!(analyzed.messages[0].contains("parameter `c` is assigned before a blocking call"));

        // Assigned and read within one state is fine
        let analyzed = analyze_source("void f(h, int c) { use(c); wait_op(h, 1); c = 2; use(c); }");
        assert!(!analyzed.failed);

        let analyzed = analyze_source("void f(h, int c) { c++; use(c); wait_op(h, 1); done(); }");
        assert!(!analyzed.failed);
    }

    #[test]
    fn test_written_declaration_is_not_prologue() {
        let analyzed = analyze_source("void f(h) { int n = 1; wait_op(h, 1); n++; }");
        assert!(analyzed.liveness.prologue().is_empty());
        assert_eq!(escaping_names(&analyzed), vec!["n"]);
    }

    #[test]
    fn test_return_ends_reach() {
        let analyzed = analyze_source("int f(h) { wait_op(h, 1); return 0; }");
        assert!(analyzed.liveness.exit().is_empty());
        assert!(!analyzed.messages.iter().any(|m| m.contains("unreachable")));

        let analyzed = analyze_source("int f(h) { return 0; g(); }");
        assert!(!analyzed.failed);
        assert!(analyzed.messages[0].contains("unreachable"));
    }

    #[test]
    fn test_rejected_control_flow() {
        let analyzed = analyze_source("void f(h, n) { while (n) { wait_op(h, 1); } }");
        assert!(analyzed.failed);
        assert!(analyzed.messages[0].contains("inside a loop"));

        let analyzed = analyze_source("void f(h, n) { switch (n) { case 1: wait_op(h, 1); break; } }");
        assert!(analyzed.messages[0].contains("inside a switch"));

        let analyzed = analyze_source("void f(h, a, b) { if (a) { if (b) wait_op(h, 1); } }");
        assert!(analyzed.messages[0].contains("nested conditionals"));

        let analyzed = analyze_source("void f(h) { wait_op(h, 1); goto out; out: ; }");
        assert!(analyzed.failed);
    }

    #[test]
    fn test_escaping_brace_initializer_is_rejected() {
        let analyzed = analyze_source("void f(h) { int a[2] = {1, 2}; wait_op(h, 1); use(a); }");
        assert!(analyzed.failed);
        assert!(analyzed.messages[0].contains("brace initializer"));
    }
}
