//! Structural checks on the intermediate representations
//!
//! [`check_tree`] runs after lowering and [`check_graph`] after decomposition.
//! Both report every violation they find through the compiler context rather
//! than stopping at the first one.

use crate::analysis::Boundaries;
use crate::compiler::context::CompilerCtx;
use crate::states::StateGraph;
use crate::syntax::tree::{NodeId, NodeKind, Tree};
use std::collections::VecDeque;

/// Every node is owned exactly once, references point at declarations, and
/// each slot holds the kind of node it expects
pub fn check_tree(ctx: &mut CompilerCtx, tree: &Tree) {
    if tree.is_empty() {
        return;
    }
    let root = tree.root();
    if !matches!(tree.kind(root), NodeKind::Function { .. }) {
        ctx.error(tree.tokens(root), "tree root is not a function");
        return;
    }

    let mut owners = vec![0usize; tree.len()];
    let mut stack = vec![root];
    while let Some(id) = stack.pop() {
        for child in tree.children(id) {
            if child.index() >= tree.len() {
                ctx.error(
                    tree.tokens(id),
                    format!("{} refers to a missing node", tree.kind(id).describe()),
                );
                continue;
            }
            owners[child.index()] += 1;
            // Only descend on first sight so a shared node cannot loop
            if owners[child.index()] == 1 {
                stack.push(child);
            }
        }
    }

    for id in tree.ids() {
        let count = owners[id.index()];
        if id == root {
            continue;
        }
        if count == 0 {
            ctx.error(
                tree.tokens(id),
                format!("{} is not reachable from the function", tree.kind(id).describe()),
            );
        } else if count > 1 {
            ctx.error(
                tree.tokens(id),
                format!("{} is shared by {} parents", tree.kind(id).describe(), count),
            );
        }
        check_slots(ctx, tree, id);
    }
    check_slots(ctx, tree, root);
}

fn check_slots(ctx: &mut CompilerCtx, tree: &Tree, id: NodeId) {
    if let NodeKind::Var {
        decl: Some(decl),
        name,
    } = tree.kind(id)
    {
        let resolves = decl.index() < tree.len()
            && matches!(
                tree.kind(*decl),
                NodeKind::VarDecl { .. } | NodeKind::Param { .. }
            );
        if !resolves {
            ctx.error(
                tree.tokens(id),
                format!("`{}` does not resolve to a declaration", name),
            );
        }
        return;
    }

    let mut expect = |child: NodeId, ok: bool, what: &str| {
        if child.index() < tree.len() && !ok {
            ctx.error(
                tree.tokens(child),
                format!(
                    "expected {} in {}, found {}",
                    what,
                    tree.kind(id).describe(),
                    tree.kind(child).describe()
                ),
            );
        }
    };
    let is_statement = |child: NodeId| child.index() < tree.len() && tree.kind(child).is_statement();
    let is_expression = |child: NodeId| child.index() < tree.len() && tree.kind(child).is_expression();

    match tree.kind(id) {
        NodeKind::Function { params, body, .. } => {
            for &param in params {
                expect(param, matches!(tree.get(param).map(|n| &n.kind), Some(NodeKind::Param { .. })), "a parameter");
            }
            expect(*body, matches!(tree.get(*body).map(|n| &n.kind), Some(NodeKind::Block { .. })), "a block");
        }
        NodeKind::DeclStmt { decls, .. } => {
            for &decl in decls {
                expect(decl, matches!(tree.get(decl).map(|n| &n.kind), Some(NodeKind::VarDecl { .. })), "a declarator");
            }
        }
        NodeKind::Block { statements } => {
            for &stmt in statements {
                expect(stmt, is_statement(stmt), "a statement");
            }
        }
        NodeKind::Case { value, statements } => {
            for &value in value {
                expect(value, is_expression(value), "an expression");
            }
            for &stmt in statements {
                expect(stmt, is_statement(stmt), "a statement");
            }
        }
        NodeKind::Switch { expr, cases } => {
            expect(*expr, is_expression(*expr), "an expression");
            for &case in cases {
                expect(case, matches!(tree.get(case).map(|n| &n.kind), Some(NodeKind::Case { .. })), "a case");
            }
        }
        NodeKind::If {
            condition,
            then_branch,
            else_branch,
        } => {
            expect(*condition, is_expression(*condition), "an expression");
            expect(*then_branch, is_statement(*then_branch), "a statement");
            for &branch in else_branch {
                expect(branch, is_statement(branch), "a statement");
            }
        }
        NodeKind::While { condition, body } | NodeKind::DoWhile { body, condition } => {
            expect(*condition, is_expression(*condition), "an expression");
            expect(*body, is_statement(*body), "a statement");
        }
        NodeKind::For {
            init,
            condition,
            increment,
            body,
        } => {
            for &init in init {
                expect(init, is_statement(init), "a statement");
            }
            for &expr in condition.iter().chain(increment) {
                expect(expr, is_expression(expr), "an expression");
            }
            expect(*body, is_statement(*body), "a statement");
        }
        NodeKind::ExprStmt { expr } | NodeKind::SizeofExpr { expr } | NodeKind::Cast { expr, .. } => {
            expect(*expr, is_expression(*expr), "an expression");
        }
        NodeKind::VarDecl { init: Some(init), .. } | NodeKind::Return { expr: Some(init) } => {
            expect(*init, is_expression(*init), "an expression");
        }
        NodeKind::Call { callee, args } => {
            for &expr in std::iter::once(callee).chain(args) {
                expect(expr, is_expression(expr), "an expression");
            }
        }
        _ => {}
    }
}

/// Dense ids, edges between existing states, a resolvable target for every
/// call site, and no state unreachable from the entry
pub fn check_graph(ctx: &mut CompilerCtx, tree: &Tree, boundaries: &Boundaries, graph: &StateGraph) {
    let function = tree.tokens(tree.root());

    for (index, state) in graph.states().iter().enumerate() {
        if state.id as usize != index {
            ctx.error(
                function,
                format!("state at position {} has id {}", index, state.id),
            );
        }
    }

    let count = graph.len() as u32;
    for edge in graph.edges() {
        if edge.from >= count || edge.to >= count {
            ctx.error(
                function,
                format!("edge {} -> {} refers to a missing state", edge.from, edge.to),
            );
        } else if edge.from >= edge.to {
            ctx.error(
                function,
                format!("edge {} -> {} runs against program order", edge.from, edge.to),
            );
        }
    }

    for (index, site) in boundaries.sites().iter().enumerate() {
        if graph.resume_target(index).is_none() {
            ctx.error(
                tree.tokens(site.stmt),
                format!("call to `{}` has no state to resume in", site.primitive.name),
            );
        }
    }

    let mut seen = vec![false; graph.len()];
    let mut queue = VecDeque::new();
    if !seen.is_empty() {
        seen[0] = true;
        queue.push_back(0);
    }
    while let Some(id) = queue.pop_front() {
        for next in graph.successors(id) {
            if let Some(visited) = seen.get_mut(next as usize) {
                if !*visited {
                    *visited = true;
                    queue.push_back(next);
                }
            }
        }
    }

    for state in graph.states() {
        if seen.get(state.id as usize) == Some(&false) {
            let range = state
                .resume
                .as_ref()
                .map(|point| tree.tokens(point.stmt))
                .unwrap_or(function);
            ctx.error(
                range,
                format!("state {} is unreachable: no path leads to this blocking call", state.id),
            );
        }
    }
}
