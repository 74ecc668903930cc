use crate::analysis::{Boundaries, Liveness, StateId};
use crate::states::{Edge, EdgeKind, ResumePoint, State, StateGraph};
use crate::syntax::tree::{NodeKind, Tree};
use tracing::{debug, trace};

/// Split the function into states at its boundaries
///
/// Every statement goes to the latest state that reaches it. Each boundary
/// gets one edge per state reaching it: a `Resume` edge from the state it
/// textually ends, `FallThrough` edges from states that arrive there by
/// skipping a branch arm.
pub fn decompose(tree: &Tree, boundaries: &Boundaries, liveness: &Liveness) -> StateGraph {
    let mut states: Vec<State> = (0..liveness.state_count())
        .map(|id| State {
            id,
            resume: None,
            statements: Vec::new(),
        })
        .collect();
    let mut edges = Vec::new();

    for (index, site) in boundaries.sites().iter().enumerate() {
        let Some(opened) = liveness.opened_by(site.stmt) else {
            continue;
        };
        if let Some(state) = states.get_mut(opened as usize) {
            state.resume = Some(ResumePoint {
                site: index,
                stmt: site.stmt,
                primitive: site.primitive.name.clone(),
            });
        }

        let reach = liveness.reach_of(site.stmt).cloned().unwrap_or_default();
        let home = reach.last().copied();
        for from in reach {
            let kind = if Some(from) == home {
                EdgeKind::Resume
            } else {
                EdgeKind::FallThrough
            };
            trace!(from, to = opened, ?kind, "edge");
            edges.push(Edge {
                from,
                to: opened,
                kind,
            });
        }
    }

    if let Some(body) = tree.body() {
        for id in tree.descendants(body) {
            let kind = tree.kind(id);
            if !kind.is_statement() || matches!(kind, NodeKind::Block { .. }) {
                continue;
            }
            let home: Option<StateId> = liveness.home_state(id);
            if let Some(state) = home.and_then(|home| states.get_mut(home as usize)) {
                state.statements.push(id);
            }
        }
    }

    edges.sort();
    debug!(
        function = tree.function_name(),
        "{} state(s), {} edge(s)",
        states.len(),
        edges.len()
    );
    StateGraph::new(states, edges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, find_boundaries};
    use crate::catalog::Catalog;
    use crate::compiler::context::CompilerCtx;
    use crate::parser::parse;
    use crate::syntax::lower::lower_function;

    fn graph_of(source: &str) -> StateGraph {
        let program = parse(source).unwrap();
        let mut ctx = CompilerCtx::new(&program);
        let tree = lower_function(&mut ctx, program.functions().last().unwrap());
        let boundaries = find_boundaries(&mut ctx, &tree, &Catalog::builtin());
        let liveness = analyze(&mut ctx, &tree, &boundaries);
        assert!(!ctx.failed());
        decompose(&tree, &boundaries, &liveness)
    }

    #[test]
    fn test_straight_line_chain() {
        let graph = graph_of("void f(h) { a(); wait_op(h, 1); b(); wait_op(h, 2); c(); }");
        assert_eq!(graph.len(), 3);
        assert_eq!(
            graph.edges(),
            &[
                Edge { from: 0, to: 1, kind: EdgeKind::Resume },
                Edge { from: 1, to: 2, kind: EdgeKind::Resume },
            ]
        );
        // a(); and the first wait_op in state 0, b(); and the second in state 1
        assert_eq!(graph.state(0).unwrap().statements.len(), 2);
        assert_eq!(graph.state(2).unwrap().statements.len(), 1);
        assert_eq!(graph.resume_target(1), Some(2));
    }

    #[test]
    fn test_fall_through_edge() {
        let graph = graph_of("void f(h, c) { if (c) { wait_op(h, 1); } wait_op(h, 2); }");
        assert_eq!(graph.len(), 3);
        assert!(graph.edges().contains(&Edge { from: 0, to: 2, kind: EdgeKind::FallThrough }));
        assert!(graph.edges().contains(&Edge { from: 1, to: 2, kind: EdgeKind::Resume }));
        assert_eq!(graph.successors(0).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_no_boundaries() {
        let graph = graph_of("int f(int a) { return a + 1; }");
        assert_eq!(graph.len(), 1);
        assert!(graph.edges().is_empty());
        assert!(graph.state(0).unwrap().resume.is_none());
    }
}
