//! Blocking-boundary recognition
//!
//! A boundary is an expression statement whose whole expression is a call to
//! a catalogued primitive. Calls to primitives anywhere else (inside another
//! expression, a condition or a declaration's initializer) cannot be split and
//! are rejected.

use crate::catalog::{Catalog, Primitive, WaitHandle};
use crate::compiler::context::CompilerCtx;
use crate::parser::cst::TokenIndex;
use crate::parser::lexer::Token;
use crate::syntax::tree::{NodeId, NodeKind, Tree};
use crate::syntax::visit::{visit_node, walk_children, Visitor};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Where a call site's wait handle comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Handle {
    /// A call argument, with the declaration it names when it is a plain variable
    Argument { arg: NodeId, binder: Option<NodeId> },
    /// A parameter of the enclosing function
    Parameter { param: NodeId, name: String },
}

/// A statement that suspends the function
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSite {
    /// The `ExprStmt`
    pub stmt: NodeId,
    pub call: NodeId,
    pub callee_token: TokenIndex,
    pub primitive: Primitive,
    pub args: Vec<NodeId>,
    pub handle: Handle,
}

impl CallSite {
    /// Arguments the completion check reads again after resuming
    pub fn pending_args(&self) -> Vec<NodeId> {
        self.primitive
            .pending_arguments()
            .into_iter()
            .filter_map(|index| self.args.get(index).copied())
            .collect()
    }
}

/// Call sites in source order, indexed by their statement
#[derive(Debug, Clone, Default)]
pub struct Boundaries {
    sites: Vec<CallSite>,
    by_stmt: FxHashMap<NodeId, usize>,
}

impl Boundaries {
    pub fn sites(&self) -> &[CallSite] {
        &self.sites
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Index of the call site a statement holds
    pub fn index_of(&self, stmt: NodeId) -> Option<usize> {
        self.by_stmt.get(&stmt).copied()
    }

    pub fn site_for(&self, stmt: NodeId) -> Option<&CallSite> {
        self.index_of(stmt).map(|index| &self.sites[index])
    }
}

struct Recognizer<'r, 'c, 'a> {
    ctx: &'r mut CompilerCtx<'a>,
    catalog: &'c Catalog,
    boundaries: Boundaries,
    recursive_calls: Vec<NodeId>,
}

/// Find every blocking call site of the function
pub fn find_boundaries(ctx: &mut CompilerCtx, tree: &Tree, catalog: &Catalog) -> Boundaries {
    let mut recognizer = Recognizer {
        ctx,
        catalog,
        boundaries: Boundaries::default(),
        recursive_calls: Vec::new(),
    };
    visit_node(&mut recognizer, tree, tree.root());

    let Recognizer {
        ctx,
        boundaries,
        recursive_calls,
        ..
    } = recognizer;

    if !boundaries.is_empty() {
        for call in recursive_calls {
            ctx.error(
                tree.tokens(call),
                format!(
                    "recursive function containing a boundary: `{}` calls itself",
                    tree.function_name()
                ),
            );
        }
    }

    debug!(
        function = tree.function_name(),
        "found {} blocking call site(s)",
        boundaries.len()
    );
    boundaries
}

impl Recognizer<'_, '_, '_> {
    /// The primitive a call invokes, if any; a local variable shadows a primitive
    fn primitive_of(&self, tree: &Tree, call: NodeId) -> Option<Primitive> {
        let NodeKind::Call { callee, .. } = tree.kind(call) else {
            return None;
        };
        match tree.kind(*callee) {
            NodeKind::Var { name, decl: None } => self.catalog.lookup(name).cloned(),
            _ => None,
        }
    }

    fn record(&mut self, tree: &Tree, stmt: NodeId, call: NodeId, primitive: Primitive) {
        let NodeKind::Call { callee, args } = tree.kind(call) else {
            return;
        };

        if args.len() < primitive.min_args {
            self.ctx.error(
                tree.tokens(call),
                format!(
                    "`{}` expects at least {} argument(s), found {}",
                    primitive.name,
                    primitive.min_args,
                    args.len()
                ),
            );
            return;
        }

        let handle = match &primitive.wait_handle {
            WaitHandle::Argument(index) => {
                let arg = args[*index];
                let binder = match tree.kind(arg) {
                    NodeKind::Var { decl, .. } => *decl,
                    _ => None,
                };
                Handle::Argument { arg, binder }
            }
            WaitHandle::Parameter(type_name) => match self.handle_parameter(tree, type_name) {
                Some(handle) => handle,
                None => {
                    self.ctx.error(
                        tree.tokens(call),
                        format!(
                            "`{}` needs a `{}` parameter in `{}` to wait on",
                            primitive.name,
                            type_name,
                            tree.function_name()
                        ),
                    );
                    return;
                }
            },
        };

        let index = self.boundaries.sites.len();
        self.boundaries.by_stmt.insert(stmt, index);
        self.boundaries.sites.push(CallSite {
            stmt,
            call,
            callee_token: tree.tokens(*callee).start,
            primitive,
            args: args.clone(),
            handle,
        });
    }

    /// First parameter whose declared type names `type_name`
    fn handle_parameter(&self, tree: &Tree, type_name: &str) -> Option<Handle> {
        let tokens = &self.ctx.program.tokens;
        tree.params().iter().find_map(|&param| {
            let range = tree.tokens(param);
            let mentions_type = tokens[range.start..=range.stop]
                .iter()
                .any(|token| matches!(token, Token::Ident(name, _) if name == type_name));
            let name = tree.decl_name(param)?;
            mentions_type.then(|| Handle::Parameter {
                param,
                name: name.to_string(),
            })
        })
    }
}

impl Visitor for Recognizer<'_, '_, '_> {
    fn default_visit(&mut self, tree: &Tree, id: NodeId) {
        walk_children(self, tree, id);
    }

    fn visit_expr_stmt(&mut self, tree: &Tree, id: NodeId) {
        let NodeKind::ExprStmt { expr } = tree.kind(id) else {
            return;
        };
        let Some(primitive) = self.primitive_of(tree, *expr) else {
            walk_children(self, tree, id);
            return;
        };

        self.record(tree, id, *expr, primitive);
        // Arguments may not block either
        if let NodeKind::Call { args, .. } = tree.kind(*expr) {
            for &arg in args {
                visit_node(self, tree, arg);
            }
        }
    }

    fn visit_expr(&mut self, tree: &Tree, id: NodeId) {
        if let Some(primitive) = self.primitive_of(tree, id) {
            self.ctx.error(
                tree.tokens(id),
                format!(
                    "blocking call to `{}` in disallowed position: it must be a statement of its own",
                    primitive.name
                ),
            );
        } else if let NodeKind::Call { callee, .. } = tree.kind(id) {
            if matches!(tree.kind(*callee), NodeKind::Var { name, decl: None } if name == tree.function_name())
            {
                self.recursive_calls.push(id);
            }
        }
        walk_children(self, tree, id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::syntax::lower::lower_function;

    fn analyze(source: &str) -> (Boundaries, bool, Vec<String>) {
        let program = parse(source).unwrap();
        let mut ctx = CompilerCtx::new(&program);
        let tree = lower_function(&mut ctx, program.functions().last().unwrap());
        let boundaries = find_boundaries(&mut ctx, &tree, &Catalog::builtin());
        let messages = ctx.diagnostics().iter().map(|d| d.message.clone()).collect();
        (boundaries, ctx.failed(), messages)
    }

    #[test]
    fn test_statement_calls_are_boundaries() {
        let (boundaries, failed, _) =
            analyze("void f(h) { int x; x = 1; wait_op(h, 10); use(x); wait_op(h, 2); }");
        assert!(!failed);
        assert_eq!(boundaries.len(), 2);
        let site = &boundaries.sites()[0];
        assert_eq!(site.primitive.name, "wait_op");
        assert!(matches!(site.handle, Handle::Argument { binder: Some(_), .. }));
    }

    #[test]
    fn test_nested_call_is_rejected() {
        let (_, failed, messages) = analyze("void f(h) { int x; x = wait_op(h, 10); }");
        assert!(failed);
        assert!(messages[0].contains("disallowed position"));
    }

    #[test]
    fn test_condition_call_is_rejected() {
        let (_, failed, _) = analyze("void f(h) { while (wait_op(h, 1)) { } }");
        assert!(failed);
    }

    #[test]
    fn test_too_few_arguments() {
        let (boundaries, failed, messages) = analyze("void f(h) { wait_op(h); }");
        assert!(failed);
        assert!(boundaries.is_empty());
        assert!(messages[0].contains("at least 2"));
    }

    #[test]
    fn test_recursion_with_boundary() {
        let (_, failed, messages) = analyze("void f(h) { wait_op(h, 1); f(h); }");
        assert!(failed);
        assert!(messages[0].contains("recursive"));

        let (_, failed, _) = analyze("int g(int n) { return n ? g(n - 1) : 0; }");
        assert!(!failed);
    }

    #[test]
    fn test_handle_parameter_by_type() {
        let (boundaries, failed, _) = analyze(
            "uint8_t h(const void* cfg, waiting_for* wf) { papi_sleep(1000); return 0; }",
        );
        assert!(!failed);
        assert!(matches!(
            &boundaries.sites()[0].handle,
            Handle::Parameter { name, .. } if name == "wf"
        ));

        let (_, failed, messages) = analyze("uint8_t h(const void* cfg) { papi_sleep(1000); return 0; }");
        assert!(failed);
        assert!(messages[0].contains("waiting_for"));
    }

    #[test]
    fn test_local_shadows_primitive() {
        let (boundaries, failed, _) = analyze("void f(h) { int wait_op; wait_op = 1; }");
        assert!(!failed);
        assert!(boundaries.is_empty());
    }
}
