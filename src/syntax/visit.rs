use crate::syntax::tree::{NodeId, NodeKind, Tree};

/// Tree visitor with one method per group of node kinds.
///
/// Every method falls back to [`Visitor::default_visit`], so a pass only
/// overrides the kinds it understands and decides in one place what happens
/// to the rest. Analysis passes report an "unsupported statement" diagnostic
/// there instead of silently skipping the node. Call [`walk_children`] from an
/// override to recurse.
pub trait Visitor {
    fn default_visit(&mut self, tree: &Tree, id: NodeId);

    fn visit_function(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_param(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_block(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_decl_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_var_decl(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_expr_stmt(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_empty(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_return(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_if(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    /// `while`, `do-while` and `for`
    fn visit_loop(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_switch(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_case(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    /// `break`, `continue` and `goto`
    fn visit_jump(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    fn visit_label(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }

    /// Any expression kind
    fn visit_expr(&mut self, tree: &Tree, id: NodeId) {
        self.default_visit(tree, id)
    }
}

/// Dispatch on the node's kind
pub fn visit_node<V: Visitor + ?Sized>(visitor: &mut V, tree: &Tree, id: NodeId) {
    match tree.kind(id) {
        NodeKind::Function { .. } => visitor.visit_function(tree, id),
        NodeKind::Param { .. } => visitor.visit_param(tree, id),
        NodeKind::DeclStmt { .. } => visitor.visit_decl_stmt(tree, id),
        NodeKind::VarDecl { .. } => visitor.visit_var_decl(tree, id),
        NodeKind::Block { .. } => visitor.visit_block(tree, id),
        NodeKind::ExprStmt { .. } => visitor.visit_expr_stmt(tree, id),
        NodeKind::Empty => visitor.visit_empty(tree, id),
        NodeKind::Return { .. } => visitor.visit_return(tree, id),
        NodeKind::If { .. } => visitor.visit_if(tree, id),
        NodeKind::While { .. } | NodeKind::DoWhile { .. } | NodeKind::For { .. } => {
            visitor.visit_loop(tree, id)
        }
        NodeKind::Switch { .. } => visitor.visit_switch(tree, id),
        NodeKind::Case { .. } => visitor.visit_case(tree, id),
        NodeKind::Break | NodeKind::Continue | NodeKind::Goto { .. } => {
            visitor.visit_jump(tree, id)
        }
        NodeKind::Label { .. } => visitor.visit_label(tree, id),
        NodeKind::Literal { .. }
        | NodeKind::Var { .. }
        | NodeKind::Call { .. }
        | NodeKind::Unary { .. }
        | NodeKind::Binary { .. }
        | NodeKind::Assign { .. }
        | NodeKind::Ternary { .. }
        | NodeKind::Comma { .. }
        | NodeKind::Index { .. }
        | NodeKind::Member { .. }
        | NodeKind::Cast { .. }
        | NodeKind::SizeofType { .. }
        | NodeKind::SizeofExpr { .. }
        | NodeKind::InitList => visitor.visit_expr(tree, id),
    }
}

pub fn walk_children<V: Visitor + ?Sized>(visitor: &mut V, tree: &Tree, id: NodeId) {
    for child in tree.children(id) {
        visit_node(visitor, tree, child);
    }
}
