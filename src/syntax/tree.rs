//! Arena-backed syntax tree for one function
//!
//! Nodes live in a flat arena and refer to their children by [`NodeId`]. The
//! tree edges (parent owns child) are exactly the ids returned by
//! [`Tree::children`]; the only other ids stored in a node are non-owning
//! cross-references, currently the declaration a variable use resolves to.
//! The tree is never modified after lowering; later passes keep their results
//! in side tables keyed by `NodeId`.

use crate::parser::cst::{BinOp, TokenIndex, TokenRange, UnOp};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Closed set of node kinds
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    // Declarations
    Function {
        name: String,
        name_token: TokenIndex,
        params: Vec<NodeId>,
        /// From '(' to ')' inclusive
        param_list: TokenRange,
        body: NodeId,
    },
    Param {
        name: String,
        name_token: Option<TokenIndex>,
    },
    /// One declaration statement, owning its declarators
    DeclStmt {
        specifiers: TokenRange,
        is_static: bool,
        decls: Vec<NodeId>,
    },
    VarDecl {
        name: String,
        name_token: TokenIndex,
        /// Stars, name and array suffixes
        declarator: TokenRange,
        init: Option<NodeId>,
    },

    // Statements
    Block {
        statements: Vec<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    Empty,
    Return {
        expr: Option<NodeId>,
    },
    If {
        condition: NodeId,
        then_branch: NodeId,
        else_branch: Option<NodeId>,
    },
    While {
        condition: NodeId,
        body: NodeId,
    },
    DoWhile {
        body: NodeId,
        condition: NodeId,
    },
    For {
        init: Option<NodeId>,
        condition: Option<NodeId>,
        increment: Option<NodeId>,
        body: NodeId,
    },
    Switch {
        expr: NodeId,
        cases: Vec<NodeId>,
    },
    /// `case value:` or `default:` (no value) with the statements that follow
    Case {
        value: Option<NodeId>,
        statements: Vec<NodeId>,
    },
    Break,
    Continue,
    Goto {
        label: String,
    },
    Label {
        name: String,
    },

    // Expressions
    Literal {
        text: String,
    },
    Var {
        name: String,
        /// `VarDecl` or `Param` this use resolves to; `None` for globals
        decl: Option<NodeId>,
    },
    Call {
        callee: NodeId,
        args: Vec<NodeId>,
    },
    Unary {
        op: UnOp,
        operand: NodeId,
    },
    Binary {
        op: BinOp,
        left: NodeId,
        right: NodeId,
    },
    /// Plain (`op == None`) or compound assignment
    Assign {
        op: Option<BinOp>,
        lhs: NodeId,
        rhs: NodeId,
    },
    Ternary {
        condition: NodeId,
        true_expr: NodeId,
        false_expr: NodeId,
    },
    Comma {
        left: NodeId,
        right: NodeId,
    },
    Index {
        array: NodeId,
        index: NodeId,
    },
    Member {
        object: NodeId,
        member: String,
        arrow: bool,
    },
    Cast {
        type_tokens: TokenRange,
        expr: NodeId,
    },
    SizeofType {
        type_tokens: TokenRange,
    },
    SizeofExpr {
        expr: NodeId,
    },
    InitList,
}

impl NodeKind {
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
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
                | NodeKind::InitList
        )
    }

    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            NodeKind::DeclStmt { .. }
                | NodeKind::Block { .. }
                | NodeKind::ExprStmt { .. }
                | NodeKind::Empty
                | NodeKind::Return { .. }
                | NodeKind::If { .. }
                | NodeKind::While { .. }
                | NodeKind::DoWhile { .. }
                | NodeKind::For { .. }
                | NodeKind::Switch { .. }
                | NodeKind::Break
                | NodeKind::Continue
                | NodeKind::Goto { .. }
                | NodeKind::Label { .. }
        )
    }

    /// Short name used in diagnostics
    pub fn describe(&self) -> &'static str {
        match self {
            NodeKind::Function { .. } => "function",
            NodeKind::Param { .. } => "parameter",
            NodeKind::DeclStmt { .. } => "declaration",
            NodeKind::VarDecl { .. } => "declarator",
            NodeKind::Block { .. } => "block",
            NodeKind::ExprStmt { .. } => "expression statement",
            NodeKind::Empty => "empty statement",
            NodeKind::Return { .. } => "return",
            NodeKind::If { .. } => "if",
            NodeKind::While { .. } => "while loop",
            NodeKind::DoWhile { .. } => "do-while loop",
            NodeKind::For { .. } => "for loop",
            NodeKind::Switch { .. } => "switch",
            NodeKind::Case { .. } => "case",
            NodeKind::Break => "break",
            NodeKind::Continue => "continue",
            NodeKind::Goto { .. } => "goto",
            NodeKind::Label { .. } => "label",
            NodeKind::Literal { .. } => "literal",
            NodeKind::Var { .. } => "variable",
            NodeKind::Call { .. } => "call",
            NodeKind::Unary { .. } => "unary expression",
            NodeKind::Binary { .. } => "binary expression",
            NodeKind::Assign { .. } => "assignment",
            NodeKind::Ternary { .. } => "conditional expression",
            NodeKind::Comma { .. } => "comma expression",
            NodeKind::Index { .. } => "index expression",
            NodeKind::Member { .. } => "member access",
            NodeKind::Cast { .. } => "cast",
            NodeKind::SizeofType { .. } | NodeKind::SizeofExpr { .. } => "sizeof",
            NodeKind::InitList => "initializer list",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    pub tokens: TokenRange,
}

/// Node arena for a single function; `root` is the `Function` node
#[derive(Debug, Clone, Default)]
pub struct Tree {
    nodes: Vec<Node>,
    root: Option<NodeId>,
}

impl Tree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: NodeKind, tokens: TokenRange) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node { kind, tokens });
        id
    }

    /// Overwrite a node pushed earlier; used while lowering to attach children
    /// that can only be built after the node's id is known
    pub(crate) fn replace(&mut self, id: NodeId, kind: NodeKind, tokens: TokenRange) {
        self.nodes[id.index()] = Node { kind, tokens };
    }

    pub fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// The function node; lowering always sets it
    pub fn root(&self) -> NodeId {
        self.root.unwrap_or(NodeId(0))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index())
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    pub fn tokens(&self, id: NodeId) -> TokenRange {
        self.nodes[id.index()].tokens
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len() as u32).map(NodeId)
    }

    /// Owned children in source order
    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        match self.kind(id) {
            NodeKind::Function { params, body, .. } => {
                out.extend(params);
                out.push(*body);
            }
            NodeKind::DeclStmt { decls, .. } => out.extend(decls),
            NodeKind::VarDecl { init, .. } => out.extend(init),
            NodeKind::Block { statements } => out.extend(statements),
            NodeKind::ExprStmt { expr } => out.push(*expr),
            NodeKind::Return { expr } => out.extend(expr),
            NodeKind::If {
                condition,
                then_branch,
                else_branch,
            } => {
                out.push(*condition);
                out.push(*then_branch);
                out.extend(else_branch);
            }
            NodeKind::While { condition, body } => out.extend([*condition, *body]),
            NodeKind::DoWhile { body, condition } => out.extend([*body, *condition]),
            NodeKind::For {
                init,
                condition,
                increment,
                body,
            } => {
                out.extend(init);
                out.extend(condition);
                out.extend(increment);
                out.push(*body);
            }
            NodeKind::Switch { expr, cases } => {
                out.push(*expr);
                out.extend(cases);
            }
            NodeKind::Case { value, statements } => {
                out.extend(value);
                out.extend(statements);
            }
            NodeKind::Call { callee, args } => {
                out.push(*callee);
                out.extend(args);
            }
            NodeKind::Unary { operand, .. } => out.push(*operand),
            NodeKind::Binary { left, right, .. } | NodeKind::Comma { left, right } => {
                out.extend([*left, *right])
            }
            NodeKind::Assign { lhs, rhs, .. } => out.extend([*lhs, *rhs]),
            NodeKind::Ternary {
                condition,
                true_expr,
                false_expr,
            } => out.extend([*condition, *true_expr, *false_expr]),
            NodeKind::Index { array, index } => out.extend([*array, *index]),
            NodeKind::Member { object, .. } => out.push(*object),
            NodeKind::Cast { expr, .. } | NodeKind::SizeofExpr { expr } => out.push(*expr),
            NodeKind::Param { .. }
            | NodeKind::Empty
            | NodeKind::Break
            | NodeKind::Continue
            | NodeKind::Goto { .. }
            | NodeKind::Label { .. }
            | NodeKind::Literal { .. }
            | NodeKind::Var { .. }
            | NodeKind::SizeofType { .. }
            | NodeKind::InitList => {}
        }
        out
    }

    /// Pre-order traversal from `id`, including `id` itself
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    pub fn function_name(&self) -> &str {
        match self.kind(self.root()) {
            NodeKind::Function { name, .. } => name,
            _ => "",
        }
    }

    /// The body block of the function
    pub fn body(&self) -> Option<NodeId> {
        match self.kind(self.root()) {
            NodeKind::Function { body, .. } => Some(*body),
            _ => None,
        }
    }

    pub fn params(&self) -> &[NodeId] {
        match self.kind(self.root()) {
            NodeKind::Function { params, .. } => params,
            _ => &[],
        }
    }

    /// Declared name of a `VarDecl` or `Param`
    pub fn decl_name(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            NodeKind::VarDecl { name, .. } | NodeKind::Param { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Variable written by an assignment to this lvalue
    ///
    /// `a`, `a[i]` and `a.f` name `a`; `p->f` and `*p` write through `p`
    /// rather than to it, so they name nothing.
    pub fn lvalue_root(&self, id: NodeId) -> Option<NodeId> {
        match self.kind(id) {
            NodeKind::Var { .. } => Some(id),
            NodeKind::Index { array, .. } => self.lvalue_root(*array),
            NodeKind::Member {
                object,
                arrow: false,
                ..
            } => self.lvalue_root(*object),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_children_and_descendants() {
        let mut tree = Tree::new();
        let one = tree.push(
            NodeKind::Literal {
                text: "1".to_string(),
            },
            TokenRange::single(6),
        );
        let stmt = tree.push(NodeKind::Return { expr: Some(one) }, TokenRange::new(5, 7));
        let body = tree.push(
            NodeKind::Block {
                statements: vec![stmt],
            },
            TokenRange::new(4, 8),
        );
        let root = tree.push(
            NodeKind::Function {
                name: "f".to_string(),
                name_token: 1,
                params: vec![],
                param_list: TokenRange::new(2, 3),
                body,
            },
            TokenRange::new(0, 8),
        );
        tree.set_root(root);

        assert_eq!(tree.children(root), vec![body]);
        assert_eq!(tree.descendants(root), vec![root, body, stmt, one]);
        assert_eq!(tree.function_name(), "f");
        assert_eq!(tree.body(), Some(body));
    }
}
