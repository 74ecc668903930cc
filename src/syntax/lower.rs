//! Lowering from the concrete parse tree to the arena tree
//!
//! Parentheses disappear (the source text keeps them), declaration statements
//! split into one `VarDecl` per declarator, and every identifier use is
//! resolved against a stack of block scopes. Names that resolve to nothing
//! are globals or functions and keep `decl: None`.

use crate::compiler::context::CompilerCtx;
use crate::parser::cst::{CaseNode, Declarator, ParseNode, TokenRange};
use crate::syntax::tree::{NodeId, NodeKind, Tree};
use rustc_hash::FxHashMap;

struct Lowerer<'c, 'a> {
    ctx: &'c mut CompilerCtx<'a>,
    tree: Tree,
    scopes: Vec<FxHashMap<String, NodeId>>,
}

/// Lower one function definition
pub fn lower_function(ctx: &mut CompilerCtx, function: &ParseNode) -> Tree {
    let mut lowerer = Lowerer {
        ctx,
        tree: Tree::new(),
        scopes: Vec::new(),
    };
    lowerer.lower_function(function);
    lowerer.tree
}

impl Lowerer<'_, '_> {
    fn lower_function(&mut self, function: &ParseNode) {
        let ParseNode::FunctionDef {
            name,
            name_token,
            params,
            param_list,
            body,
            body_tokens,
            tokens,
        } = function
        else {
            self.ctx.error(function.tokens(), "expected a function definition");
            return;
        };

        self.scopes.push(FxHashMap::default());

        let mut param_ids = Vec::new();
        for param in params {
            // Unnamed parameters cannot be referenced
            let Some(param_name) = &param.name else {
                continue;
            };
            let id = self.tree.push(
                NodeKind::Param {
                    name: param_name.clone(),
                    name_token: param.name_token,
                },
                param.tokens,
            );
            self.declare(param_name, id, param.tokens);
            param_ids.push(id);
        }

        let body = self.lower_block(body, *body_tokens);
        self.scopes.pop();

        let root = self.tree.push(
            NodeKind::Function {
                name: name.clone(),
                name_token: *name_token,
                params: param_ids,
                param_list: *param_list,
                body,
            },
            *tokens,
        );
        self.tree.set_root(root);
    }

    fn declare(&mut self, name: &str, id: NodeId, tokens: TokenRange) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        if scope.insert(name.to_string(), id).is_some() {
            self.ctx.error(tokens, format!("redeclaration of `{}`", name));
        }
    }

    fn resolve(&self, name: &str) -> Option<NodeId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn lower_block(&mut self, statements: &[ParseNode], tokens: TokenRange) -> NodeId {
        self.scopes.push(FxHashMap::default());
        let statements = statements.iter().map(|s| self.lower_statement(s)).collect();
        self.scopes.pop();
        self.tree.push(NodeKind::Block { statements }, tokens)
    }

    fn lower_statement(&mut self, node: &ParseNode) -> NodeId {
        let tokens = node.tokens();
        let kind = match node {
            ParseNode::Compound { body, .. } => return self.lower_block(body, tokens),
            ParseNode::Declaration {
                specifiers,
                is_static,
                declarators,
                ..
            } => {
                let decls = declarators.iter().map(|d| self.lower_declarator(d)).collect();
                NodeKind::DeclStmt {
                    specifiers: *specifiers,
                    is_static: *is_static,
                    decls,
                }
            }
            ParseNode::ExpressionStatement { expr, .. } => NodeKind::ExprStmt {
                expr: self.lower_expr(expr),
            },
            ParseNode::Empty { .. } => NodeKind::Empty,
            ParseNode::Return { expr, .. } => NodeKind::Return {
                expr: expr.as_deref().map(|e| self.lower_expr(e)),
            },
            ParseNode::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => NodeKind::If {
                condition: self.lower_expr(condition),
                then_branch: self.lower_statement(then_branch),
                else_branch: else_branch.as_deref().map(|e| self.lower_statement(e)),
            },
            ParseNode::While { condition, body, .. } => NodeKind::While {
                condition: self.lower_expr(condition),
                body: self.lower_statement(body),
            },
            ParseNode::DoWhile { body, condition, .. } => NodeKind::DoWhile {
                body: self.lower_statement(body),
                condition: self.lower_expr(condition),
            },
            ParseNode::For {
                init,
                condition,
                increment,
                body,
                ..
            } => {
                // A declaration in the init clause is scoped to the loop
                self.scopes.push(FxHashMap::default());
                let kind = NodeKind::For {
                    init: init.as_deref().map(|i| self.lower_statement(i)),
                    condition: condition.as_deref().map(|c| self.lower_expr(c)),
                    increment: increment.as_deref().map(|i| self.lower_expr(i)),
                    body: self.lower_statement(body),
                };
                self.scopes.pop();
                kind
            }
            ParseNode::Switch { expr, cases, .. } => {
                let expr = self.lower_expr(expr);
                self.scopes.push(FxHashMap::default());
                let cases = cases.iter().map(|c| self.lower_case(c)).collect();
                self.scopes.pop();
                NodeKind::Switch { expr, cases }
            }
            ParseNode::Break { .. } => NodeKind::Break,
            ParseNode::Continue { .. } => NodeKind::Continue,
            ParseNode::Goto { label, .. } => NodeKind::Goto {
                label: label.clone(),
            },
            ParseNode::Label { name, .. } => NodeKind::Label { name: name.clone() },
            _ => {
                self.ctx.error(tokens, "unsupported statement");
                NodeKind::Empty
            }
        };
        self.tree.push(kind, tokens)
    }

    fn lower_case(&mut self, case: &CaseNode) -> NodeId {
        let (value, statements, tokens) = match case {
            CaseNode::Case {
                value,
                statements,
                tokens,
            } => (Some(self.lower_expr(value)), statements, *tokens),
            CaseNode::Default { statements, tokens } => (None, statements, *tokens),
        };
        let statements = statements.iter().map(|s| self.lower_statement(s)).collect();
        self.tree.push(NodeKind::Case { value, statements }, tokens)
    }

    fn lower_declarator(&mut self, declarator: &Declarator) -> NodeId {
        // The name is in scope inside its own initializer
        let id = self.tree.push(
            NodeKind::VarDecl {
                name: declarator.name.clone(),
                name_token: declarator.name_token,
                declarator: declarator.tokens,
                init: None,
            },
            declarator.tokens,
        );
        self.declare(&declarator.name, id, declarator.tokens);

        let init = declarator.init.as_deref().map(|init| self.lower_expr(init));
        if let Some(init) = init {
            let stop = self.tree.tokens(init).stop;
            self.tree.replace(
                id,
                NodeKind::VarDecl {
                    name: declarator.name.clone(),
                    name_token: declarator.name_token,
                    declarator: declarator.tokens,
                    init: Some(init),
                },
                TokenRange::new(declarator.tokens.start, stop),
            );
        }
        id
    }

    fn lower_expr(&mut self, node: &ParseNode) -> NodeId {
        let tokens = node.tokens();
        let kind = match node {
            ParseNode::Paren { expr, .. } => return self.lower_expr(expr),
            ParseNode::Literal { text, .. } => NodeKind::Literal { text: text.clone() },
            ParseNode::Identifier { name, .. } => NodeKind::Var {
                name: name.clone(),
                decl: self.resolve(name),
            },
            ParseNode::BinaryOp { op, left, right, .. } => NodeKind::Binary {
                op: *op,
                left: self.lower_expr(left),
                right: self.lower_expr(right),
            },
            ParseNode::UnaryOp { op, operand, .. } => NodeKind::Unary {
                op: *op,
                operand: self.lower_expr(operand),
            },
            ParseNode::Assignment { lhs, rhs, .. } => NodeKind::Assign {
                op: None,
                lhs: self.lower_expr(lhs),
                rhs: self.lower_expr(rhs),
            },
            ParseNode::CompoundAssignment { lhs, op, rhs, .. } => NodeKind::Assign {
                op: Some(*op),
                lhs: self.lower_expr(lhs),
                rhs: self.lower_expr(rhs),
            },
            ParseNode::TernaryOp {
                condition,
                true_expr,
                false_expr,
                ..
            } => NodeKind::Ternary {
                condition: self.lower_expr(condition),
                true_expr: self.lower_expr(true_expr),
                false_expr: self.lower_expr(false_expr),
            },
            ParseNode::Comma { left, right, .. } => NodeKind::Comma {
                left: self.lower_expr(left),
                right: self.lower_expr(right),
            },
            ParseNode::FunctionCall { callee, args, .. } => NodeKind::Call {
                callee: self.lower_expr(callee),
                args: args.iter().map(|a| self.lower_expr(a)).collect(),
            },
            ParseNode::ArrayAccess { array, index, .. } => NodeKind::Index {
                array: self.lower_expr(array),
                index: self.lower_expr(index),
            },
            ParseNode::MemberAccess { object, member, .. } => NodeKind::Member {
                object: self.lower_expr(object),
                member: member.clone(),
                arrow: false,
            },
            ParseNode::PointerMemberAccess { object, member, .. } => NodeKind::Member {
                object: self.lower_expr(object),
                member: member.clone(),
                arrow: true,
            },
            ParseNode::Cast {
                type_tokens, expr, ..
            } => NodeKind::Cast {
                type_tokens: *type_tokens,
                expr: self.lower_expr(expr),
            },
            ParseNode::SizeofType { type_tokens, .. } => NodeKind::SizeofType {
                type_tokens: *type_tokens,
            },
            ParseNode::SizeofExpr { expr, .. } => NodeKind::SizeofExpr {
                expr: self.lower_expr(expr),
            },
            ParseNode::InitList { .. } => NodeKind::InitList,
            _ => {
                self.ctx.error(tokens, "expected an expression");
                NodeKind::InitList
            }
        };
        self.tree.push(kind, tokens)
    }
}
