//! Emission planning
//!
//! Walks the function once and records the splice edits that turn it into a
//! resumable state machine:
//!
//! - bind the record pointer at the top of the body, after appending the
//!   opaque state parameter when the signature lacks it
//! - dispatch on the resume counter right after the prologue declarations
//! - split each boundary into start, counter store, suspend and a labelled
//!   completion check
//! - route every use of an escaping local through the record
//! - reset the counter before every exit
//!
//! Unbraced branch and loop bodies that gain statements are wrapped in braces.

use crate::analysis::{Boundaries, CallSite, Handle, Liveness};
use crate::catalog::render_template;
use crate::compiler::context::CompilerCtx;
use crate::compiler::options::Options;
use crate::emit::splice::Rewriter;
use crate::parser::cst::{Program, TokenIndex, TokenRange};
use crate::parser::lexer::Token;
use crate::states::record::{PersistentRecord, COUNTER_FIELD};
use crate::syntax::tree::{NodeId, NodeKind, Tree};
use crate::syntax::visit::{visit_node, walk_children, Visitor};
use rustc_hash::FxHashMap;
use tracing::debug;

/// Local name of the record pointer in the rewritten function
pub const STATE_POINTER: &str = "sa_state";

/// Analysis results the planner reads
pub struct PlanInputs<'p> {
    pub tree: &'p Tree,
    pub boundaries: &'p Boundaries,
    pub liveness: &'p Liveness,
    pub record: &'p PersistentRecord,
    pub options: &'p Options,
}

struct Planner<'p, 'c, 'a> {
    ctx: &'c mut CompilerCtx<'a>,
    program: &'a Program,
    source: &'a str,
    rewriter: Rewriter<'a>,
    inputs: PlanInputs<'p>,
    returns_void: bool,
    /// Variable tokens that read or write through the record
    substitutions: FxHashMap<TokenIndex, String>,
}

/// Collect the edits for one function
pub fn plan<'a>(ctx: &mut CompilerCtx<'a>, source: &'a str, inputs: PlanInputs<'_>) -> Rewriter<'a> {
    let program = ctx.program;
    let tree = inputs.tree;

    let mut substitutions = FxHashMap::default();
    for id in tree.ids() {
        if let NodeKind::Var {
            decl: Some(decl), ..
        } = tree.kind(id)
        {
            if let Some(field) = inputs.record.field_for(*decl) {
                substitutions.insert(
                    tree.tokens(id).start,
                    format!("({}->{})", STATE_POINTER, field.name),
                );
            }
        }
    }

    let mut planner = Planner {
        ctx,
        program,
        source,
        rewriter: Rewriter::new(source, program),
        returns_void: returns_void(program, tree),
        substitutions,
        inputs,
    };
    planner.check_reserved_names();
    planner.check_status_type();
    visit_node(&mut planner, tree, tree.root());

    debug!(
        function = tree.function_name(),
        "planned {} edit(s)",
        planner.rewriter.len()
    );
    planner.rewriter
}

/// `void` return type without a pointer declarator
fn returns_void(program: &Program, tree: &Tree) -> bool {
    let NodeKind::Function { name_token, .. } = tree.kind(tree.root()) else {
        return false;
    };
    let head = &program.tokens[tree.tokens(tree.root()).start..*name_token];
    head.iter().any(|token| matches!(token, Token::Void(_)))
        && !head.iter().any(|token| matches!(token, Token::Star(_)))
}

impl Planner<'_, '_, '_> {
    fn tree(&self) -> &Tree {
        self.inputs.tree
    }

    fn check_reserved_names(&mut self) {
        let tree = self.inputs.tree;
        let state_param = self.inputs.options.state_param.as_str();
        let has_state_param = tree
            .params()
            .iter()
            .any(|&param| tree.decl_name(param) == Some(state_param));

        for id in tree.ids() {
            match tree.kind(id) {
                NodeKind::VarDecl { name, .. } | NodeKind::Param { name, .. } if name == STATE_POINTER => {
                    self.ctx.error(
                        tree.tokens(id),
                        format!("`{}` is reserved for the generated record pointer", STATE_POINTER),
                    );
                }
                NodeKind::VarDecl { name, .. } if name == state_param && !has_state_param => {
                    self.ctx.error(
                        tree.tokens(id),
                        format!("`{}` is reserved for the appended state parameter", state_param),
                    );
                }
                NodeKind::Label { name } if is_generated_label(name) => {
                    self.ctx.error(
                        tree.tokens(id),
                        format!("label `{}` collides with a generated resume label", name),
                    );
                }
                _ => {}
            }
        }
    }

    /// A `void` handler has no status to tell its caller why it returned
    fn check_status_type(&mut self) {
        if !self.returns_void || self.inputs.boundaries.is_empty() {
            return;
        }
        let tree = self.inputs.tree;
        let NodeKind::Function { name_token, .. } = tree.kind(tree.root()) else {
            return;
        };
        self.ctx.warning(
            TokenRange::single(*name_token),
            format!(
                "`{}` returns void: waiting, completion and an unknown resume point all look the same to the caller",
                tree.function_name()
            ),
        );
    }

    fn waiting_return(&self) -> String {
        if self.returns_void {
            "return;".to_string()
        } else {
            format!("return {};", self.inputs.options.waiting_status)
        }
    }

    fn failure_return(&self) -> String {
        if self.returns_void {
            "return;".to_string()
        } else {
            format!("return {};", self.inputs.options.failure_status)
        }
    }

    fn marker(&self, after: TokenIndex) -> String {
        if self.inputs.options.line_markers {
            format!("\n//#line {}\n", self.program.location(after).line + 1)
        } else {
            String::new()
        }
    }

    /// Source text of a token range with escaping variables rewritten
    fn render(&self, range: TokenRange) -> String {
        let mut out = String::new();
        for index in range.start..=range.stop {
            if index > range.start {
                let gap = self.program.location(index - 1).end()..self.program.location(index).offset;
                out.push_str(&self.source[gap]);
            }
            match self.substitutions.get(&index) {
                Some(text) => out.push_str(text),
                None => out.push_str(self.program.text(self.source, index)),
            }
        }
        out
    }

    fn add_state_param(&mut self, param_list: TokenRange, params: &[NodeId]) {
        let state_param = &self.inputs.options.state_param;
        let param = format!("void* {}", state_param);
        let (open, close) = (param_list.start, param_list.stop);
        if is_identifier_list(self.tree(), params) {
            // Old-style definition: the type goes in the declaration list
            self.rewriter.insert_before(close, format!(", {}", state_param));
            self.rewriter.insert_after(close, format!("\n{};\n", param));
        } else if close == open + 1 {
            self.rewriter.insert_before(close, param);
        } else if close == open + 2 && matches!(self.program.tokens[open + 1], Token::Void(_)) {
            self.rewriter.replace(TokenRange::single(open + 1), param);
        } else {
            self.rewriter.insert_before(close, format!(", {}", param));
        }
    }

    fn dispatch(&self, anchor: TokenIndex) -> String {
        let mut text = format!("\nswitch ({}->{}) {{\n", STATE_POINTER, COUNTER_FIELD);
        for state in 0..self.inputs.liveness.state_count() {
            text.push_str(&format!("case {}: goto label_{};\n", state, state));
        }
        text.push_str(&format!(
            "default: {}->{} = 0; {}\n}}\nlabel_0:\n{}->{} = 0;",
            STATE_POINTER,
            COUNTER_FIELD,
            self.failure_return(),
            STATE_POINTER,
            COUNTER_FIELD
        ));
        text.push_str(&self.marker(anchor));
        text
    }

    /// The statements that replace or follow a blocking call
    fn suspension(&self, site: &CallSite, state: u32, args: &[String]) -> String {
        let handle = match &site.handle {
            Handle::Argument { arg, .. } => self.render(self.tree().tokens(*arg)),
            Handle::Parameter { name, .. } => name.clone(),
        };
        let waiting = self.waiting_return();

        let mut text = String::new();
        if let Some(register) = &site.primitive.register {
            text.push_str(&format!("\n{};", render_template(register, &handle, args)));
        }
        text.push_str(&format!(
            "\n{}->{} = {};\n{}\nlabel_{}:\nif ({}) {}",
            STATE_POINTER,
            COUNTER_FIELD,
            state,
            waiting,
            state,
            render_template(&site.primitive.pending, &handle, args),
            waiting
        ));
        text.push_str(&self.marker(self.tree().tokens(site.stmt).stop));
        text
    }

    fn emit_boundary(&mut self, stmt: NodeId, site: &CallSite) {
        let Some(state) = self.inputs.liveness.opened_by(stmt) else {
            return;
        };
        let tree = self.inputs.tree;
        let args: Vec<String> = site
            .args
            .iter()
            .map(|&arg| self.render(tree.tokens(arg)))
            .collect();
        let text = self.suspension(site, state, &args);
        let range = tree.tokens(stmt);

        match &site.primitive.start {
            Some(start) => {
                self.rewriter
                    .replace(TokenRange::single(site.callee_token), start.clone());
                for &arg in &site.args {
                    visit_node(self, tree, arg);
                }
                self.rewriter.insert_after(range.stop, text);
            }
            None => {
                self.rewriter
                    .replace(range, text.trim_start_matches('\n').to_string());
            }
        }
    }

    /// Body of an `if`, `else` or loop, braced when it gains statements
    fn visit_arm(&mut self, tree: &Tree, arm: NodeId) {
        let expands = match tree.kind(arm) {
            NodeKind::Return { .. } => true,
            NodeKind::ExprStmt { .. } => self.inputs.boundaries.site_for(arm).is_some(),
            _ => false,
        };
        if !expands {
            visit_node(self, tree, arm);
            return;
        }
        let range = tree.tokens(arm);
        self.rewriter.insert_before(range.start, "{ ");
        visit_node(self, tree, arm);
        self.rewriter.insert_after(range.stop, " }");
    }
}

/// `f(a, b)` with untyped parameters
fn is_identifier_list(tree: &Tree, params: &[NodeId]) -> bool {
    !params.is_empty()
        && params.iter().all(|&param| {
            let range = tree.tokens(param);
            matches!(tree.kind(param), NodeKind::Param { name_token: Some(token), .. }
                if range.start == range.stop && range.start == *token)
        })
}

fn is_generated_label(name: &str) -> bool {
    name.strip_prefix("label_")
        .is_some_and(|rest| !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit()))
}

impl Visitor for Planner<'_, '_, '_> {
    fn default_visit(&mut self, tree: &Tree, id: NodeId) {
        self.ctx.error(
            tree.tokens(id),
            format!("cannot emit {}", tree.kind(id).describe()),
        );
    }

    fn visit_function(&mut self, tree: &Tree, id: NodeId) {
        let NodeKind::Function {
            params,
            param_list,
            body,
            ..
        } = tree.kind(id)
        else {
            return;
        };
        let options = self.inputs.options;

        let has_state_param = params
            .iter()
            .any(|&param| tree.decl_name(param) == Some(options.state_param.as_str()));
        if !has_state_param {
            self.add_state_param(*param_list, params);
        }

        let body_range = tree.tokens(*body);
        let type_name = &self.inputs.record.type_name;
        self.rewriter.insert_after(
            body_range.start,
            format!(
                "\n{}* {} = ({}*){};",
                type_name, STATE_POINTER, type_name, options.state_param
            ),
        );

        let anchor = self
            .inputs
            .liveness
            .prologue()
            .last()
            .map(|&stmt| tree.tokens(stmt).stop)
            .unwrap_or(body_range.start);
        let dispatch = self.dispatch(anchor);
        self.rewriter.insert_after(anchor, dispatch);

        visit_node(self, tree, *body);

        if !self.inputs.liveness.exit().is_empty() {
            self.rewriter.insert_before(
                body_range.stop,
                format!("{}->{} = 0;\n", STATE_POINTER, COUNTER_FIELD),
            );
        }
    }

    fn visit_block(&mut self, tree: &Tree, id: NodeId) {
        walk_children(self, tree, id);
    }

    fn visit_decl_stmt(&mut self, tree: &Tree, id: NodeId) {
        let NodeKind::DeclStmt {
            specifiers, decls, ..
        } = tree.kind(id)
        else {
            return;
        };
        let persistent = match decls.as_slice() {
            [decl] => self.inputs.record.field_for(*decl).map(|field| (*decl, field.name.clone())),
            _ => None,
        };
        let Some((decl, field)) = persistent else {
            walk_children(self, tree, id);
            return;
        };

        let NodeKind::VarDecl {
            name_token, init, ..
        } = tree.kind(decl)
        else {
            return;
        };
        match init {
            Some(init) => {
                self.rewriter.replace(
                    TokenRange::new(specifiers.start, *name_token),
                    format!("{}->{}", STATE_POINTER, field),
                );
                visit_node(self, tree, *init);
            }
            None => self.rewriter.delete(tree.tokens(id)),
        }
    }

    fn visit_var_decl(&mut self, tree: &Tree, id: NodeId) {
        walk_children(self, tree, id);
    }

    fn visit_expr_stmt(&mut self, tree: &Tree, id: NodeId) {
        match self.inputs.boundaries.site_for(id) {
            Some(site) => {
                let site = site.clone();
                self.emit_boundary(id, &site);
            }
            None => walk_children(self, tree, id),
        }
    }

    fn visit_empty(&mut self, _tree: &Tree, _id: NodeId) {}

    fn visit_return(&mut self, tree: &Tree, id: NodeId) {
        self.rewriter.insert_before(
            tree.tokens(id).start,
            format!("{}->{} = 0; ", STATE_POINTER, COUNTER_FIELD),
        );
        walk_children(self, tree, id);
    }

    fn visit_if(&mut self, tree: &Tree, id: NodeId) {
        let NodeKind::If {
            condition,
            then_branch,
            else_branch,
        } = tree.kind(id)
        else {
            return;
        };
        visit_node(self, tree, *condition);
        self.visit_arm(tree, *then_branch);
        if let Some(else_branch) = else_branch {
            self.visit_arm(tree, *else_branch);
        }
    }

    fn visit_loop(&mut self, tree: &Tree, id: NodeId) {
        match tree.kind(id) {
            NodeKind::While { condition, body } => {
                visit_node(self, tree, *condition);
                self.visit_arm(tree, *body);
            }
            NodeKind::DoWhile { body, condition } => {
                self.visit_arm(tree, *body);
                visit_node(self, tree, *condition);
            }
            NodeKind::For {
                init,
                condition,
                increment,
                body,
            } => {
                for &part in init.iter().chain(condition).chain(increment) {
                    visit_node(self, tree, part);
                }
                self.visit_arm(tree, *body);
            }
            _ => {}
        }
    }

    fn visit_switch(&mut self, tree: &Tree, id: NodeId) {
        walk_children(self, tree, id);
    }

    fn visit_case(&mut self, tree: &Tree, id: NodeId) {
        walk_children(self, tree, id);
    }

    fn visit_jump(&mut self, _tree: &Tree, _id: NodeId) {}

    fn visit_label(&mut self, _tree: &Tree, _id: NodeId) {}

    fn visit_expr(&mut self, tree: &Tree, id: NodeId) {
        if matches!(tree.kind(id), NodeKind::Var { .. }) {
            let token = tree.tokens(id).start;
            if let Some(text) = self.substitutions.get(&token) {
                self.rewriter.replace(TokenRange::single(token), text.clone());
            }
            return;
        }
        walk_children(self, tree, id);
    }
}
