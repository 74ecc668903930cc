use crate::analysis::{analyze, find_boundaries};
use crate::catalog::Catalog;
use crate::check::{check_graph, check_tree};
use crate::compiler::context::{CompilerCtx, Diagnostic, Stage};
use crate::compiler::errors::CompileError;
use crate::compiler::options::Options;
use crate::emit::header::render_header;
use crate::emit::planner::{plan, PlanInputs};
use crate::parser::cst::{ParseNode, Program, TokenRange};
use crate::parser::lexer::Token;
use crate::parser::parse;
use crate::states::{decompose, PersistentRecord, StateGraph};
use crate::syntax::lower::lower_function;
use tracing::{debug, info};

/// Result of transforming one function
#[derive(Debug, Clone)]
pub struct Compilation {
    pub function: String,
    /// The whole translation unit with the function rewritten
    pub source: String,
    /// Header declaring the persistent record
    pub header: String,
    pub graph: StateGraph,
    pub record: PersistentRecord,
    /// Warnings; errors abort the compilation instead
    pub diagnostics: Vec<Diagnostic>,
}

/// Rewrite the blocking function in `source` into a resumable one
pub fn compile(source: &str, catalog: &Catalog, options: &Options) -> Result<Compilation, CompileError> {
    let program = parse(source)?;
    let mut ctx = CompilerCtx::new(&program);

    let target = select_function(&mut ctx, catalog, options);
    ctx.complete(Stage::Selected)?;
    let Some(function) = target else {
        return Err(CompileError::Failed {
            stage: Stage::Selected,
            diagnostics: ctx.into_diagnostics(),
        });
    };
    info!(function = function_name(function), "transforming");

    ctx.require(Stage::Selected)?;
    let tree = lower_function(&mut ctx, function);
    ctx.complete(Stage::Lowered)?;

    ctx.require(Stage::Lowered)?;
    check_tree(&mut ctx, &tree);
    ctx.complete(Stage::Validated)?;

    ctx.require(Stage::Validated)?;
    let boundaries = find_boundaries(&mut ctx, &tree, catalog);
    ctx.complete(Stage::BoundaryAnalyzed)?;

    ctx.require(Stage::BoundaryAnalyzed)?;
    let liveness = analyze(&mut ctx, &tree, &boundaries);
    ctx.complete(Stage::LivenessAnalyzed)?;

    ctx.require(Stage::LivenessAnalyzed)?;
    let graph = decompose(&tree, &boundaries, &liveness);
    check_graph(&mut ctx, &tree, &boundaries, &graph);
    ctx.complete(Stage::Decomposed)?;

    ctx.require(Stage::Decomposed)?;
    let type_name = options.record_type(tree.function_name());
    let record = PersistentRecord::build(
        &program,
        source,
        &tree,
        &liveness,
        graph.len(),
        &type_name,
    );
    let rewriter = plan(
        &mut ctx,
        source,
        PlanInputs {
            tree: &tree,
            boundaries: &boundaries,
            liveness: &liveness,
            record: &record,
            options,
        },
    );
    ctx.complete(Stage::Emitted)?;

    let output = rewriter.finish()?;
    let header = render_header(&record, &options.include_guard(&type_name));
    debug!(
        bytes_in = source.len(),
        bytes_out = output.len(),
        "emitted {}",
        tree.function_name()
    );

    Ok(Compilation {
        function: tree.function_name().to_string(),
        source: output,
        header,
        graph,
        record,
        diagnostics: ctx.into_diagnostics(),
    })
}

fn function_name(function: &ParseNode) -> &str {
    match function {
        ParseNode::FunctionDef { name, .. } => name,
        _ => "",
    }
}

/// The named function, or the only one that calls a catalogued primitive
fn select_function<'a>(
    ctx: &mut CompilerCtx<'a>,
    catalog: &Catalog,
    options: &Options,
) -> Option<&'a ParseNode> {
    let program: &'a Program = ctx.program;
    let whole_unit = TokenRange::single(program.tokens.len().saturating_sub(1));

    if let Some(wanted) = &options.function {
        let found = program
            .functions()
            .find(|function| function_name(function) == wanted.as_str());
        if found.is_none() {
            ctx.error(whole_unit, format!("no function named `{}`", wanted));
        }
        return found;
    }

    let candidates: Vec<&ParseNode> = program
        .functions()
        .filter(|function| calls_primitive(program, catalog, function))
        .collect();
    match candidates.as_slice() {
        [only] => Some(*only),
        [] => {
            ctx.error(
                whole_unit,
                "no function calls a blocking primitive; name the function to transform explicitly",
            );
            None
        }
        several => {
            let names: Vec<&str> = several.iter().map(|function| function_name(function)).collect();
            ctx.error(
                several[1].tokens(),
                format!(
                    "several functions call blocking primitives ({}); name the function to transform explicitly",
                    names.join(", ")
                ),
            );
            None
        }
    }
}

fn calls_primitive(program: &Program, catalog: &Catalog, function: &ParseNode) -> bool {
    let ParseNode::FunctionDef { body_tokens, .. } = function else {
        return false;
    };
    let body = &program.tokens[body_tokens.start..=body_tokens.stop];
    body.windows(2).any(|pair| {
        matches!(
            pair,
            [Token::Ident(name, _), Token::LParen(_)] if catalog.contains(name)
        )
    })
}
