use crate::analysis::Liveness;
use crate::parser::cst::Program;
use crate::parser::lexer::Token;
use crate::syntax::tree::{NodeId, NodeKind, Tree};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Name of the resume-counter field, always the record's first member
pub const COUNTER_FIELD: &str = "sa_next";

/// Width of the resume counter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterType {
    U8,
    U16,
}

impl CounterType {
    pub fn for_states(count: usize) -> Self {
        if count > u8::MAX as usize + 1 {
            CounterType::U16
        } else {
            CounterType::U8
        }
    }

    pub fn c_name(&self) -> &'static str {
        match self {
            CounterType::U8 => "uint8_t",
            CounterType::U16 => "uint16_t",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordField {
    pub name: String,
    pub decl: NodeId,
    /// Member declaration as written into the record, e.g. `uint16_t response;`
    pub declaration: String,
}

/// Layout of the struct that holds a suspended invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentRecord {
    pub type_name: String,
    pub counter: CounterType,
    pub fields: Vec<RecordField>,
}

impl PersistentRecord {
    /// One field per escaping local, in declaration order
    ///
    /// `register` and `static` are dropped, as is a `const` on the variable
    /// itself since the record member is assigned after its declaration. A
    /// `const` on a pointee stays. A name already taken by the counter or an
    /// earlier field gets a numeric suffix.
    pub fn build(
        program: &Program,
        source: &str,
        tree: &Tree,
        liveness: &Liveness,
        state_count: usize,
        type_name: &str,
    ) -> Self {
        let mut taken: FxHashSet<String> = FxHashSet::default();
        taken.insert(COUNTER_FIELD.to_string());

        let mut fields = Vec::new();
        for &decl in liveness.escaping() {
            let NodeKind::VarDecl {
                name,
                name_token,
                declarator,
                ..
            } = tree.kind(decl)
            else {
                continue;
            };

            let mut field_name = name.clone();
            let mut suffix = 1;
            while taken.contains(&field_name) {
                field_name = format!("{}_{}", name, suffix);
                suffix += 1;
            }
            taken.insert(field_name.clone());

            let last_star = (declarator.start..=declarator.stop)
                .rev()
                .find(|&index| matches!(program.tokens[index], Token::Star(_)));

            let specifiers = owning_declaration(tree, decl)
                .map(|range| {
                    (range.start..=range.stop)
                        .filter(|&index| match program.tokens[index] {
                            Token::Register(_) | Token::Static(_) => false,
                            Token::Const(_) => last_star.is_some(),
                            _ => true,
                        })
                        .map(|index| program.text(source, index))
                        .collect::<Vec<_>>()
                        .join(" ")
                })
                .unwrap_or_else(|| "int".to_string());

            let declarator_text: String = (declarator.start..=declarator.stop)
                .filter(|&index| {
                    !(matches!(program.tokens[index], Token::Const(_))
                        && last_star.is_some_and(|star| index > star))
                })
                .map(|index| {
                    if index == *name_token {
                        field_name.as_str()
                    } else {
                        program.text(source, index)
                    }
                })
                .collect();

            fields.push(RecordField {
                declaration: format!("{} {};", specifiers, declarator_text),
                name: field_name,
                decl,
            });
        }

        debug!(
            type_name,
            "persistent record with {} field(s)",
            fields.len()
        );

        Self {
            type_name: type_name.to_string(),
            counter: CounterType::for_states(state_count),
            fields,
        }
    }

    pub fn field_for(&self, decl: NodeId) -> Option<&RecordField> {
        self.fields.iter().find(|field| field.decl == decl)
    }
}

/// Specifier tokens of the declaration statement holding `decl`
fn owning_declaration(tree: &Tree, decl: NodeId) -> Option<crate::parser::cst::TokenRange> {
    tree.ids().find_map(|id| match tree.kind(id) {
        NodeKind::DeclStmt {
            specifiers, decls, ..
        } if decls.contains(&decl) => Some(*specifiers),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{analyze, find_boundaries};
    use crate::catalog::Catalog;
    use crate::compiler::context::CompilerCtx;
    use crate::parser::parse;
    use crate::syntax::lower::lower_function;

    fn record_of(source: &str) -> PersistentRecord {
        let program = parse(source).unwrap();
        let mut ctx = CompilerCtx::new(&program);
        let tree = lower_function(&mut ctx, program.functions().last().unwrap());
        let boundaries = find_boundaries(&mut ctx, &tree, &Catalog::builtin());
        let liveness = analyze(&mut ctx, &tree, &boundaries);
        assert!(!ctx.failed());
        PersistentRecord::build(
            &program,
            source,
            &tree,
            &liveness,
            liveness.state_count() as usize,
            "f_state_t",
        )
    }

    #[test]
    fn test_field_declarations() {
        let record = record_of(
            "void f(h) { const unsigned long *p; char buf[16]; p = 0; wait_op(h, 1); use(p, buf); }",
        );
        let declarations: Vec<&str> = record.fields.iter().map(|f| f.declaration.as_str()).collect();
        assert_eq!(declarations, vec!["const unsigned long *p;", "char buf[16];"]);
        assert_eq!(record.counter, CounterType::U8);
    }

    #[test]
    fn test_only_top_level_const_is_dropped() {
        let record = record_of(
            "void f(h) { const char *const s = name(); const int n = count(); wait_op(h, 1); use(s, n); }",
        );
        let declarations: Vec<&str> = record.fields.iter().map(|f| f.declaration.as_str()).collect();
        assert_eq!(declarations, vec!["const char *s;", "int n;"]);
    }

    #[test]
    fn test_name_collisions() {
        let record = record_of(
            "void f(h) { int sa_next; sa_next = 1; { int x; x = 2; wait_op(h, 1); use(x, sa_next); } }",
        );
        let names: Vec<&str> = record.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["sa_next_1", "x"]);
    }

    #[test]
    fn test_counter_width() {
        assert_eq!(CounterType::for_states(256), CounterType::U8);
        assert_eq!(CounterType::for_states(257), CounterType::U16);
        assert_eq!(CounterType::U16.c_name(), "uint16_t");
    }
}
