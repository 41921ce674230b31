//! Schema operations from Alembic migration scripts.
//!
//! Every `op.<operation>(...)` call inside a module-level `upgrade()` becomes
//! one symbol. Migrations that already existed at the base reference produce
//! identical symbols on both sides, so only operations introduced between
//! the two references show up in a diff.

use std::collections::HashMap;

use tree_sitter::Node;

use super::helpers::{
    bool_literal, call_name, descendants_of_kind, get_node_text, get_start_line, keyword_arg,
    positional_args, split_decorated, statements, string_literal,
};
use super::{extract_python, Extractor, PythonUnit, UnitOutput};
use crate::model::{Extraction, Symbol, SymbolKind};
use crate::snapshot::Snapshot;
use crate::surface::SurfaceFilter;

/// Operations that change the schema.
pub const OPERATIONS: &[&str] = &[
    "add_column",
    "drop_column",
    "create_index",
    "drop_index",
    "create_table",
    "drop_table",
];

/// Extractor for the `migrations` domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct MigrationExtractor;

impl Extractor for MigrationExtractor {
    fn extract(&self, snapshot: &Snapshot, surface: &dyn SurfaceFilter) -> Extraction {
        extract_python(snapshot, surface, extract_unit)
    }
}

fn extract_unit(unit: &PythonUnit, root: Node, surface: &dyn SurfaceFilter) -> UnitOutput {
    let mut output = UnitOutput::default();
    let mut seen: HashMap<String, u32> = HashMap::new();

    let upgrade = statements(&root)
        .into_iter()
        .filter_map(|stmt| split_decorated(&stmt).1)
        .find(|def| {
            def.kind() == "function_definition"
                && def
                    .child_by_field_name("name")
                    .map(|n| get_node_text(&n, unit.source) == "upgrade")
                    .unwrap_or(false)
        });
    let Some(body) = upgrade.and_then(|def| def.child_by_field_name("body")) else {
        return output;
    };

    for call in descendants_of_kind(&body, "call") {
        let Some(callee) = call_name(&call, unit.source) else {
            continue;
        };
        let Some(("op", operation)) = callee.split_once('.') else {
            continue;
        };
        if !OPERATIONS.contains(&operation) {
            continue;
        }

        let line = get_start_line(&call);
        let (target, complete) = operation_target(&call, operation, unit.source);
        if !complete {
            output.diagnostic(
                unit.path,
                line,
                format!("Target of op.{} is not fully literal", operation),
            );
        }

        let base = format!("{}:{}({})", unit.path, operation, target);
        let count = seen.entry(base.clone()).or_insert(0);
        *count += 1;
        let name = if *count == 1 {
            base
        } else {
            format!("{}#{}", base, count)
        };
        if !surface.is_public(&name) {
            continue;
        }

        let required = operation == "add_column" && is_non_nullable(&call, unit.source);
        output.symbol(
            Symbol::new(name, SymbolKind::MigrationOp)
                .with_return_shape(Some(operation.to_string()))
                .required(required),
        );
    }

    output
}

/// Dotted `table.object` target of an operation, and whether every part was
/// a string literal.
fn operation_target(call: &Node, operation: &str, source: &str) -> (String, bool) {
    let args = positional_args(call);
    let literal = |index: usize| args.get(index).and_then(|a| string_literal(a, source));

    let parts: Vec<Option<String>> = match operation {
        "add_column" => {
            let column = column_call(call, source).and_then(|c| {
                positional_args(&c)
                    .first()
                    .and_then(|a| string_literal(a, source))
            });
            vec![literal(0), column]
        }
        "drop_column" => vec![literal(0), literal(1)],
        "create_index" => vec![literal(1), literal(0)],
        "drop_index" => {
            let table =
                keyword_arg(call, "table_name", source).and_then(|t| string_literal(&t, source));
            match table {
                Some(table) => vec![Some(table), literal(0)],
                None => vec![literal(0)],
            }
        }
        _ => vec![literal(0)],
    };

    let complete = parts.iter().all(Option::is_some);
    let target = parts
        .into_iter()
        .map(|p| p.unwrap_or_else(|| "?".to_string()))
        .collect::<Vec<_>>()
        .join(".");
    (target, complete)
}

/// The `Column(...)` argument of an `add_column` call.
fn column_call<'a>(call: &Node<'a>, source: &str) -> Option<Node<'a>> {
    positional_args(call).into_iter().find(|arg| {
        call_name(arg, source)
            .map(|name| name == "Column" || name.ends_with(".Column"))
            .unwrap_or(false)
    })
}

/// A column is non-nullable when it declares `nullable=False` without any
/// default.
fn is_non_nullable(call: &Node, source: &str) -> bool {
    let Some(column) = column_call(call, source) else {
        return false;
    };
    let nullable = keyword_arg(&column, "nullable", source)
        .and_then(|n| bool_literal(&n))
        .unwrap_or(true);
    let has_default = keyword_arg(&column, "default", source).is_some()
        || keyword_arg(&column, "server_default", source).is_some();
    !nullable && !has_default
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::Everything;

    const PATH: &str = "migrations/versions/002_users.py";

    fn extract(source: &str) -> Extraction {
        let mut snapshot = Snapshot::new("HEAD", &["migrations".to_string()]);
        snapshot.insert(PATH, source);
        MigrationExtractor.extract(&snapshot, &Everything)
    }

    #[test]
    fn test_upgrade_operations() {
        let extraction = extract(
            r#"
import sqlalchemy as sa
from alembic import op

def upgrade():
    op.add_column("users", sa.Column("email", sa.String(), nullable=False))
    op.add_column("users", sa.Column("nick", sa.String()))
    op.create_index("ix_users_email", "users", ["email"])
    op.drop_column("users", "legacy")
    op.alter_column("users", "name")

def downgrade():
    op.drop_column("users", "email")
"#,
        );

        let names: Vec<&str> = extraction.model.names().collect();
        assert_eq!(
            names,
            vec![
                "migrations/versions/002_users.py:add_column(users.email)",
                "migrations/versions/002_users.py:add_column(users.nick)",
                "migrations/versions/002_users.py:create_index(users.ix_users_email)",
                "migrations/versions/002_users.py:drop_column(users.legacy)",
            ]
        );

        let email = extraction
            .model
            .get("migrations/versions/002_users.py:add_column(users.email)")
            .unwrap();
        assert!(email.required);
        assert_eq!(email.return_shape.as_deref(), Some("add_column"));
        let nick = extraction
            .model
            .get("migrations/versions/002_users.py:add_column(users.nick)")
            .unwrap();
        assert!(!nick.required);
    }

    #[test]
    fn test_server_default_keeps_column_nullable() {
        let extraction = extract(
            r#"
def upgrade():
    op.add_column("t", sa.Column("c", sa.Integer(), nullable=False, server_default="0"))
"#,
        );
        let symbol = extraction.model.symbols().next().unwrap();
        assert!(!symbol.required);
    }

    #[test]
    fn test_non_literal_target_is_reported() {
        let extraction = extract(
            r#"
def upgrade():
    op.drop_table(TABLE)
    op.drop_table(TABLE)
"#,
        );

        let names: Vec<&str> = extraction.model.names().collect();
        assert_eq!(
            names,
            vec![
                "migrations/versions/002_users.py:drop_table(?)",
                "migrations/versions/002_users.py:drop_table(?)#2",
            ]
        );
        assert_eq!(extraction.diagnostics.len(), 2);
    }
}
