//! Function and method signatures from Python sources.
//!
//! Every function and method reachable from a module's top level becomes a
//! symbol named `module:func` or `module:Class.method` (nested classes extend
//! the dotted part). Definitions nested inside function bodies are not part
//! of the interface and are skipped.

use std::collections::{BTreeMap, BTreeSet};

use tree_sitter::Node;

use super::helpers::{
    get_node_text, get_start_line, named_children, normalize_annotation, split_decorated,
    statements, string_literal,
};
use super::{extract_python, Extractor, PythonUnit, UnitOutput};
use crate::model::{Extraction, ParamKind, Parameter, Symbol, SymbolKind};
use crate::snapshot::Snapshot;
use crate::surface::SurfaceFilter;

/// Compound statements whose bodies still execute at module or class level.
const CONTAINERS: &[&str] = &[
    "if_statement",
    "elif_clause",
    "else_clause",
    "try_statement",
    "except_clause",
    "finally_clause",
    "with_statement",
    "block",
];

/// Extractor for the `signatures` domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignatureExtractor;

impl Extractor for SignatureExtractor {
    fn extract(&self, snapshot: &Snapshot, surface: &dyn SurfaceFilter) -> Extraction {
        extract_python(snapshot, surface, extract_unit)
    }
}

fn extract_unit(unit: &PythonUnit, root: Node, surface: &dyn SurfaceFilter) -> UnitOutput {
    let mut output = UnitOutput::default();
    let exports = parse_exports(unit, &root, &mut output);

    let mut walker = Walker {
        unit,
        exports: exports.as_ref(),
        found: BTreeMap::new(),
    };
    walker.visit_scope(&root, None);

    // Later definitions rebind the name, as they would at import time
    for (_, symbol) in walker.found {
        if surface.is_public(&symbol.qualified_name) {
            output.symbol(symbol);
        }
    }
    output
}

/// Names listed in a literal module-level `__all__`.
fn parse_exports(
    unit: &PythonUnit,
    root: &Node,
    output: &mut UnitOutput,
) -> Option<BTreeSet<String>> {
    for stmt in statements(root) {
        if stmt.kind() != "expression_statement" {
            continue;
        }
        let Some(assignment) = named_children(&stmt).into_iter().next() else {
            continue;
        };
        if assignment.kind() != "assignment" {
            continue;
        }
        let is_all = assignment
            .child_by_field_name("left")
            .map(|l| l.kind() == "identifier" && get_node_text(&l, unit.source) == "__all__")
            .unwrap_or(false);
        if !is_all {
            continue;
        }

        let line = get_start_line(&assignment);
        let Some(value) = assignment.child_by_field_name("right") else {
            continue;
        };
        if !matches!(value.kind(), "list" | "tuple") {
            output.diagnostic(unit.path, line, "__all__ is not a literal list; ignored");
            return None;
        }

        let mut names = BTreeSet::new();
        for element in named_children(&value) {
            match string_literal(&element, unit.source) {
                Some(name) => {
                    names.insert(name);
                }
                None => output.diagnostic(
                    unit.path,
                    get_start_line(&element),
                    "Non-literal entry in __all__ ignored",
                ),
            }
        }
        return Some(names);
    }
    None
}

struct Walker<'u, 'a> {
    unit: &'u PythonUnit<'a>,
    exports: Option<&'u BTreeSet<String>>,
    found: BTreeMap<String, Symbol>,
}

impl Walker<'_, '_> {
    /// Visit the statements of a module (`class_path` is `None`) or class body.
    fn visit_scope(&mut self, scope: &Node, class_path: Option<&str>) {
        for stmt in statements(scope) {
            let (_, definition) = split_decorated(&stmt);
            let Some(definition) = definition else {
                continue;
            };

            match definition.kind() {
                "function_definition" => self.visit_function(&definition, class_path),
                "class_definition" => self.visit_class(&definition, class_path),
                kind if CONTAINERS.contains(&kind) => self.visit_scope(&definition, class_path),
                _ => {}
            }
        }
    }

    fn local_name(&self, node: &Node) -> Option<String> {
        node.child_by_field_name("name")
            .map(|n| get_node_text(&n, self.unit.source).to_string())
            .filter(|n| !n.is_empty())
    }

    fn is_exported(&self, name: &str, class_path: Option<&str>) -> bool {
        match (class_path, self.exports) {
            (None, Some(exports)) => exports.contains(name),
            _ => true,
        }
    }

    fn visit_class(&mut self, node: &Node, class_path: Option<&str>) {
        let Some(name) = self.local_name(node) else {
            return;
        };
        if !self.is_exported(&name, class_path) {
            return;
        }

        let path = match class_path {
            Some(outer) => format!("{}.{}", outer, name),
            None => name,
        };
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_scope(&body, Some(&path));
        }
    }

    fn visit_function(&mut self, node: &Node, class_path: Option<&str>) {
        let Some(name) = self.local_name(node) else {
            return;
        };
        if !self.is_exported(&name, class_path) {
            return;
        }

        let (qualified_name, kind) = match class_path {
            Some(class) => (
                format!("{}:{}.{}", self.unit.module, class, name),
                SymbolKind::Method,
            ),
            None => (format!("{}:{}", self.unit.module, name), SymbolKind::Function),
        };

        let signature = node
            .child_by_field_name("parameters")
            .map(|p| extract_parameters(&p, self.unit.source))
            .unwrap_or_default();
        let returns = node
            .child_by_field_name("return_type")
            .map(|t| normalize_annotation(get_node_text(&t, self.unit.source)));

        let symbol = Symbol::new(qualified_name.clone(), kind)
            .with_signature(signature)
            .with_return_shape(returns)
            .required(true);
        self.found.insert(qualified_name, symbol);
    }
}

/// Parameters in declaration order with kinds and requiredness.
pub(crate) fn extract_parameters(node: &Node, source: &str) -> Vec<Parameter> {
    let mut params: Vec<Parameter> = Vec::new();
    let mut keyword_only = false;

    let positional_kind = |keyword_only: bool| {
        if keyword_only {
            ParamKind::KeywordOnly
        } else {
            ParamKind::PositionalOrKeyword
        }
    };

    for child in named_children(node) {
        let position = params.len() as u32;
        let param = match child.kind() {
            "identifier" => Some(Parameter::new(
                get_node_text(&child, source),
                position,
                positional_kind(keyword_only),
                true,
            )),
            "typed_parameter" => {
                let annotation = child
                    .child_by_field_name("type")
                    .map(|t| normalize_annotation(get_node_text(&t, source)));
                let Some(inner) = named_children(&child).into_iter().next() else {
                    continue;
                };
                let param = match inner.kind() {
                    "list_splat_pattern" => {
                        keyword_only = true;
                        splat(&inner, source, position, ParamKind::VariadicPositional)
                    }
                    "dictionary_splat_pattern" => {
                        splat(&inner, source, position, ParamKind::VariadicKeyword)
                    }
                    _ => Parameter::new(
                        get_node_text(&inner, source),
                        position,
                        positional_kind(keyword_only),
                        true,
                    ),
                };
                Some(match annotation {
                    Some(a) => param.with_annotation(a),
                    None => param,
                })
            }
            "default_parameter" | "typed_default_parameter" => {
                let Some(name) = child.child_by_field_name("name") else {
                    continue;
                };
                if name.kind() != "identifier" {
                    continue;
                }
                let param = Parameter::new(
                    get_node_text(&name, source),
                    position,
                    positional_kind(keyword_only),
                    false,
                );
                Some(match child.child_by_field_name("type") {
                    Some(t) => {
                        param.with_annotation(normalize_annotation(get_node_text(&t, source)))
                    }
                    None => param,
                })
            }
            "list_splat_pattern" => {
                keyword_only = true;
                Some(splat(&child, source, position, ParamKind::VariadicPositional))
            }
            "dictionary_splat_pattern" => Some(splat(
                &child,
                source,
                position,
                ParamKind::VariadicKeyword,
            )),
            "keyword_separator" => {
                keyword_only = true;
                None
            }
            "positional_separator" => {
                for p in params.iter_mut() {
                    if p.kind == ParamKind::PositionalOrKeyword {
                        p.kind = ParamKind::PositionalOnly;
                    }
                }
                None
            }
            _ => None,
        };

        if let Some(param) = param {
            params.push(param);
        }
    }

    params
}

fn splat(node: &Node, source: &str, position: u32, kind: ParamKind) -> Parameter {
    let name = named_children(node)
        .into_iter()
        .find(|c| c.kind() == "identifier")
        .map(|n| get_node_text(&n, source).to_string())
        .unwrap_or_else(|| match kind {
            ParamKind::VariadicKeyword => "kwargs".to_string(),
            _ => "args".to_string(),
        });
    Parameter::new(name, position, kind, false)
}
