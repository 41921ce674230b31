//! HTTP routes from Flask and FastAPI style decorators.

use std::collections::BTreeMap;

use tree_sitter::Node;

use super::helpers::{
    call_name, descendants_of_kind, get_start_line, keyword_arg, positional_args,
    split_decorated, string_list, string_literal,
};
use super::python::extract_parameters;
use super::{extract_python, Extractor, PythonUnit, UnitOutput};
use crate::model::{Extraction, Parameter, Symbol, SymbolKind};
use crate::snapshot::Snapshot;
use crate::surface::SurfaceFilter;

const HTTP_METHODS: &[&str] = &["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS", "HEAD"];

/// Extractor for the `web_routes` domain.
///
/// Recognised shapes:
/// - `@<obj>.route("/path", methods=[...])`, methods default to `GET`
/// - `@<obj>.get("/path")` and the other HTTP verbs
///
/// Each route becomes a symbol named `METHOD /path` whose parameters are the
/// handler's named parameters (without `self` and variadics).
#[derive(Clone, Copy, Debug, Default)]
pub struct RouteExtractor;

impl Extractor for RouteExtractor {
    fn extract(&self, snapshot: &Snapshot, surface: &dyn SurfaceFilter) -> Extraction {
        extract_python(snapshot, surface, extract_unit)
    }
}

fn extract_unit(unit: &PythonUnit, root: Node, surface: &dyn SurfaceFilter) -> UnitOutput {
    let mut output = UnitOutput::default();
    let mut routes: BTreeMap<String, Symbol> = BTreeMap::new();

    for decorated in descendants_of_kind(&root, "decorated_definition") {
        let (decorators, definition) = split_decorated(&decorated);
        let Some(handler) = definition.filter(|d| d.kind() == "function_definition") else {
            continue;
        };

        let mut endpoints: Vec<(String, String)> = Vec::new();
        for decorator in &decorators {
            match route_shape(unit, decorator) {
                Ok(Some(found)) => endpoints.extend(found),
                Ok(None) => {}
                Err(message) => output.diagnostic(unit.path, get_start_line(decorator), message),
            }
        }
        if endpoints.is_empty() {
            continue;
        }

        let params = handler_params(&handler, unit.source);
        for (method, path) in endpoints {
            let name = format!("{} {}", method, path);
            if !surface.is_public(&name) {
                continue;
            }
            let symbol =
                Symbol::new(name.clone(), SymbolKind::Route).with_signature(params.clone());
            routes.insert(name, symbol);
        }
    }

    output.symbols.extend(routes.into_values());
    output
}

/// `(method, path)` pairs declared by one decorator. `Ok(None)` when the
/// decorator is not route-shaped.
fn route_shape(
    unit: &PythonUnit,
    decorator: &Node,
) -> Result<Option<Vec<(String, String)>>, String> {
    let Some(callee) = call_name(decorator, unit.source) else {
        return Ok(None);
    };
    let Some((_, attr)) = callee.rsplit_once('.') else {
        return Ok(None);
    };
    let attr = attr.to_ascii_lowercase();

    let mut methods: Vec<String> = if attr == "route" {
        match keyword_arg(decorator, "methods", unit.source) {
            Some(value) => {
                let methods = string_list(&value, unit.source).ok_or_else(|| {
                    format!("Route methods of '{}' are not literal strings; route skipped", callee)
                })?;
                methods.into_iter().map(|m| m.to_ascii_uppercase()).collect()
            }
            None => vec!["GET".to_string()],
        }
    } else if HTTP_METHODS.contains(&attr.to_ascii_uppercase().as_str()) {
        vec![attr.to_ascii_uppercase()]
    } else {
        return Ok(None);
    };

    let path = positional_args(decorator)
        .first()
        .map(|arg| string_literal(arg, unit.source))
        .or_else(|| {
            keyword_arg(decorator, "path", unit.source).map(|v| string_literal(&v, unit.source))
        });
    let path = match path {
        Some(Some(path)) => path,
        Some(None) => {
            return Err(format!(
                "Route path of '{}' is not a string literal; route skipped",
                callee
            ))
        }
        None => return Ok(None),
    };

    methods.sort();
    methods.dedup();
    Ok(Some(methods.into_iter().map(|m| (m, path.clone())).collect()))
}

/// Handler parameters that a request can supply.
fn handler_params(handler: &Node, source: &str) -> Vec<Parameter> {
    let params = handler
        .child_by_field_name("parameters")
        .map(|p| extract_parameters(&p, source))
        .unwrap_or_default();

    params
        .into_iter()
        .filter(|p| p.name != "self" && !p.kind.is_variadic())
        .enumerate()
        .map(|(position, mut p)| {
            p.position = position as u32;
            p
        })
        .collect()
}
