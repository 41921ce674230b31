//! Endpoints and schemas from OpenAPI documents.
//!
//! YAML and JSON documents are both read through `serde_yaml`. Operations
//! become `METHOD /path` endpoints whose parameters are the declared
//! parameters plus the request body; component schemas become `schema:Name`
//! symbols whose parameters are their properties.

use rayon::prelude::*;
use serde_json::Value;

use super::{merge_outputs, Extractor, UnitOutput};
use crate::model::{Diagnostic, Extraction, ParamKind, Parameter, Symbol, SymbolKind};
use crate::snapshot::Snapshot;
use crate::surface::SurfaceFilter;

const METHODS: &[&str] = &[
    "get", "put", "post", "delete", "options", "head", "patch", "trace",
];

/// Extractor for the `openapi` domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct OpenApiExtractor;

impl Extractor for OpenApiExtractor {
    fn extract(&self, snapshot: &Snapshot, surface: &dyn SurfaceFilter) -> Extraction {
        let files: Vec<(&str, &[u8])> = snapshot
            .files()
            .filter(|(path, _)| is_document(path))
            .collect();

        let outputs: Vec<UnitOutput> = files
            .par_iter()
            .map(|&(path, content)| extract_document(path, content, surface))
            .collect();

        merge_outputs(outputs)
    }
}

fn is_document(path: &str) -> bool {
    path.ends_with(".yaml") || path.ends_with(".yml") || path.ends_with(".json")
}

fn extract_document(path: &str, content: &[u8], surface: &dyn SurfaceFilter) -> UnitOutput {
    let mut output = UnitOutput::default();

    let document = match read_document(content) {
        Ok(document) => document,
        Err(mut diagnostic) => {
            diagnostic.path = path.to_string();
            output.diagnostics.push(diagnostic);
            return output;
        }
    };

    if let Some(paths) = document.get("paths") {
        match paths.as_object() {
            Some(paths) => {
                for (route, item) in paths {
                    extract_path_item(path, route, item, surface, &mut output);
                }
            }
            None => output
                .diagnostics
                .push(Diagnostic::new(path, "'paths' is not a mapping; skipped")),
        }
    }

    let schemas = document
        .pointer("/components/schemas")
        .or_else(|| document.get("definitions"))
        .and_then(Value::as_object);
    if let Some(schemas) = schemas {
        for (name, schema) in schemas {
            let qualified = format!("schema:{}", name);
            if !surface.is_public(&qualified) {
                continue;
            }
            let properties = schema_properties(schema);
            output.symbol(Symbol::new(qualified, SymbolKind::Schema).with_signature(properties));
        }
    }

    output
}

/// YAML mappings may use integer keys (`200:` response codes), so the
/// document is read as YAML first and then converted to JSON.
fn read_document(content: &[u8]) -> Result<Value, Diagnostic> {
    let yaml: serde_yaml::Value = serde_yaml::from_slice(content).map_err(|e| {
        let diagnostic = Diagnostic::new("", format!("Unparseable document skipped: {}", e));
        match e.location() {
            Some(location) => diagnostic.at_line(location.line() as u32),
            None => diagnostic,
        }
    })?;
    serde_json::to_value(yaml)
        .map_err(|e| Diagnostic::new("", format!("Unsupported document skipped: {}", e)))
}

fn extract_path_item(
    file: &str,
    route: &str,
    item: &Value,
    surface: &dyn SurfaceFilter,
    output: &mut UnitOutput,
) {
    let Some(item) = item.as_object() else {
        output.diagnostics.push(Diagnostic::new(
            file,
            format!("Path item '{}' is not a mapping; skipped", route),
        ));
        return;
    };
    let shared = item.get("parameters");

    for method in METHODS {
        let Some(operation) = item.get(*method) else {
            continue;
        };
        let name = format!("{} {}", method.to_ascii_uppercase(), route);
        if !surface.is_public(&name) {
            continue;
        }

        let mut params: Vec<Parameter> = Vec::new();
        // Operation-level parameters override path-level ones with the same name
        let declared = [operation.get("parameters"), shared];
        for list in declared.into_iter().flatten() {
            for param in list.as_array().into_iter().flatten() {
                let Some(param) = operation_parameter(param, params.len() as u32) else {
                    output.diagnostics.push(Diagnostic::new(
                        file,
                        format!("Parameter of '{}' has no name; skipped", name),
                    ));
                    continue;
                };
                if !params.iter().any(|p| p.name == param.name) {
                    params.push(param);
                }
            }
        }

        if let Some(body) = operation.get("requestBody") {
            let required = body.get("required").and_then(Value::as_bool).unwrap_or(false);
            let annotation = body
                .get("content")
                .and_then(Value::as_object)
                .and_then(|content| content.iter().min_by_key(|(media, _)| media.as_str()))
                .map(|(_, media)| media)
                .and_then(|media| media.get("schema"))
                .map(type_shape);
            let mut param =
                Parameter::new("body", params.len() as u32, ParamKind::KeywordOnly, required);
            param.annotation = annotation;
            params.push(param);
        }

        let responses = operation
            .get("responses")
            .and_then(Value::as_object)
            .map(|r| {
                let mut codes: Vec<&str> = r.keys().map(String::as_str).collect();
                codes.sort_unstable();
                codes.join(",")
            });

        output.symbol(
            Symbol::new(name, SymbolKind::Endpoint)
                .with_signature(params)
                .with_return_shape(responses),
        );
    }
}

/// A declared operation parameter. Path parameters are always required.
fn operation_parameter(param: &Value, position: u32) -> Option<Parameter> {
    if let Some(reference) = param.get("$ref").and_then(Value::as_str) {
        let name = reference.rsplit('/').next().unwrap_or(reference);
        let param = Parameter::new(name, position, ParamKind::KeywordOnly, false);
        return Some(param.with_annotation(reference));
    }

    let name = param.get("name")?.as_str()?;
    let location = param.get("in").and_then(Value::as_str).unwrap_or("query");
    let required =
        location == "path" || param.get("required").and_then(Value::as_bool).unwrap_or(false);
    let shape = param
        .get("schema")
        .map(type_shape)
        .unwrap_or_else(|| type_shape(param));

    Some(
        Parameter::new(name, position, ParamKind::KeywordOnly, required)
            .with_annotation(format!("{}:{}", location, shape)),
    )
}

/// Properties of a schema in name order.
fn schema_properties(schema: &Value) -> Vec<Parameter> {
    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    schema
        .get("properties")
        .and_then(Value::as_object)
        .map(|properties| {
            let mut properties: Vec<(&String, &Value)> = properties.iter().collect();
            properties.sort_by(|a, b| a.0.cmp(b.0));
            properties
                .into_iter()
                .enumerate()
                .map(|(position, (name, property))| {
                    Parameter::new(
                        name.clone(),
                        position as u32,
                        ParamKind::KeywordOnly,
                        required.contains(&name.as_str()),
                    )
                    .with_annotation(type_shape(property))
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Compact type descriptor: `$ref` target, `type[:format]`, `array<item>`,
/// or the canonical JSON of anything else.
fn type_shape(schema: &Value) -> String {
    if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
        return reference.to_string();
    }
    match schema.get("type").and_then(Value::as_str) {
        Some("array") => {
            let item = schema.get("items").map(type_shape).unwrap_or_default();
            format!("array<{}>", item)
        }
        Some(kind) => match schema.get("format").and_then(Value::as_str) {
            Some(format) => format!("{}:{}", kind, format),
            None => kind.to_string(),
        },
        None => serde_json::to_string(schema).unwrap_or_default(),
    }
}
