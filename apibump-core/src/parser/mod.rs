//! Interface model extraction.
//!
//! Every domain has an [`Extractor`] that turns a [`Snapshot`] into a
//! [`Model`]. Python sources are parsed with tree-sitter and matched against
//! fixed call and decorator shapes; nothing is ever imported or executed.
//! Files are parsed in parallel with rayon and merged in path order, so the
//! resulting model depends only on the snapshot's content.

use rayon::prelude::*;
use tree_sitter::{Node, Parser, Tree};

use crate::model::{Diagnostic, Extraction, Model, Symbol};
use crate::snapshot::Snapshot;
use crate::surface::SurfaceFilter;

pub mod cli;
pub mod migrations;
pub mod openapi;
pub mod python;
pub mod routes;

mod helpers;

pub use cli::CliExtractor;
pub use migrations::MigrationExtractor;
pub use openapi::OpenApiExtractor;
pub use python::SignatureExtractor;
pub use routes::RouteExtractor;

/// Builds a domain model from a snapshot.
pub trait Extractor: Send + Sync {
    /// Extract every public symbol. Units that cannot be parsed are skipped
    /// and reported in the returned diagnostics.
    fn extract(&self, snapshot: &Snapshot, surface: &dyn SurfaceFilter) -> Extraction;
}

/// One parsed Python source file.
pub struct PythonUnit<'a> {
    pub path: &'a str,
    pub module: String,
    pub source: &'a str,
}

/// Symbols and diagnostics produced from one source unit.
#[derive(Debug, Default)]
pub struct UnitOutput {
    pub symbols: Vec<Symbol>,
    pub diagnostics: Vec<Diagnostic>,
}

impl UnitOutput {
    pub fn symbol(&mut self, symbol: Symbol) {
        self.symbols.push(symbol);
    }

    pub fn diagnostic(&mut self, path: &str, line: u32, message: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::new(path, message).at_line(line));
    }
}

/// Dotted module name for a Python file relative to its root.
///
/// `pkg/sub/mod.py` under root `pkg` becomes `sub.mod`; a trailing
/// `__init__` is dropped and a package's own `__init__.py` takes the root's
/// final component as its name.
pub fn module_name_from_path(path: &str, root: &str) -> Option<String> {
    let relative = if root.is_empty() {
        path
    } else {
        path.strip_prefix(root)?.strip_prefix('/')?
    };
    let stem = relative.strip_suffix(".py")?;

    let mut parts: Vec<&str> = stem.split('/').filter(|p| !p.is_empty()).collect();
    if parts.last() == Some(&"__init__") {
        parts.pop();
        if parts.is_empty() {
            let package = root.rsplit('/').next().filter(|p| !p.is_empty());
            return Some(package.unwrap_or("__init__").to_string());
        }
    }
    Some(parts.join("."))
}

/// Create a parser for Python.
pub(crate) fn python_parser() -> Result<Parser, String> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .map_err(|e| format!("Failed to set Python language: {}", e))?;
    Ok(parser)
}

/// Parse Python source. A tree containing any syntax error is rejected so
/// partially recovered definitions never reach a model.
pub(crate) fn parse_python(source: &str) -> Result<Tree, (u32, String)> {
    let mut parser = python_parser().map_err(|e| (1, e))?;
    let tree = parser
        .parse(source, None)
        .ok_or((1, "Failed to parse Python source".to_string()))?;

    if let Some(line) = helpers::first_error_line(&tree.root_node()) {
        return Err((line, "Syntax error; file skipped".to_string()));
    }
    Ok(tree)
}

/// Run `extract_unit` over every Python file of the snapshot in parallel and
/// merge the results in path order.
pub(crate) fn extract_python<F>(
    snapshot: &Snapshot,
    surface: &dyn SurfaceFilter,
    extract_unit: F,
) -> Extraction
where
    F: Fn(&PythonUnit, Node, &dyn SurfaceFilter) -> UnitOutput + Send + Sync,
{
    let files: Vec<(&str, &[u8])> = snapshot
        .files()
        .filter(|(path, _)| path.ends_with(".py"))
        .collect();

    let outputs: Vec<UnitOutput> = files
        .par_iter()
        .map(|&(path, content)| {
            let mut output = UnitOutput::default();

            let Ok(source) = std::str::from_utf8(content) else {
                tracing::warn!("Skipping {}: not valid UTF-8", path);
                output.diagnostics.push(Diagnostic::new(
                    path,
                    "File is not valid UTF-8; file skipped",
                ));
                return output;
            };
            let Some(module) = snapshot
                .root_for(path)
                .and_then(|root| module_name_from_path(path, root))
            else {
                return output;
            };

            match parse_python(source) {
                Ok(tree) => {
                    let unit = PythonUnit {
                        path,
                        module,
                        source,
                    };
                    let output = extract_unit(&unit, tree.root_node(), surface);
                    tracing::debug!("{}: {} symbols", path, output.symbols.len());
                    output
                }
                Err((line, message)) => {
                    tracing::warn!("Skipping {}: syntax error at line {}", path, line);
                    output.diagnostic(path, line, message);
                    output
                }
            }
        })
        .collect();

    merge_outputs(outputs)
}

/// Merge per-unit outputs in order. A name defined twice keeps its first
/// definition and the duplicate is reported.
pub(crate) fn merge_outputs(outputs: Vec<UnitOutput>) -> Extraction {
    let mut model = Model::new();
    let mut diagnostics = Vec::new();

    for output in outputs {
        diagnostics.extend(output.diagnostics);
        for symbol in output.symbols {
            if model.contains(&symbol.qualified_name) {
                diagnostics.push(Diagnostic::new(
                    symbol.qualified_name.clone(),
                    "Defined more than once; first definition kept",
                ));
                continue;
            }
            model.insert(symbol);
        }
    }

    tracing::debug!(
        "Extracted {} symbols ({} diagnostics)",
        model.len(),
        diagnostics.len()
    );
    Extraction::new(model, diagnostics)
}
