//! Language-agnostic interface model.
//!
//! These types describe the exported surface of one domain at one snapshot:
//! symbols, their ordered parameters, and the diagnostics produced while
//! extracting them. A [`Model`] is built once by an extractor and is only
//! read afterwards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a parameter may be supplied by a caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ParamKind {
    PositionalOnly,
    PositionalOrKeyword,
    KeywordOnly,
    VariadicPositional,
    VariadicKeyword,
}

impl ParamKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::PositionalOnly => "posonly",
            ParamKind::PositionalOrKeyword => "pos",
            ParamKind::KeywordOnly => "kwonly",
            ParamKind::VariadicPositional => "vararg",
            ParamKind::VariadicKeyword => "varkw",
        }
    }

    pub fn is_variadic(&self) -> bool {
        matches!(
            self,
            ParamKind::VariadicPositional | ParamKind::VariadicKeyword
        )
    }
}

/// A declared parameter of a symbol's signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    /// Ordinal within the owning signature, starting at 0.
    pub position: u32,
    pub kind: ParamKind,
    /// True when the parameter has no default value.
    pub required: bool,
    pub annotation: Option<String>,
}

impl Parameter {
    pub fn new(name: impl Into<String>, position: u32, kind: ParamKind, required: bool) -> Self {
        Self {
            name: name.into(),
            position,
            kind,
            required,
            annotation: None,
        }
    }

    /// Set the annotation.
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotation = Some(annotation.into());
        self
    }
}

/// Kind of exported unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SymbolKind {
    Function,
    Method,
    Command,
    Route,
    Endpoint,
    Schema,
    Field,
    MigrationOp,
}

impl SymbolKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SymbolKind::Function => "function",
            SymbolKind::Method => "method",
            SymbolKind::Command => "command",
            SymbolKind::Route => "route",
            SymbolKind::Endpoint => "endpoint",
            SymbolKind::Schema => "schema",
            SymbolKind::Field => "field",
            SymbolKind::MigrationOp => "migration-op",
        }
    }

    /// Noun used in impact descriptions for the symbol itself.
    pub fn noun(&self) -> &'static str {
        match self {
            SymbolKind::Function | SymbolKind::Method => "public symbol",
            SymbolKind::Command => "command",
            SymbolKind::Route => "route",
            SymbolKind::Endpoint => "endpoint",
            SymbolKind::Schema => "schema",
            SymbolKind::Field => "field",
            SymbolKind::MigrationOp => "migration op",
        }
    }

    /// Noun used in impact descriptions for the symbol's parameters.
    pub fn member_noun(&self) -> &'static str {
        match self {
            SymbolKind::Command => "option",
            SymbolKind::Schema => "property",
            _ => "param",
        }
    }
}

/// A uniquely named exported unit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub qualified_name: String,
    pub kind: SymbolKind,
    pub signature: Vec<Parameter>,
    pub return_shape: Option<String>,
    pub required: bool,
}

impl Symbol {
    pub fn new(qualified_name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            qualified_name: qualified_name.into(),
            kind,
            signature: Vec::new(),
            return_shape: None,
            required: false,
        }
    }

    /// Set the parameter list.
    pub fn with_signature(mut self, signature: Vec<Parameter>) -> Self {
        self.signature = signature;
        self
    }

    /// Set the return shape.
    pub fn with_return_shape(mut self, shape: Option<String>) -> Self {
        self.return_shape = shape;
        self
    }

    /// Mark the symbol as required.
    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    /// Render a compact signature for reports, e.g. `greet(name, *, force=...) -> str`.
    pub fn render_signature(&self) -> String {
        let params: Vec<String> = self
            .signature
            .iter()
            .map(|p| {
                let mut s = match p.kind {
                    ParamKind::VariadicPositional => format!("*{}", p.name),
                    ParamKind::VariadicKeyword => format!("**{}", p.name),
                    _ => p.name.clone(),
                };
                if let Some(ref t) = p.annotation {
                    s.push_str(": ");
                    s.push_str(t);
                }
                if !p.required && !p.kind.is_variadic() {
                    s.push_str("=...");
                }
                s
            })
            .collect();

        let ret = self
            .return_shape
            .as_ref()
            .map(|t| format!(" -> {}", t))
            .unwrap_or_default();

        format!("{}({}){}", self.qualified_name, params.join(", "), ret)
    }
}

/// All public symbols of one domain at one snapshot, keyed by qualified name.
///
/// Iteration is always in name order so two models with the same content
/// compare and report identically regardless of how they were built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    symbols: BTreeMap<String, Symbol>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a symbol, returning the one it replaced when the name was taken.
    pub fn insert(&mut self, symbol: Symbol) -> Option<Symbol> {
        self.symbols.insert(symbol.qualified_name.clone(), symbol)
    }

    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.symbols.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.symbols.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.symbols.keys().map(|k| k.as_str())
    }

    pub fn symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.values()
    }

    /// Merge another model into this one. Later symbols win on name clashes.
    pub fn extend(&mut self, other: Model) {
        self.symbols.extend(other.symbols);
    }
}

impl FromIterator<Symbol> for Model {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> Self {
        let mut model = Model::new();
        for symbol in iter {
            model.insert(symbol);
        }
        model
    }
}

/// Non-fatal problem found while extracting a model.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Diagnostic {
    pub path: String,
    pub line: Option<u32>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: u32) -> Self {
        self.line = Some(line);
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}: {}", self.path, line, self.message),
            None => write!(f, "{}: {}", self.path, self.message),
        }
    }
}

/// Output of one extractor run: the model plus diagnostics for skipped units.
#[derive(Clone, Debug, Default)]
pub struct Extraction {
    pub model: Model,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn new(model: Model, mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort();
        Self { model, diagnostics }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_is_compared_by_content() {
        let a: Model = vec![
            Symbol::new("m:a", SymbolKind::Function),
            Symbol::new("m:b", SymbolKind::Function),
        ]
        .into_iter()
        .collect();
        let b: Model = vec![
            Symbol::new("m:b", SymbolKind::Function),
            Symbol::new("m:a", SymbolKind::Function),
        ]
        .into_iter()
        .collect();

        assert_eq!(a, b);
        assert_eq!(a.names().collect::<Vec<_>>(), vec!["m:a", "m:b"]);
    }

    #[test]
    fn test_insert_replaces_duplicate_name() {
        let mut model = Model::new();
        assert!(model.insert(Symbol::new("m:f", SymbolKind::Function)).is_none());
        let previous = model.insert(Symbol::new("m:f", SymbolKind::Method));
        assert_eq!(previous.map(|s| s.kind), Some(SymbolKind::Function));
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_render_signature() {
        let symbol = Symbol::new("demo:greet", SymbolKind::Function)
            .with_signature(vec![
                Parameter::new("name", 0, ParamKind::PositionalOrKeyword, true)
                    .with_annotation("str"),
                Parameter::new("loud", 1, ParamKind::KeywordOnly, false),
                Parameter::new("rest", 2, ParamKind::VariadicKeyword, false),
            ])
            .with_return_shape(Some("str".to_string()));

        assert_eq!(
            symbol.render_signature(),
            "demo:greet(name: str, loud=..., **rest) -> str"
        );
    }

    #[test]
    fn test_diagnostic_display() {
        let diag = Diagnostic::new("pkg/mod.py", "syntax error").at_line(3);
        assert_eq!(diag.to_string(), "pkg/mod.py:3: syntax error");
    }

    #[test]
    fn test_symbol_serialization() {
        let symbol = Symbol::new("GET /users", SymbolKind::Route);
        let json = serde_json::to_string(&symbol).unwrap();
        assert!(json.contains("\"kind\":\"route\""));
    }
}
