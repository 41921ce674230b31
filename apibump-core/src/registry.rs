//! Analyser registry.
//!
//! An analyser pairs an [`Extractor`] with a [`Differ`] under a domain name.
//! The registry is built once, explicitly, before any analysis runs and is
//! only read afterwards.

use std::collections::BTreeMap;

use crate::differ::{Differ, MigrationDiffer, SignatureDiffer};
use crate::error::{CoreError, CoreResult};
use crate::parser::{
    CliExtractor, Extractor, MigrationExtractor, OpenApiExtractor, RouteExtractor,
    SignatureExtractor,
};

pub const SIGNATURES: &str = "signatures";
pub const WEB_ROUTES: &str = "web_routes";
pub const CLI: &str = "cli";
pub const MIGRATIONS: &str = "migrations";
pub const OPENAPI: &str = "openapi";

/// One registered domain.
pub struct Analyser {
    pub name: String,
    pub description: String,
    pub extractor: Box<dyn Extractor>,
    pub differ: Box<dyn Differ>,
}

impl std::fmt::Debug for Analyser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyser")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish_non_exhaustive()
    }
}

/// Domain name to analyser table, iterated in name order.
#[derive(Debug, Default)]
pub struct AnalyserRegistry {
    analysers: BTreeMap<String, Analyser>,
}

impl AnalyserRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in analyser.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        let builtins: [(&str, &str, Box<dyn Extractor>, Box<dyn Differ>); 5] = [
            (
                SIGNATURES,
                "Public function and method signatures",
                Box::new(SignatureExtractor),
                Box::new(SignatureDiffer::new()),
            ),
            (
                WEB_ROUTES,
                "HTTP routes declared with Flask or FastAPI decorators",
                Box::new(RouteExtractor),
                Box::new(SignatureDiffer::by_name()),
            ),
            (
                CLI,
                "Commands and options declared with click or argparse",
                Box::new(CliExtractor),
                Box::new(SignatureDiffer::by_name()),
            ),
            (
                MIGRATIONS,
                "Schema operations in Alembic migrations",
                Box::new(MigrationExtractor),
                Box::new(MigrationDiffer),
            ),
            (
                OPENAPI,
                "Endpoints and schemas in OpenAPI documents",
                Box::new(OpenApiExtractor),
                Box::new(SignatureDiffer::by_name()),
            ),
        ];

        for (name, description, extractor, differ) in builtins {
            registry.analysers.insert(
                name.to_string(),
                Analyser {
                    name: name.to_string(),
                    description: description.to_string(),
                    extractor,
                    differ,
                },
            );
        }
        registry
    }

    /// Add an analyser. Fails when the name is taken.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        extractor: Box<dyn Extractor>,
        differ: Box<dyn Differ>,
    ) -> CoreResult<()> {
        if self.analysers.contains_key(name) {
            return Err(CoreError::RegistrationConflict {
                name: name.to_string(),
            });
        }
        self.analysers.insert(
            name.to_string(),
            Analyser {
                name: name.to_string(),
                description: description.to_string(),
                extractor,
                differ,
            },
        );
        Ok(())
    }

    /// Find an analyser by name.
    pub fn lookup(&self, name: &str) -> CoreResult<&Analyser> {
        self.analysers
            .get(name)
            .ok_or_else(|| CoreError::AnalyserNotFound {
                name: name.to_string(),
            })
    }

    pub fn contains(&self, name: &str) -> bool {
        self.analysers.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.analysers.keys().map(|k| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Analyser> {
        self.analysers.values()
    }

    pub fn len(&self) -> usize {
        self.analysers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analysers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_names() {
        let registry = AnalyserRegistry::builtin();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(
            names,
            vec!["cli", "migrations", "openapi", "signatures", "web_routes"]
        );
    }

    #[test]
    fn test_duplicate_registration_conflicts() {
        let mut registry = AnalyserRegistry::builtin();
        let err = registry
            .register(
                SIGNATURES,
                "again",
                Box::new(SignatureExtractor),
                Box::new(SignatureDiffer::new()),
            )
            .unwrap_err();
        assert!(matches!(err, CoreError::RegistrationConflict { name } if name == "signatures"));
        assert_eq!(registry.len(), 5);
    }

    #[test]
    fn test_lookup() {
        let registry = AnalyserRegistry::builtin();
        assert_eq!(registry.lookup(CLI).unwrap().name, "cli");

        let err = registry.lookup("graphql").unwrap_err();
        assert!(matches!(err, CoreError::AnalyserNotFound { name } if name == "graphql"));
    }
}
