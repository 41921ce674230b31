//! Configuration loading from `apibump.toml`.
//!
//! Configuration is optional: without a file, only the `signatures` domain
//! runs over the whole repository with the built-in severity rules.
//!
//! # Example Configuration
//!
//! ```toml
//! [project]
//! public_roots = ["src"]
//!
//! [ignore]
//! paths = ["tests/**", "examples/**"]
//!
//! [analysers]
//! signatures = true
//! web_routes = true
//!
//! [surface]
//! hide_private = true
//! exclude = ["\\.testing\\."]
//!
//! [rules]
//! return_type_change = "minor"
//!
//! [rules.overrides]
//! "param-added-optional" = "patch"
//!
//! [rules.domains.web_routes]
//! "symbol-added" = "major"
//!
//! [migrations]
//! paths = ["migrations"]
//!
//! [output]
//! format = "md"
//! color = false
//! width = 100
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use apibump_core::registry::{MIGRATIONS, OPENAPI, SIGNATURES};
use apibump_core::{
    AnalyserRegistry, AnalysisSettings, ChangeKind, PathFilter, Severity, SeverityTable,
    VisibilityRules,
};
use serde::Deserialize;

/// File name looked up in the working directory.
pub const CONFIG_FILE: &str = "apibump.toml";

/// Root configuration structure loaded from `apibump.toml`.
#[derive(Debug, Deserialize, Default)]
pub struct ApibumpConfig {
    #[serde(default)]
    pub project: ProjectConfig,

    #[serde(default)]
    pub ignore: IgnoreConfig,

    /// Domain name -> enabled.
    #[serde(default)]
    pub analysers: BTreeMap<String, bool>,

    #[serde(default)]
    pub surface: SurfaceConfig,

    #[serde(default)]
    pub rules: RulesConfig,

    #[serde(default)]
    pub migrations: PathsConfig,

    #[serde(default)]
    pub openapi: PathsConfig,

    #[serde(default)]
    pub output: OutputSettings,
}

/// Where the public Python packages live.
#[derive(Debug, Deserialize)]
pub struct ProjectConfig {
    #[serde(default = "default_public_roots")]
    pub public_roots: Vec<String>,
}

fn default_public_roots() -> Vec<String> {
    vec![".".to_string()]
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            public_roots: default_public_roots(),
        }
    }
}

/// Gitignore-style patterns for paths that are never part of the interface.
#[derive(Debug, Deserialize, Default)]
pub struct IgnoreConfig {
    #[serde(default)]
    pub paths: Vec<String>,
}

/// Name-based visibility rules.
#[derive(Debug, Deserialize)]
pub struct SurfaceConfig {
    /// Treat underscore-prefixed names as private.
    #[serde(default = "default_hide_private")]
    pub hide_private: bool,

    /// Regexes a qualified name must match, when any are given.
    #[serde(default)]
    pub include: Vec<String>,

    /// Regexes that remove a qualified name from the surface.
    #[serde(default)]
    pub exclude: Vec<String>,
}

fn default_hide_private() -> bool {
    true
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            hide_private: true,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

/// Severity overrides.
#[derive(Debug, Deserialize, Default)]
pub struct RulesConfig {
    /// Shorthand for the `return-changed` override.
    #[serde(default)]
    pub return_type_change: Option<String>,

    /// Change kind -> severity, in every domain.
    #[serde(default)]
    pub overrides: BTreeMap<String, String>,

    /// Domain -> change kind -> severity.
    #[serde(default)]
    pub domains: BTreeMap<String, BTreeMap<String, String>>,
}

/// Paths for domains that do not read the public roots.
#[derive(Debug, Deserialize, Default)]
pub struct PathsConfig {
    #[serde(default)]
    pub paths: Option<Vec<String>>,
}

/// Output preferences. Command-line flags take precedence.
#[derive(Debug, Deserialize, Default)]
pub struct OutputSettings {
    /// `text`, `md` or `json`.
    #[serde(default)]
    pub format: Option<String>,

    #[serde(default)]
    pub color: Option<bool>,

    /// Wrap impact tables to this many columns.
    #[serde(default)]
    pub width: Option<usize>,
}

/// Patterns ignored even without an `[ignore]` section.
const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git/",
    "__pycache__/",
    ".venv/",
    "venv/",
    "node_modules/",
];

const DEFAULT_MIGRATION_PATHS: &[&str] = &["migrations", "alembic"];
const DEFAULT_OPENAPI_PATHS: &[&str] = &["openapi.yaml", "openapi.yml", "openapi.json"];

impl ApibumpConfig {
    /// Load `apibump.toml` from `path`, or from `root` when no path is given.
    ///
    /// A missing file yields defaults. A file that cannot be read or parsed is
    /// logged as a warning and also yields defaults.
    pub fn load(root: &Path, path: Option<&Path>) -> Self {
        let config_path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| root.join(CONFIG_FILE));
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match toml::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse {}: {}", config_path.display(), e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read {}: {}", config_path.display(), e);
                }
            }
        }
        Self::default()
    }

    /// Like [`load`](Self::load), but read and parse errors are returned.
    /// A missing default file is still not an error; a missing explicit path is.
    pub fn load_strict(root: &Path, path: Option<&Path>) -> anyhow::Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => {
                let default = root.join(CONFIG_FILE);
                if !default.exists() {
                    return Ok(Self::default());
                }
                default
            }
        };
        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))
    }

    /// Enabled domains after applying `--enable`/`--disable`.
    ///
    /// `signatures` is on unless the file or a flag turns it off.
    pub fn enabled_analysers(&self, enable: &[String], disable: &[String]) -> Vec<String> {
        let mut enabled: BTreeMap<String, bool> = BTreeMap::new();
        enabled.insert(SIGNATURES.to_string(), true);
        for (name, on) in &self.analysers {
            enabled.insert(name.clone(), *on);
        }
        for name in enable {
            enabled.insert(name.clone(), true);
        }
        for name in disable {
            enabled.insert(name.clone(), false);
        }
        enabled
            .into_iter()
            .filter(|(_, on)| *on)
            .map(|(name, _)| name)
            .collect()
    }

    /// Ignore patterns with defaults appended.
    pub fn ignore_patterns(&self) -> Vec<String> {
        let mut patterns = self.ignore.paths.clone();
        for default in DEFAULT_IGNORE_PATTERNS {
            if !patterns.iter().any(|p| p.as_str() == *default) {
                patterns.push(default.to_string());
            }
        }
        patterns
    }

    pub fn path_filter(&self) -> anyhow::Result<PathFilter> {
        PathFilter::new(&self.ignore_patterns()).context("Invalid [ignore] pattern")
    }

    /// The severity table with every configured override applied.
    ///
    /// Unknown change kinds, severities or domains are errors.
    pub fn severity_table(&self, registry: &AnalyserRegistry) -> anyhow::Result<SeverityTable> {
        let mut table = SeverityTable::default();

        if let Some(severity) = &self.rules.return_type_change {
            let severity: Severity = severity.parse().context("Invalid rules.return_type_change")?;
            table = table.with_override(ChangeKind::ReturnChanged, severity);
        }
        for (kind, severity) in &self.rules.overrides {
            let (kind, severity) = parse_rule(kind, severity)
                .with_context(|| format!("Invalid override in [rules.overrides]: '{}'", kind))?;
            table = table.with_override(kind, severity);
        }
        for (domain, overrides) in &self.rules.domains {
            if !registry.contains(domain) {
                anyhow::bail!("Unknown analyser in [rules.domains]: '{}'", domain);
            }
            for (kind, severity) in overrides {
                let (kind, severity) = parse_rule(kind, severity).with_context(|| {
                    format!("Invalid override in [rules.domains.{}]: '{}'", domain, kind)
                })?;
                table = table.with_domain_override(domain.clone(), kind, severity);
            }
        }
        Ok(table)
    }

    pub fn visibility_rules(&self) -> anyhow::Result<VisibilityRules> {
        VisibilityRules::new(
            self.surface.hide_private,
            &self.surface.include,
            &self.surface.exclude,
        )
        .context("Invalid [surface] pattern")
    }

    /// Per-domain paths for domains with their own sections.
    pub fn domain_paths(&self) -> BTreeMap<String, Vec<String>> {
        let resolve = |paths: &Option<Vec<String>>, defaults: &[&str]| {
            paths
                .clone()
                .unwrap_or_else(|| defaults.iter().map(|p| p.to_string()).collect())
        };
        BTreeMap::from([
            (
                MIGRATIONS.to_string(),
                resolve(&self.migrations.paths, DEFAULT_MIGRATION_PATHS),
            ),
            (
                OPENAPI.to_string(),
                resolve(&self.openapi.paths, DEFAULT_OPENAPI_PATHS),
            ),
        ])
    }

    /// Everything the analysis driver needs.
    pub fn analysis_settings(
        &self,
        registry: &AnalyserRegistry,
        enable: &[String],
        disable: &[String],
    ) -> anyhow::Result<AnalysisSettings> {
        Ok(AnalysisSettings {
            enabled: self.enabled_analysers(enable, disable),
            public_roots: self.project.public_roots.clone(),
            domain_paths: self.domain_paths(),
            rules: self.severity_table(registry)?,
            surface: Box::new(self.visibility_rules()?),
        })
    }

    pub fn default_format(&self) -> Option<&str> {
        self.output.format.as_deref()
    }

    pub fn use_color(&self) -> Option<bool> {
        self.output.color
    }

    pub fn table_width(&self) -> Option<usize> {
        self.output.width
    }
}

fn parse_rule(kind: &str, severity: &str) -> anyhow::Result<(ChangeKind, Severity)> {
    Ok((kind.parse()?, severity.parse()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = ApibumpConfig::default();
        assert_eq!(config.project.public_roots, vec!["."]);
        assert!(config.surface.hide_private);
        assert!(config.output.format.is_none());
        assert_eq!(config.enabled_analysers(&[], &[]), vec!["signatures"]);
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[project]
public_roots = ["src"]

[ignore]
paths = ["tests/**"]

[analysers]
web_routes = true
cli = false

[surface]
hide_private = false
exclude = ["internal"]

[rules]
return_type_change = "major"

[rules.overrides]
"param-added-optional" = "patch"

[rules.domains.web_routes]
"symbol-added" = "major"

[migrations]
paths = ["db/migrations"]

[output]
format = "json"
color = false
width = 100
"#;
        let config: ApibumpConfig = toml::from_str(toml_content).unwrap();
        let registry = AnalyserRegistry::builtin();

        assert_eq!(config.project.public_roots, vec!["src"]);
        assert_eq!(config.ignore_patterns()[0], "tests/**");
        assert!(config.ignore_patterns().contains(&".git/".to_string()));
        assert_eq!(
            config.enabled_analysers(&["cli".to_string()], &["signatures".to_string()]),
            vec!["cli", "web_routes"]
        );

        let table = config.severity_table(&registry).unwrap();
        assert_eq!(
            table.severity_for(ChangeKind::ReturnChanged, "signatures"),
            Severity::Major
        );
        assert_eq!(
            table.severity_for(ChangeKind::ParamAddedOptional, "cli"),
            Severity::Patch
        );
        assert_eq!(
            table.severity_for(ChangeKind::SymbolAdded, "web_routes"),
            Severity::Major
        );
        assert_eq!(
            table.severity_for(ChangeKind::SymbolAdded, "signatures"),
            Severity::Minor
        );

        let paths = config.domain_paths();
        assert_eq!(paths["migrations"], vec!["db/migrations"]);
        assert_eq!(paths["openapi"], vec!["openapi.yaml", "openapi.yml", "openapi.json"]);

        assert_eq!(config.default_format(), Some("json"));
        assert_eq!(config.use_color(), Some(false));
        assert_eq!(config.table_width(), Some(100));
    }

    #[test]
    fn test_unknown_rule_names_are_errors() {
        let registry = AnalyserRegistry::builtin();

        let config: ApibumpConfig =
            toml::from_str("[rules.overrides]\n\"param-vanished\" = \"major\"\n").unwrap();
        assert!(config.severity_table(&registry).is_err());

        let config: ApibumpConfig =
            toml::from_str("[rules.overrides]\n\"symbol-added\" = \"huge\"\n").unwrap();
        assert!(config.severity_table(&registry).is_err());

        let config: ApibumpConfig =
            toml::from_str("[rules.domains.graphql]\n\"symbol-added\" = \"major\"\n").unwrap();
        assert!(config.severity_table(&registry).is_err());
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "[project\npublic_roots = 1").unwrap();

        let config = ApibumpConfig::load(dir.path(), None);
        assert_eq!(config.project.public_roots, vec!["."]);
        assert!(ApibumpConfig::load_strict(dir.path(), None).is_err());
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(ApibumpConfig::load_strict(dir.path(), None).is_ok());
        let missing = dir.path().join("nope.toml");
        assert!(ApibumpConfig::load_strict(dir.path(), Some(&missing)).is_err());
    }
}
