//! Analysis driver: snapshots in, decision out.
//!
//! Enabled domains are resolved against the registry up front, so an unknown
//! name fails before any snapshot is read. Domains then run in parallel;
//! their results are collected in domain-name order and handed to
//! [`decide`].

use std::collections::BTreeMap;
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;

use crate::decision::{decide, Decision};
use crate::differ::{Impact, ImpactSummary};
use crate::error::CoreResult;
use crate::model::Diagnostic;
use crate::registry::{Analyser, AnalyserRegistry, SIGNATURES};
use crate::severity::SeverityTable;
use crate::snapshot::SnapshotProvider;
use crate::surface::{SurfaceFilter, VisibilityRules};

/// Everything a run needs besides the registry and the snapshot provider.
pub struct AnalysisSettings {
    /// Domains to run.
    pub enabled: Vec<String>,
    /// Roots for domains without their own paths.
    pub public_roots: Vec<String>,
    /// Per-domain paths, e.g. migration directories.
    pub domain_paths: BTreeMap<String, Vec<String>>,
    pub rules: SeverityTable,
    pub surface: Box<dyn SurfaceFilter>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            enabled: vec![SIGNATURES.to_string()],
            public_roots: vec![".".to_string()],
            domain_paths: BTreeMap::new(),
            rules: SeverityTable::default(),
            surface: Box::new(VisibilityRules::default()),
        }
    }
}

impl AnalysisSettings {
    /// Paths read for `domain`.
    pub fn paths_for(&self, domain: &str) -> &[String] {
        self.domain_paths
            .get(domain)
            .map(|p| p.as_slice())
            .unwrap_or(&self.public_roots)
    }
}

/// Which side of the comparison a diagnostic came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Base,
    Head,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Base => "base",
            Side::Head => "head",
        }
    }
}

/// A diagnostic tagged with its domain and side.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct ReportDiagnostic {
    pub domain: String,
    pub side: Side,
    #[serde(flatten)]
    pub diagnostic: Diagnostic,
}

/// Per-domain counts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DomainSummary {
    pub name: String,
    pub base_symbols: usize,
    pub head_symbols: usize,
    pub impacts: ImpactSummary,
}

/// Result of one analysis run.
#[derive(Clone, Debug, Serialize)]
pub struct Report {
    pub decision: Decision,
    /// Non-fatal problems; they never influence the decision.
    pub diagnostics: Vec<ReportDiagnostic>,
    pub domains: Vec<DomainSummary>,
}

struct DomainResult {
    impacts: Vec<Impact>,
    diagnostics: Vec<ReportDiagnostic>,
    summary: DomainSummary,
}

/// Compare `base` and `head` across every enabled domain.
pub fn analyse(
    registry: &AnalyserRegistry,
    provider: &dyn SnapshotProvider,
    settings: &AnalysisSettings,
    base: &str,
    head: &str,
) -> CoreResult<Report> {
    let mut enabled: Vec<&str> = settings.enabled.iter().map(|s| s.as_str()).collect();
    enabled.sort_unstable();
    enabled.dedup();

    let analysers = enabled
        .iter()
        .map(|name| registry.lookup(name))
        .collect::<CoreResult<Vec<&Analyser>>>()?;

    let start = Instant::now();
    let results: Vec<CoreResult<DomainResult>> = analysers
        .par_iter()
        .map(|analyser| run_domain(analyser, provider, settings, base, head))
        .collect();

    let mut impacts = Vec::new();
    let mut diagnostics = Vec::new();
    let mut domains = Vec::new();
    for result in results {
        let result = result?;
        impacts.extend(result.impacts);
        diagnostics.extend(result.diagnostics);
        domains.push(result.summary);
    }

    tracing::info!(
        "Analysed {} domain(s) in {:?}: {} impact(s), {} diagnostic(s)",
        domains.len(),
        start.elapsed(),
        impacts.len(),
        diagnostics.len()
    );

    Ok(Report {
        decision: decide(impacts),
        diagnostics,
        domains,
    })
}

fn run_domain(
    analyser: &Analyser,
    provider: &dyn SnapshotProvider,
    settings: &AnalysisSettings,
    base: &str,
    head: &str,
) -> CoreResult<DomainResult> {
    let paths = settings.paths_for(&analyser.name);
    let surface = settings.surface.as_ref();

    let (old, new) = rayon::join(
        || -> CoreResult<_> {
            let snapshot = provider.get(base, paths)?;
            Ok(analyser.extractor.extract(&snapshot, surface))
        },
        || -> CoreResult<_> {
            let snapshot = provider.get(head, paths)?;
            Ok(analyser.extractor.extract(&snapshot, surface))
        },
    );
    let (old, new) = (old?, new?);

    let impacts = analyser
        .differ
        .diff(&old.model, &new.model, &settings.rules, &analyser.name);

    tracing::info!(
        "{}: {} -> {} symbols, {} impact(s)",
        analyser.name,
        old.model.len(),
        new.model.len(),
        impacts.len()
    );

    let tag = |side: Side| {
        move |diagnostic: Diagnostic| ReportDiagnostic {
            domain: analyser.name.clone(),
            side,
            diagnostic,
        }
    };
    let mut diagnostics: Vec<ReportDiagnostic> =
        old.diagnostics.into_iter().map(tag(Side::Base)).collect();
    diagnostics.extend(new.diagnostics.into_iter().map(tag(Side::Head)));

    Ok(DomainResult {
        summary: DomainSummary {
            name: analyser.name.clone(),
            base_symbols: old.model.len(),
            head_symbols: new.model.len(),
            impacts: ImpactSummary::from_impacts(&impacts),
        },
        impacts,
        diagnostics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::BumpLevel;
    use crate::error::CoreError;
    use crate::registry::{CLI, MIGRATIONS};
    use crate::snapshot::MemorySnapshotProvider;

    fn provider() -> MemorySnapshotProvider {
        MemorySnapshotProvider::new()
            .with_file("base", "pkg/api.py", "def greet(name):\n    pass\n")
            .with_file(
                "head",
                "pkg/api.py",
                "def greet(name, force):\n    pass\n\ndef broken(:\n",
            )
            .with_file("head", "pkg/extra.py", "def wave():\n    pass\n")
    }

    #[test]
    fn test_analyse_signatures() {
        let registry = AnalyserRegistry::builtin();
        let settings = AnalysisSettings::default();

        let report = analyse(&registry, &provider(), &settings, "base", "head").unwrap();

        // The broken head file is skipped entirely
        assert_eq!(report.decision.level, BumpLevel::Major);
        assert_eq!(report.diagnostics.len(), 1);
        assert_eq!(report.diagnostics[0].side, Side::Head);
        assert_eq!(report.diagnostics[0].domain, "signatures");
        assert_eq!(report.domains.len(), 1);
        assert_eq!(report.domains[0].base_symbols, 1);
        assert_eq!(report.domains[0].head_symbols, 1);
    }

    #[test]
    fn test_unknown_domain_fails_before_reading() {
        let registry = AnalyserRegistry::builtin();
        let settings = AnalysisSettings {
            enabled: vec!["signatures".to_string(), "graphql".to_string()],
            ..Default::default()
        };

        let err = analyse(&registry, &provider(), &settings, "base", "head").unwrap_err();
        assert!(matches!(err, CoreError::AnalyserNotFound { name } if name == "graphql"));
    }

    #[test]
    fn test_unresolved_reference() {
        let registry = AnalyserRegistry::builtin();
        let settings = AnalysisSettings::default();

        let err = analyse(&registry, &provider(), &settings, "base", "nowhere").unwrap_err();
        assert!(matches!(err, CoreError::Snapshot { reference, .. } if reference == "nowhere"));
    }

    #[test]
    fn test_no_changes_is_none() {
        let registry = AnalyserRegistry::builtin();
        let settings = AnalysisSettings {
            enabled: vec![CLI.to_string(), MIGRATIONS.to_string()],
            ..Default::default()
        };
        let provider = MemorySnapshotProvider::new()
            .with_reference("base")
            .with_reference("head");

        let report = analyse(&registry, &provider, &settings, "base", "head").unwrap();
        assert_eq!(report.decision.level, BumpLevel::None);
        assert_eq!(report.decision.confidence, 1.0);
        let names: Vec<&str> = report.domains.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["cli", "migrations"]);
    }
}
