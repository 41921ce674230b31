//! End-to-end scenarios: Python sources at two references in, decision out.

use apibump_core::differ::{Differ, SignatureDiffer};
use apibump_core::parser::{Extractor, SignatureExtractor};
use apibump_core::snapshot::MemorySnapshotProvider;
use apibump_core::{
    analyse, decide, AnalyserRegistry, AnalysisSettings, BumpLevel, ChangeKind, Decision,
    Everything, Impact, Severity, SeverityTable, Snapshot,
};

// ============================================================================
// Test Utilities
// ============================================================================

fn snapshot(reference: &str, source: &str) -> Snapshot {
    let mut snapshot = Snapshot::new(reference, &[".".to_string()]);
    snapshot.insert("demo.py", source);
    snapshot
}

/// Extract both sides of `demo.py` and diff them with the default rules.
fn compare(old: &str, new: &str) -> (Vec<Impact>, Decision) {
    let old = SignatureExtractor.extract(&snapshot("base", old), &Everything);
    let new = SignatureExtractor.extract(&snapshot("head", new), &Everything);
    assert!(old.diagnostics.is_empty());
    assert!(new.diagnostics.is_empty());

    let impacts = SignatureDiffer::new().diff(
        &old.model,
        &new.model,
        &SeverityTable::default(),
        "signatures",
    );
    let decision = decide(impacts.clone());
    (impacts, decision)
}

fn kinds(impacts: &[Impact]) -> Vec<(ChangeKind, Severity, &str)> {
    impacts
        .iter()
        .map(|i| (i.change_kind, i.severity, i.symbol.as_str()))
        .collect()
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn test_scenario_a_added_symbol() {
    let (impacts, decision) = compare("", "def greet():\n    pass\n");

    assert_eq!(
        kinds(&impacts),
        vec![(ChangeKind::SymbolAdded, Severity::Minor, "demo:greet")]
    );
    assert_eq!(decision.level, BumpLevel::Minor);
    assert_eq!(decision.confidence, 1.0);
    assert_eq!(decision.reasons, vec!["Added public symbol"]);
}

#[test]
fn test_scenario_b_required_param_added() {
    let (impacts, decision) = compare(
        "def greet(name):\n    pass\n",
        "def greet(name, force):\n    pass\n",
    );

    assert_eq!(
        kinds(&impacts),
        vec![(ChangeKind::ParamAddedRequired, Severity::Major, "demo:greet")]
    );
    assert_eq!(impacts[0].position, Some(1));
    assert_eq!(decision.level, BumpLevel::Major);
    assert_eq!(decision.reasons, vec!["Added required param 'force'"]);
}

#[test]
fn test_scenario_c_optional_param_removed() {
    let (impacts, decision) = compare(
        "def greet(name, verbose=True):\n    pass\n",
        "def greet(name):\n    pass\n",
    );

    assert_eq!(
        kinds(&impacts),
        vec![(ChangeKind::ParamRemovedOptional, Severity::Minor, "demo:greet")]
    );
    assert_eq!(decision.level, BumpLevel::Minor);
}

#[test]
fn test_scenario_d_return_annotation_changed() {
    let (impacts, decision) = compare(
        "def greet(name) -> str:\n    pass\n\ndef wave():\n    pass\n",
        "def greet(name) -> int:\n    pass\n\ndef wave():\n    pass\n",
    );

    assert_eq!(
        kinds(&impacts),
        vec![(ChangeKind::ReturnChanged, Severity::Minor, "demo:greet")]
    );
    assert_eq!(decision.level, BumpLevel::Minor);
    assert_eq!(decision.reasons, vec!["Return annotation changed"]);
}

#[test]
fn test_scenario_e_removal_and_addition() {
    let (impacts, decision) = compare(
        "def a():\n    pass\n\ndef b():\n    pass\n",
        "def b():\n    pass\n\ndef c():\n    pass\n",
    );

    assert_eq!(
        kinds(&impacts),
        vec![
            (ChangeKind::SymbolRemoved, Severity::Major, "demo:a"),
            (ChangeKind::SymbolAdded, Severity::Minor, "demo:c"),
        ]
    );
    assert_eq!(decision.level, BumpLevel::Major);
    assert_eq!(decision.confidence, 0.5);
    assert_eq!(decision.reasons, vec!["Removed public symbol"]);
}

// ============================================================================
// Driver
// ============================================================================

#[test]
fn test_rename_reads_as_removal_plus_addition() {
    let (impacts, decision) = compare(
        "def greet(name):\n    pass\n",
        "def welcome(name):\n    pass\n",
    );

    assert_eq!(impacts.len(), 2);
    assert_eq!(decision.level, BumpLevel::Major);
}

#[test]
fn test_private_names_are_not_surface() {
    let provider = MemorySnapshotProvider::new()
        .with_file("v1", "pkg/api.py", "def run():\n    pass\n")
        .with_file(
            "v2",
            "pkg/api.py",
            "def run():\n    pass\n\ndef _helper(x):\n    pass\n\nclass _Impl:\n    def go(self):\n        pass\n",
        );

    let report = analyse(
        &AnalyserRegistry::builtin(),
        &provider,
        &AnalysisSettings::default(),
        "v1",
        "v2",
    )
    .unwrap();

    assert!(report.decision.is_none());
}

#[test]
fn test_several_domains_aggregate() {
    let provider = MemorySnapshotProvider::new()
        .with_file(
            "v1",
            "tool/cli.py",
            "import click\n\n@click.command()\n@click.option(\"--name\")\ndef main(name):\n    pass\n",
        )
        .with_file(
            "v1",
            "migrations/versions/001_init.py",
            "def upgrade():\n    op.create_table(\"users\")\n",
        )
        .with_file(
            "v2",
            "tool/cli.py",
            "import click\n\n@click.command()\n@click.option(\"--name\", required=True)\ndef main(name):\n    pass\n",
        )
        .with_file(
            "v2",
            "migrations/versions/001_init.py",
            "def upgrade():\n    op.create_table(\"users\")\n",
        )
        .with_file(
            "v2",
            "migrations/versions/002_email.py",
            "def upgrade():\n    op.add_column(\"users\", sa.Column(\"email\", sa.String()))\n",
        );

    let mut settings = AnalysisSettings {
        enabled: vec!["migrations".to_string(), "cli".to_string()],
        public_roots: vec!["tool".to_string()],
        ..Default::default()
    };
    settings
        .domain_paths
        .insert("migrations".to_string(), vec!["migrations".to_string()]);

    let report = analyse(&AnalyserRegistry::builtin(), &provider, &settings, "v1", "v2").unwrap();
    let decision = &report.decision;

    assert_eq!(decision.level, BumpLevel::Major);
    assert_eq!(decision.reasons, vec!["Option 'name' became required"]);
    assert_eq!(decision.confidence, 0.5);
    assert_eq!(decision.impacts[0].change_kind, ChangeKind::ColumnAdded);
    assert_eq!(
        decision.impacts[0].symbol,
        "migrations/versions/002_email.py:add_column(users.email)"
    );
    assert_eq!(decision.impacts[1].symbol, "<root>");

    let domains: Vec<(&str, usize, usize)> = report
        .domains
        .iter()
        .map(|d| (d.name.as_str(), d.base_symbols, d.head_symbols))
        .collect();
    assert_eq!(domains, vec![("cli", 1, 1), ("migrations", 1, 2)]);
}

#[test]
fn test_overrides_change_the_decision() {
    let provider = MemorySnapshotProvider::new()
        .with_file("v1", "demo.py", "def greet(name):\n    pass\n")
        .with_file("v2", "demo.py", "def greet(name, loud=False):\n    pass\n");
    let settings = AnalysisSettings {
        rules: SeverityTable::default()
            .with_override(ChangeKind::ParamAddedOptional, Severity::Patch),
        ..Default::default()
    };

    let report = analyse(&AnalyserRegistry::builtin(), &provider, &settings, "v1", "v2").unwrap();
    assert_eq!(report.decision.level, BumpLevel::Patch);
    assert_eq!(report.decision.reasons, vec!["Added optional param 'loud'"]);
}
