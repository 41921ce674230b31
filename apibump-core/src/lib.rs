//! apibump core - semantic version bump recommendations.
//!
//! Compares the public interface of a Python project at two version-control
//! references and recommends a `major`, `minor`, `patch` or `none` bump.
//!
//! # Pipeline
//!
//! - A [`SnapshotProvider`] resolves each reference to file contents
//! - Each enabled domain's [`Extractor`](parser::Extractor) builds a
//!   [`Model`] of public symbols (signatures, web routes, CLI commands,
//!   migrations, OpenAPI endpoints)
//! - A [`Differ`](differ::Differ) compares the two models and classifies
//!   every difference through the [`SeverityTable`]
//! - [`decide`] reduces all impacts to one [`Decision`]
//!
//! # Example
//!
//! ```
//! use apibump_core::{analyse, AnalyserRegistry, AnalysisSettings, BumpLevel};
//! use apibump_core::snapshot::MemorySnapshotProvider;
//!
//! let provider = MemorySnapshotProvider::new()
//!     .with_file("v1", "pkg/api.py", "def greet(name):\n    pass\n")
//!     .with_file("v2", "pkg/api.py", "def greet(name, loud=False):\n    pass\n");
//!
//! let registry = AnalyserRegistry::builtin();
//! let report = analyse(&registry, &provider, &AnalysisSettings::default(), "v1", "v2")?;
//! assert_eq!(report.decision.level, BumpLevel::Minor);
//! # Ok::<(), apibump_core::CoreError>(())
//! ```

pub mod decision;
pub mod differ;
pub mod engine;
pub mod error;
pub mod exporter;
pub mod model;
pub mod parser;
pub mod registry;
pub mod severity;
pub mod snapshot;
pub mod surface;

pub use decision::{decide, BumpLevel, Decision};
pub use differ::{Impact, ImpactSummary};
pub use engine::{analyse, AnalysisSettings, DomainSummary, Report, ReportDiagnostic, Side};
pub use error::{CoreError, CoreResult};
pub use model::{Diagnostic, Extraction, Model, ParamKind, Parameter, Symbol, SymbolKind};
pub use registry::{Analyser, AnalyserRegistry};
pub use severity::{ChangeKind, Severity, SeverityTable};
pub use snapshot::{DirectorySnapshotProvider, PathFilter, Snapshot, SnapshotProvider};
pub use surface::{Everything, SurfaceFilter, VisibilityRules};
