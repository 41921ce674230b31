//! Change kinds, severities and the rule table mapping one to the other.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Semantic version impact of a single change. Ordered `Patch < Minor < Major`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Patch,
    Minor,
    Major,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Patch => "patch",
            Severity::Minor => "minor",
            Severity::Major => "major",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "patch" => Ok(Severity::Patch),
            "minor" => Ok(Severity::Minor),
            "major" => Ok(Severity::Major),
            _ => Err(CoreError::UnknownSeverity(s.to_string())),
        }
    }
}

/// Classification of a detected difference.
///
/// The set is closed: every kind has a default severity, so an impact can
/// never reach the decision engine without a rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    SymbolAdded,
    SymbolRemoved,
    SymbolBecameRequired,
    SymbolBecameOptional,
    ParamAddedRequired,
    ParamAddedOptional,
    ParamRemovedRequired,
    ParamRemovedOptional,
    ParamKindChanged,
    ParamBecameRequired,
    ParamBecameOptional,
    ParamRenamed,
    ParamAnnotationChanged,
    ReturnChanged,
    ColumnAdded,
    ColumnAddedNonNullable,
    ColumnDropped,
    IndexAdded,
    IndexDropped,
    TableCreated,
    TableDropped,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 21] = [
        ChangeKind::SymbolAdded,
        ChangeKind::SymbolRemoved,
        ChangeKind::SymbolBecameRequired,
        ChangeKind::SymbolBecameOptional,
        ChangeKind::ParamAddedRequired,
        ChangeKind::ParamAddedOptional,
        ChangeKind::ParamRemovedRequired,
        ChangeKind::ParamRemovedOptional,
        ChangeKind::ParamKindChanged,
        ChangeKind::ParamBecameRequired,
        ChangeKind::ParamBecameOptional,
        ChangeKind::ParamRenamed,
        ChangeKind::ParamAnnotationChanged,
        ChangeKind::ReturnChanged,
        ChangeKind::ColumnAdded,
        ChangeKind::ColumnAddedNonNullable,
        ChangeKind::ColumnDropped,
        ChangeKind::IndexAdded,
        ChangeKind::IndexDropped,
        ChangeKind::TableCreated,
        ChangeKind::TableDropped,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeKind::SymbolAdded => "symbol-added",
            ChangeKind::SymbolRemoved => "symbol-removed",
            ChangeKind::SymbolBecameRequired => "symbol-became-required",
            ChangeKind::SymbolBecameOptional => "symbol-became-optional",
            ChangeKind::ParamAddedRequired => "param-added-required",
            ChangeKind::ParamAddedOptional => "param-added-optional",
            ChangeKind::ParamRemovedRequired => "param-removed-required",
            ChangeKind::ParamRemovedOptional => "param-removed-optional",
            ChangeKind::ParamKindChanged => "param-kind-changed",
            ChangeKind::ParamBecameRequired => "param-became-required",
            ChangeKind::ParamBecameOptional => "param-became-optional",
            ChangeKind::ParamRenamed => "param-renamed",
            ChangeKind::ParamAnnotationChanged => "param-annotation-changed",
            ChangeKind::ReturnChanged => "return-changed",
            ChangeKind::ColumnAdded => "column-added",
            ChangeKind::ColumnAddedNonNullable => "column-added-non-nullable",
            ChangeKind::ColumnDropped => "column-dropped",
            ChangeKind::IndexAdded => "index-added",
            ChangeKind::IndexDropped => "index-dropped",
            ChangeKind::TableCreated => "table-created",
            ChangeKind::TableDropped => "table-dropped",
        }
    }

    /// Built-in severity used when no override applies.
    pub fn default_severity(&self) -> Severity {
        match self {
            ChangeKind::SymbolRemoved
            | ChangeKind::SymbolBecameRequired
            | ChangeKind::ParamAddedRequired
            | ChangeKind::ParamRemovedRequired
            | ChangeKind::ParamKindChanged
            | ChangeKind::ParamBecameRequired
            | ChangeKind::ParamRenamed
            | ChangeKind::ColumnAddedNonNullable
            | ChangeKind::ColumnDropped
            | ChangeKind::TableDropped => Severity::Major,
            ChangeKind::SymbolAdded
            | ChangeKind::SymbolBecameOptional
            | ChangeKind::ParamAddedOptional
            | ChangeKind::ParamRemovedOptional
            | ChangeKind::ParamBecameOptional
            | ChangeKind::ReturnChanged
            | ChangeKind::ColumnAdded
            | ChangeKind::IndexAdded
            | ChangeKind::IndexDropped
            | ChangeKind::TableCreated => Severity::Minor,
            ChangeKind::ParamAnnotationChanged => Severity::Patch,
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('_', "-");
        ChangeKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == wanted)
            .ok_or_else(|| CoreError::UnknownChangeKind(s.to_string()))
    }
}

/// Severity rules: built-in defaults plus caller-supplied overrides.
///
/// Lookup precedence is domain + kind override, then kind override, then the
/// kind's default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeverityTable {
    by_kind: HashMap<ChangeKind, Severity>,
    by_domain: HashMap<(String, ChangeKind), Severity>,
}

impl Default for SeverityTable {
    fn default() -> Self {
        let mut table = Self::empty();
        // Property type changes in a published schema break clients.
        table.by_domain.insert(
            ("openapi".to_string(), ChangeKind::ParamAnnotationChanged),
            Severity::Major,
        );
        table
    }
}

impl SeverityTable {
    /// Table with no overrides at all, only per-kind defaults.
    pub fn empty() -> Self {
        Self {
            by_kind: HashMap::new(),
            by_domain: HashMap::new(),
        }
    }

    /// Override the severity of `kind` in every domain.
    pub fn with_override(mut self, kind: ChangeKind, severity: Severity) -> Self {
        self.by_kind.insert(kind, severity);
        self
    }

    /// Override the severity of `kind` in one domain only.
    pub fn with_domain_override(
        mut self,
        domain: impl Into<String>,
        kind: ChangeKind,
        severity: Severity,
    ) -> Self {
        self.by_domain.insert((domain.into(), kind), severity);
        self
    }

    /// Resolve the severity of `kind` for `domain`.
    pub fn severity_for(&self, kind: ChangeKind, domain: &str) -> Severity {
        if let Some(severity) = self.by_domain.get(&(domain.to_string(), kind)) {
            return *severity;
        }
        self.by_kind
            .get(&kind)
            .copied()
            .unwrap_or_else(|| kind.default_severity())
    }
}
