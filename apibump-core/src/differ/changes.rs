//! Impact records and per-domain summaries.

use std::cmp::Ordering;

use serde::Serialize;

use crate::severity::{ChangeKind, Severity};

/// Which ordering bucket an impact belongs to.
///
/// Removed symbols come first, then added symbols, then changes inside
/// symbols present on both sides.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ImpactGroup {
    Removal,
    Addition,
    Change,
}

/// One detected, classified difference between two models.
///
/// Serialises to the `{severity, symbol, reason}` shape consumed by
/// downstream reporting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Impact {
    pub severity: Severity,

    /// Qualified name or domain-specific locator of the affected symbol
    pub symbol: String,

    #[serde(skip)]
    pub change_kind: ChangeKind,

    #[serde(rename = "reason")]
    pub description: String,

    /// Domain that produced the impact
    #[serde(skip)]
    pub domain: String,

    #[serde(skip)]
    pub group: ImpactGroup,

    /// Parameter position for parameter-level changes
    #[serde(skip)]
    pub position: Option<u32>,
}

impl Impact {
    pub fn new(
        severity: Severity,
        symbol: impl Into<String>,
        change_kind: ChangeKind,
        description: impl Into<String>,
    ) -> Self {
        let group = match change_kind {
            ChangeKind::SymbolRemoved => ImpactGroup::Removal,
            ChangeKind::SymbolAdded => ImpactGroup::Addition,
            _ => ImpactGroup::Change,
        };
        Self {
            severity,
            symbol: symbol.into(),
            change_kind,
            description: description.into(),
            domain: String::new(),
            group,
            position: None,
        }
    }

    /// Set the domain.
    pub fn in_domain(mut self, domain: &str) -> Self {
        self.domain = domain.to_string();
        self
    }

    /// Set the ordering group.
    pub fn in_group(mut self, group: ImpactGroup) -> Self {
        self.group = group;
        self
    }

    /// Set the parameter position.
    pub fn at_position(mut self, position: u32) -> Self {
        self.position = Some(position);
        self
    }

    /// Report order: group, then symbol, then parameter position with
    /// symbol-level changes after parameter-level ones. At one position a
    /// removal sorts before an addition. Domain and description break the
    /// remaining ties so the order never depends on how impacts arrived.
    pub fn report_order(&self, other: &Self) -> Ordering {
        self.group
            .cmp(&other.group)
            .then_with(|| self.symbol.cmp(&other.symbol))
            .then_with(|| {
                let a = self.position.unwrap_or(u32::MAX);
                let b = other.position.unwrap_or(u32::MAX);
                a.cmp(&b)
            })
            .then_with(|| member_rank(self.change_kind).cmp(&member_rank(other.change_kind)))
            .then_with(|| self.domain.cmp(&other.domain))
            .then_with(|| self.description.cmp(&other.description))
    }
}

fn member_rank(kind: ChangeKind) -> u8 {
    match kind {
        ChangeKind::ParamRemovedRequired | ChangeKind::ParamRemovedOptional => 0,
        ChangeKind::ParamAddedRequired | ChangeKind::ParamAddedOptional => 1,
        _ => 2,
    }
}

/// Sort impacts into report order.
pub fn sort_impacts(impacts: &mut [Impact]) {
    impacts.sort_by(|a, b| a.report_order(b));
}

/// Severity counts for a list of impacts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ImpactSummary {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl ImpactSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_impacts(impacts: &[Impact]) -> Self {
        let mut summary = Self::new();
        for impact in impacts {
            summary.record(impact.severity);
        }
        summary
    }

    /// Increment the counter for `severity`.
    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Major => self.major += 1,
            Severity::Minor => self.minor += 1,
            Severity::Patch => self.patch += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.major + self.minor + self.patch
    }

    /// Generate human-readable summary string.
    pub fn text(&self) -> String {
        let mut parts = Vec::new();
        if self.major > 0 {
            parts.push(format!("{} major", self.major));
        }
        if self.minor > 0 {
            parts.push(format!("{} minor", self.minor));
        }
        if self.patch > 0 {
            parts.push(format!("{} patch", self.patch));
        }

        if parts.is_empty() {
            "No changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}
