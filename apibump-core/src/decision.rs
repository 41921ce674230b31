//! Decision engine: reduce impacts to a single bump level.

use std::fmt;

use serde::Serialize;

use crate::differ::{sort_impacts, Impact};
use crate::severity::Severity;

/// Recommended semantic version bump.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BumpLevel {
    None,
    Patch,
    Minor,
    Major,
}

impl BumpLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            BumpLevel::None => "none",
            BumpLevel::Patch => "patch",
            BumpLevel::Minor => "minor",
            BumpLevel::Major => "major",
        }
    }
}

impl From<Severity> for BumpLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Patch => BumpLevel::Patch,
            Severity::Minor => BumpLevel::Minor,
            Severity::Major => BumpLevel::Major,
        }
    }
}

impl fmt::Display for BumpLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated bump decision.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Decision {
    pub level: BumpLevel,
    /// Fraction of impacts whose severity equals `level`, in `[0, 1]`.
    pub confidence: f64,
    /// Descriptions of the impacts at `level`, in report order.
    pub reasons: Vec<String>,
    pub impacts: Vec<Impact>,
}

impl Decision {
    pub fn is_none(&self) -> bool {
        self.level == BumpLevel::None
    }
}

/// Reduce impacts from any number of domains into one decision.
///
/// The result depends only on the multiset of impacts: input order is
/// normalised before reasons are collected.
pub fn decide(mut impacts: Vec<Impact>) -> Decision {
    let Some(top) = impacts.iter().map(|i| i.severity).max() else {
        return Decision {
            level: BumpLevel::None,
            confidence: 1.0,
            reasons: Vec::new(),
            impacts,
        };
    };

    sort_impacts(&mut impacts);

    let reasons: Vec<String> = impacts
        .iter()
        .filter(|i| i.severity == top)
        .map(|i| i.description.clone())
        .collect();
    let confidence = reasons.len() as f64 / impacts.len() as f64;

    Decision {
        level: top.into(),
        confidence,
        reasons,
        impacts,
    }
}
