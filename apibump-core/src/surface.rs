//! Public surface filters.
//!
//! Extractors consult a [`SurfaceFilter`] before adding a symbol to a model.
//! The filter is supplied by the caller; extractors never decide visibility
//! on their own beyond what the syntax states (e.g. a module's `__all__`).

use regex::Regex;

use crate::error::{CoreError, CoreResult};

/// Decides whether a qualified name belongs to the supported interface.
pub trait SurfaceFilter: Send + Sync {
    fn is_public(&self, qualified_name: &str) -> bool;
}

/// Filter that accepts every name.
#[derive(Clone, Copy, Debug, Default)]
pub struct Everything;

impl SurfaceFilter for Everything {
    fn is_public(&self, _qualified_name: &str) -> bool {
        true
    }
}

/// Name-based visibility rules.
///
/// A name is public when:
/// - `hide_private` is off, or no dotted segment of its local part (the text
///   after the last `:`) starts with `_`
/// - at least one include pattern matches, when any are given
/// - no exclude pattern matches
#[derive(Clone, Debug)]
pub struct VisibilityRules {
    hide_private: bool,
    include: Vec<Regex>,
    exclude: Vec<Regex>,
}

impl Default for VisibilityRules {
    fn default() -> Self {
        Self {
            hide_private: true,
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

impl VisibilityRules {
    pub fn new(hide_private: bool, include: &[String], exclude: &[String]) -> CoreResult<Self> {
        Ok(Self {
            hide_private,
            include: compile(include)?,
            exclude: compile(exclude)?,
        })
    }
}

fn compile(patterns: &[String]) -> CoreResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| CoreError::InvalidPattern {
                pattern: p.clone(),
                source: Box::new(e),
            })
        })
        .collect()
}

/// Whether any segment of the local part of `qualified_name` is private.
pub fn is_private_name(qualified_name: &str) -> bool {
    let local = qualified_name
        .rsplit_once(':')
        .map(|(_, local)| local)
        .unwrap_or(qualified_name);
    local.split('.').any(|segment| segment.starts_with('_'))
}

impl SurfaceFilter for VisibilityRules {
    fn is_public(&self, qualified_name: &str) -> bool {
        if self.hide_private && is_private_name(qualified_name) {
            return false;
        }
        if !self.include.is_empty() && !self.include.iter().any(|r| r.is_match(qualified_name)) {
            return false;
        }
        !self.exclude.iter().any(|r| r.is_match(qualified_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_segments() {
        assert!(is_private_name("pkg.mod:_helper"));
        assert!(is_private_name("pkg.mod:Client._retry"));
        assert!(is_private_name("pkg.mod:Client.__init__"));
        assert!(!is_private_name("pkg._internal:run"));
        assert!(!is_private_name("GET /users"));
    }

    #[test]
    fn test_default_rules_hide_private() {
        let rules = VisibilityRules::default();
        assert!(rules.is_public("pkg:greet"));
        assert!(!rules.is_public("pkg:_greet"));
    }

    #[test]
    fn test_include_and_exclude() {
        let rules = VisibilityRules::new(
            false,
            &["^pkg\\.".to_string()],
            &["experimental".to_string()],
        )
        .unwrap();

        assert!(rules.is_public("pkg.api:_greet"));
        assert!(!rules.is_public("other.api:greet"));
        assert!(!rules.is_public("pkg.experimental:greet"));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = VisibilityRules::new(true, &["(".to_string()], &[]).unwrap_err();
        assert!(matches!(err, CoreError::InvalidPattern { .. }));
    }
}
