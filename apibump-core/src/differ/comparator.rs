//! Comparator logic for diffing two interface models.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::differ::changes::{sort_impacts, Impact, ImpactGroup};
use crate::differ::Differ;
use crate::model::{Model, Parameter, Symbol, SymbolKind};
use crate::severity::{ChangeKind, SeverityTable};

/// Differ for any model whose symbols carry parameter signatures.
#[derive(Clone, Copy, Debug)]
pub struct SignatureDiffer {
    positional_fallback: bool,
}

impl Default for SignatureDiffer {
    fn default() -> Self {
        Self::new()
    }
}

impl SignatureDiffer {
    /// Match parameters by name, then by position for the leftovers.
    pub fn new() -> Self {
        Self {
            positional_fallback: true,
        }
    }

    /// Match parameters by name only. For domains where parameter order
    /// carries no meaning (route params, CLI options, schema properties).
    pub fn by_name() -> Self {
        Self {
            positional_fallback: false,
        }
    }
}

impl Differ for SignatureDiffer {
    fn diff(&self, old: &Model, new: &Model, rules: &SeverityTable, domain: &str) -> Vec<Impact> {
        diff_models(old, new, rules, domain, self.positional_fallback)
    }
}

/// Differ for migration models: added operations are classified by what the
/// operation does to the schema.
///
/// Removed operations (a deleted or squashed migration) produce no impacts.
#[derive(Clone, Copy, Debug, Default)]
pub struct MigrationDiffer;

impl Differ for MigrationDiffer {
    fn diff(&self, old: &Model, new: &Model, rules: &SeverityTable, domain: &str) -> Vec<Impact> {
        diff_models(old, new, rules, domain, false)
            .into_iter()
            .filter_map(|impact| match impact.change_kind {
                ChangeKind::SymbolRemoved => {
                    let classified = old.get(&impact.symbol).and_then(migration_change);
                    classified.is_none().then_some(impact)
                }
                ChangeKind::SymbolAdded => {
                    match new.get(&impact.symbol).and_then(migration_change) {
                        Some((kind, description)) => Some(
                            Impact::new(
                                rules.severity_for(kind, domain),
                                impact.symbol,
                                kind,
                                description,
                            )
                            .in_domain(domain)
                            .in_group(ImpactGroup::Addition),
                        ),
                        None => Some(impact),
                    }
                }
                _ => Some(impact),
            })
            .collect()
    }
}

/// Classify an added migration operation.
fn migration_change(symbol: &Symbol) -> Option<(ChangeKind, &'static str)> {
    if symbol.kind != SymbolKind::MigrationOp {
        return None;
    }
    match symbol.return_shape.as_deref()? {
        "add_column" if symbol.required => {
            Some((ChangeKind::ColumnAddedNonNullable, "Added non-nullable column"))
        }
        "add_column" => Some((ChangeKind::ColumnAdded, "Added column")),
        "drop_column" => Some((ChangeKind::ColumnDropped, "Dropped column")),
        "create_index" => Some((ChangeKind::IndexAdded, "Added index")),
        "drop_index" => Some((ChangeKind::IndexDropped, "Dropped index")),
        "create_table" => Some((ChangeKind::TableCreated, "Created table")),
        "drop_table" => Some((ChangeKind::TableDropped, "Dropped table")),
        _ => None,
    }
}

/// Compute impacts between two models.
fn diff_models(
    old: &Model,
    new: &Model,
    rules: &SeverityTable,
    domain: &str,
    positional_fallback: bool,
) -> Vec<Impact> {
    let mut impacts = Vec::new();

    // Removed symbols
    for symbol in old.symbols().filter(|s| !new.contains(&s.qualified_name)) {
        let kind = ChangeKind::SymbolRemoved;
        impacts.push(
            Impact::new(
                rules.severity_for(kind, domain),
                symbol.qualified_name.clone(),
                kind,
                format!("Removed {}", symbol.kind.noun()),
            )
            .in_domain(domain),
        );
    }

    // Added symbols
    for symbol in new.symbols().filter(|s| !old.contains(&s.qualified_name)) {
        let kind = ChangeKind::SymbolAdded;
        impacts.push(
            Impact::new(
                rules.severity_for(kind, domain),
                symbol.qualified_name.clone(),
                kind,
                format!("Added {}", symbol.kind.noun()),
            )
            .in_domain(domain),
        );
    }

    // Surviving symbols - diff in parallel, collected in name order
    let common: Vec<(&Symbol, &Symbol)> = old
        .symbols()
        .filter_map(|o| new.get(&o.qualified_name).map(|n| (o, n)))
        .collect();

    let symbol_changes: Vec<Vec<Impact>> = common
        .par_iter()
        .map(|(o, n)| diff_symbols(o, n, rules, domain, positional_fallback))
        .collect();

    impacts.extend(symbol_changes.into_iter().flatten());
    sort_impacts(&mut impacts);
    impacts
}

/// Result of pairing two parameter lists.
#[derive(Debug, Default)]
struct ParamMatching<'a> {
    pairs: Vec<(&'a Parameter, &'a Parameter)>,
    removed: Vec<&'a Parameter>,
    added: Vec<&'a Parameter>,
}

/// Pair parameters by name, then (optionally) pair the leftovers in
/// ascending position order.
fn match_parameters<'a>(
    old: &'a [Parameter],
    new: &'a [Parameter],
    positional_fallback: bool,
) -> ParamMatching<'a> {
    let mut new_by_name: HashMap<&str, usize> = HashMap::new();
    for (idx, param) in new.iter().enumerate() {
        new_by_name.entry(param.name.as_str()).or_insert(idx);
    }

    let mut matching = ParamMatching::default();
    let mut new_used = vec![false; new.len()];
    let mut old_left = Vec::new();

    for param in old {
        match new_by_name.get(param.name.as_str()) {
            Some(&idx) if !new_used[idx] => {
                new_used[idx] = true;
                matching.pairs.push((param, &new[idx]));
            }
            _ => old_left.push(param),
        }
    }

    let mut new_left: Vec<&Parameter> = new
        .iter()
        .zip(new_used.iter())
        .filter(|(_, used)| !**used)
        .map(|(p, _)| p)
        .collect();

    old_left.sort_by_key(|p| p.position);
    new_left.sort_by_key(|p| p.position);

    if positional_fallback {
        let paired = old_left.len().min(new_left.len());
        for (o, n) in old_left.drain(..paired).zip(new_left.drain(..paired)) {
            matching.pairs.push((o, n));
        }
    }

    matching.removed = old_left;
    matching.added = new_left;
    matching
}

/// Diff two symbols that share a qualified name.
fn diff_symbols(
    old: &Symbol,
    new: &Symbol,
    rules: &SeverityTable,
    domain: &str,
    positional_fallback: bool,
) -> Vec<Impact> {
    let mut impacts = Vec::new();
    let member = new.kind.member_noun();
    let name = new.qualified_name.as_str();

    let emit = |kind: ChangeKind, description: String| {
        Impact::new(rules.severity_for(kind, domain), name, kind, description).in_domain(domain)
    };

    let matching = match_parameters(&old.signature, &new.signature, positional_fallback);

    // Removed parameters
    for param in &matching.removed {
        let (kind, label) = if param.required {
            (ChangeKind::ParamRemovedRequired, "required")
        } else {
            (ChangeKind::ParamRemovedOptional, "optional")
        };
        impacts.push(
            emit(kind, format!("Removed {} {} '{}'", label, member, param.name))
                .at_position(param.position),
        );
    }

    // Added parameters
    for param in &matching.added {
        let (kind, label) = if param.required {
            (ChangeKind::ParamAddedRequired, "required")
        } else {
            (ChangeKind::ParamAddedOptional, "optional")
        };
        impacts.push(
            emit(kind, format!("Added {} {} '{}'", label, member, param.name))
                .at_position(param.position),
        );
    }

    // Matched parameters
    let member_title = capitalize(member);
    for (o, n) in &matching.pairs {
        let position = n.position;

        // Variadics are never passed by name
        let same_variadic = o.kind == n.kind && o.kind.is_variadic();
        if o.name != n.name && !same_variadic {
            impacts.push(
                emit(
                    ChangeKind::ParamRenamed,
                    format!("{} '{}' renamed to '{}'", member_title, o.name, n.name),
                )
                .at_position(position),
            );
        }
        if o.kind != n.kind {
            impacts.push(
                emit(
                    ChangeKind::ParamKindChanged,
                    format!(
                        "{} '{}' kind changed {} -> {}",
                        member_title,
                        n.name,
                        o.kind.as_str(),
                        n.kind.as_str()
                    ),
                )
                .at_position(position),
            );
        }
        if o.required && !n.required {
            impacts.push(
                emit(
                    ChangeKind::ParamBecameOptional,
                    format!("{} '{}' became optional", member_title, n.name),
                )
                .at_position(position),
            );
        }
        if !o.required && n.required {
            impacts.push(
                emit(
                    ChangeKind::ParamBecameRequired,
                    format!("{} '{}' became required", member_title, n.name),
                )
                .at_position(position),
            );
        }
        if o.annotation != n.annotation {
            impacts.push(
                emit(
                    ChangeKind::ParamAnnotationChanged,
                    format!("{} '{}' annotation changed", member_title, n.name),
                )
                .at_position(position),
            );
        }
    }

    // Symbol-level changes
    let noun_title = capitalize(new.kind.noun());
    if old.required && !new.required {
        impacts.push(emit(
            ChangeKind::SymbolBecameOptional,
            format!("{} became optional", noun_title),
        ));
    }
    if !old.required && new.required {
        impacts.push(emit(
            ChangeKind::SymbolBecameRequired,
            format!("{} became required", noun_title),
        ));
    }
    if old.return_shape != new.return_shape {
        let description = match new.kind {
            SymbolKind::Function | SymbolKind::Method => "Return annotation changed",
            SymbolKind::Field => "Field type changed",
            _ => "Return shape changed",
        };
        impacts.push(emit(ChangeKind::ReturnChanged, description.to_string()));
    }

    impacts
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
