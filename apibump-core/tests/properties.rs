//! Property tests for the differ and the decision engine.
//!
//! Models are generated over a small name space so that old and new models
//! overlap often enough to exercise parameter matching.

use apibump_core::differ::{Differ, MigrationDiffer, SignatureDiffer};
use apibump_core::{
    decide, BumpLevel, ChangeKind, Impact, Model, ParamKind, Parameter, Severity, SeverityTable,
    Symbol, SymbolKind,
};
use proptest::prelude::*;

// ============================================================================
// Strategies
// ============================================================================

fn param_kind() -> impl Strategy<Value = ParamKind> {
    prop_oneof![
        Just(ParamKind::PositionalOnly),
        Just(ParamKind::PositionalOrKeyword),
        Just(ParamKind::KeywordOnly),
        Just(ParamKind::VariadicPositional),
        Just(ParamKind::VariadicKeyword),
    ]
}

fn signature() -> impl Strategy<Value = Vec<Parameter>> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["a", "b", "c", "d"]),
            param_kind(),
            any::<bool>(),
            prop::option::of(prop::sample::select(vec!["int", "str"])),
        ),
        0..4,
    )
    .prop_map(|params| {
        let mut seen = Vec::new();
        params
            .into_iter()
            .filter(|(name, ..)| {
                let fresh = !seen.contains(name);
                seen.push(*name);
                fresh
            })
            .enumerate()
            .map(|(position, (name, kind, required, annotation))| {
                let param = Parameter::new(name, position as u32, kind, required);
                match annotation {
                    Some(annotation) => param.with_annotation(annotation),
                    None => param,
                }
            })
            .collect()
    })
}

fn model() -> impl Strategy<Value = Model> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["m:f", "m:g", "m:h", "m:C.run", "n:f"]),
            signature(),
            prop::option::of(prop::sample::select(vec!["None", "int"])),
        ),
        0..5,
    )
    .prop_map(|symbols| {
        symbols
            .into_iter()
            .map(|(name, signature, shape)| {
                Symbol::new(name, SymbolKind::Function)
                    .with_signature(signature)
                    .with_return_shape(shape.map(str::to_string))
            })
            .collect()
    })
}

fn migration_model() -> impl Strategy<Value = Model> {
    prop::collection::vec(
        (
            prop::sample::select(vec!["m/001.py", "m/002.py"]),
            prop::sample::select(vec!["add_column", "drop_column", "create_table"]),
        ),
        0..5,
    )
    .prop_map(|ops| {
        ops.into_iter()
            .map(|(file, op)| {
                let required = op == "add_column" && file == "m/002.py";
                Symbol::new(format!("{}:{}(t.c)", file, op), SymbolKind::MigrationOp)
                    .with_return_shape(Some(op.to_string()))
                    .required(required)
            })
            .collect()
    })
}

fn severity() -> impl Strategy<Value = Severity> {
    prop_oneof![
        Just(Severity::Patch),
        Just(Severity::Minor),
        Just(Severity::Major),
    ]
}

fn impacts() -> impl Strategy<Value = Vec<Impact>> {
    prop::collection::vec(
        (severity(), prop::sample::select(vec!["x", "y", "z"])),
        0..12,
    )
    .prop_map(|items| {
        items
            .into_iter()
            .map(|(severity, symbol)| {
                Impact::new(
                    severity,
                    symbol,
                    ChangeKind::ReturnChanged,
                    format!("{} on {}", severity, symbol),
                )
            })
            .collect()
    })
}

fn diff(old: &Model, new: &Model) -> Vec<Impact> {
    SignatureDiffer::new().diff(old, new, &SeverityTable::default(), "signatures")
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn test_diff_against_itself_is_empty(m in model()) {
        prop_assert!(diff(&m, &m).is_empty());
    }

    #[test]
    fn test_removals_mirror_additions(a in model(), b in model()) {
        let names = |impacts: &[Impact], kind: ChangeKind| -> Vec<String> {
            impacts
                .iter()
                .filter(|i| i.change_kind == kind)
                .map(|i| i.symbol.clone())
                .collect()
        };
        let forward = diff(&a, &b);
        let backward = diff(&b, &a);

        prop_assert_eq!(
            names(&forward, ChangeKind::SymbolRemoved),
            names(&backward, ChangeKind::SymbolAdded)
        );
        prop_assert_eq!(
            names(&forward, ChangeKind::SymbolAdded),
            names(&backward, ChangeKind::SymbolRemoved)
        );
    }

    #[test]
    fn test_migration_diff_only_reports_additions(a in migration_model(), b in migration_model()) {
        let impacts = MigrationDiffer.diff(&a, &b, &SeverityTable::default(), "migrations");
        let added: Vec<&str> = b
            .names()
            .filter(|name| !a.contains(name))
            .collect();
        let reported: Vec<&str> = impacts.iter().map(|i| i.symbol.as_str()).collect();

        prop_assert!(impacts.iter().all(|i| i.change_kind != ChangeKind::SymbolRemoved));
        prop_assert_eq!(reported.len(), added.len());
        prop_assert!(reported.iter().all(|name| added.contains(name)));
    }

    #[test]
    fn test_diff_and_decision_are_deterministic(a in model(), b in model()) {
        let first = diff(&a, &b);
        let second = diff(&a, &b);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(decide(first), decide(second));
    }

    #[test]
    fn test_decision_ignores_input_order(impacts in impacts()) {
        let mut reversed = impacts.clone();
        reversed.reverse();
        prop_assert_eq!(decide(impacts), decide(reversed));
    }

    #[test]
    fn test_confidence_bounds(impacts in impacts()) {
        let all_same = impacts.windows(2).all(|w| w[0].severity == w[1].severity);
        let decision = decide(impacts);

        prop_assert!((0.0..=1.0).contains(&decision.confidence));
        prop_assert_eq!(decision.confidence == 1.0, all_same);
    }

    #[test]
    fn test_level_is_maximum_severity(impacts in impacts()) {
        let top = impacts.iter().map(|i| i.severity).max();
        let decision = decide(impacts);

        match top {
            Some(top) => prop_assert_eq!(decision.level, BumpLevel::from(top)),
            None => prop_assert!(decision.is_none()),
        }
        prop_assert!(decision
            .impacts
            .iter()
            .all(|i| BumpLevel::from(i.severity) <= decision.level));
    }
}
