//! Command-line interfaces declared with click or argparse.
//!
//! Commands are keyed by their path below the root command (`<root>` for the
//! root itself, `db migrate` for a nested subcommand). Each command's options
//! and arguments form its signature.
//!
//! Recognised click shapes: `@click.command()`, `@click.group()`,
//! `@<group>.command()`, `@<group>.group()`, `@click.option(...)`,
//! `@click.argument(...)` and `<group>.add_command(cmd, name)`.
//!
//! Recognised argparse shapes: `p = argparse.ArgumentParser()`,
//! `s = p.add_subparsers()`, `c = s.add_parser("name")`,
//! `g = p.add_argument_group()` and `p.add_argument(...)`.
//!
//! A file declares at most one root; further roots are reported and skipped.

use std::collections::{BTreeMap, HashMap};

use tree_sitter::Node;

use super::helpers::{
    bool_literal, call_name, descendants_of_kind, get_node_text, get_start_line, has_splat_args,
    keyword_arg, positional_args, split_decorated, string_literal,
};
use super::{extract_python, Extractor, PythonUnit, UnitOutput};
use crate::model::{Extraction, ParamKind, Parameter, Symbol, SymbolKind};
use crate::snapshot::Snapshot;
use crate::surface::SurfaceFilter;

/// Name shown for the root command.
pub const ROOT_COMMAND: &str = "<root>";

/// Options built from `*args` or `**kwargs` cannot be read without running
/// the code.
const UNPACKED_ARGS: &str = "Parameter uses * or ** unpacking; skipped";

/// Extractor for the `cli` domain.
#[derive(Clone, Copy, Debug, Default)]
pub struct CliExtractor;

impl Extractor for CliExtractor {
    fn extract(&self, snapshot: &Snapshot, surface: &dyn SurfaceFilter) -> Extraction {
        extract_python(snapshot, surface, extract_unit)
    }
}

/// An option or argument before positions are assigned.
#[derive(Clone, Debug)]
struct CliParam {
    name: String,
    kind: ParamKind,
    required: bool,
}

/// A click command function.
#[derive(Clone, Debug)]
struct ClickCommand {
    name: String,
    parent: Option<String>,
    params: Vec<CliParam>,
    line: u32,
}

fn extract_unit(unit: &PythonUnit, root: Node, surface: &dyn SurfaceFilter) -> UnitOutput {
    let mut output = UnitOutput::default();
    let mut commands: BTreeMap<String, Vec<CliParam>> = BTreeMap::new();

    let mut click = collect_click(unit, &root, &mut output);
    let parsers = descendants_of_kind(&root, "call")
        .into_iter()
        .filter(|call| {
            call_name(call, unit.source)
                .map(|c| c == "argparse.ArgumentParser" || c == "ArgumentParser")
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();

    // The earliest root wins
    let mut click_roots: Vec<(u32, String)> = click
        .iter()
        .filter(|(_, cmd)| cmd.parent.is_none())
        .map(|(func, cmd)| (cmd.line, func.clone()))
        .collect();
    click_roots.sort();
    let first_click = click_roots.first().map(|(line, _)| *line);
    let first_parser = parsers.first().map(get_start_line);

    let use_click = match (first_click, first_parser) {
        (Some(c), Some(p)) => c <= p,
        (Some(_), None) => true,
        _ => false,
    };

    let skipped_roots: Vec<u32> = if use_click {
        let extra = click_roots.iter().skip(1).map(|(line, _)| *line);
        extra.chain(parsers.iter().map(get_start_line)).collect()
    } else {
        let extra = parsers.iter().skip(1).map(get_start_line);
        extra.chain(click_roots.iter().map(|(line, _)| *line)).collect()
    };
    for line in skipped_roots {
        output.diagnostic(unit.path, line, "Additional root command ignored");
    }

    if use_click {
        if let Some((_, root_fn)) = click_roots.first().cloned() {
            click.retain(|func, cmd| cmd.parent.is_some() || *func == root_fn);
            click_paths(unit, &click, &mut commands, &mut output);
        }
    } else if let Some(parser) = parsers.first() {
        collect_argparse(unit, &root, parser, &mut commands, &mut output);
    }

    for (path, params) in commands {
        let name = if path.is_empty() {
            ROOT_COMMAND.to_string()
        } else {
            path
        };
        if !surface.is_public(&name) {
            continue;
        }

        let signature = params
            .into_iter()
            .enumerate()
            .map(|(position, p)| Parameter::new(p.name, position as u32, p.kind, p.required))
            .collect();
        output.symbol(Symbol::new(name, SymbolKind::Command).with_signature(signature));
    }
    output
}

// ---------------------------------------------------------------------------
// click
// ---------------------------------------------------------------------------

/// Click commands keyed by the function that implements them.
fn collect_click(
    unit: &PythonUnit,
    root: &Node,
    output: &mut UnitOutput,
) -> BTreeMap<String, ClickCommand> {
    let mut commands = BTreeMap::new();

    for decorated in descendants_of_kind(root, "decorated_definition") {
        let (decorators, definition) = split_decorated(&decorated);
        let Some(function) = definition.filter(|d| d.kind() == "function_definition") else {
            continue;
        };
        let Some(func_name) = function
            .child_by_field_name("name")
            .map(|n| get_node_text(&n, unit.source).to_string())
        else {
            continue;
        };

        let mut command: Option<ClickCommand> = None;
        let mut params = Vec::new();

        for decorator in &decorators {
            let callee = match decorator.kind() {
                "call" => call_name(decorator, unit.source),
                "attribute" | "identifier" => {
                    Some(get_node_text(decorator, unit.source).to_string())
                }
                _ => None,
            };
            let Some(callee) = callee else {
                continue;
            };
            let (receiver, method) = callee.rsplit_once('.').unwrap_or(("", callee.as_str()));
            let from_click = receiver.is_empty() || receiver == "click";

            match method {
                "command" | "group" => {
                    let name = match command_name(decorator, unit.source) {
                        Ok(Some(name)) => name,
                        Ok(None) => func_name.replace('_', "-"),
                        Err(message) => {
                            output.diagnostic(unit.path, get_start_line(decorator), message);
                            continue;
                        }
                    };
                    command = Some(ClickCommand {
                        name,
                        parent: (!from_click).then(|| receiver.to_string()),
                        params: Vec::new(),
                        line: get_start_line(decorator),
                    });
                }
                "option" | "argument" if from_click && decorator.kind() == "call" => {
                    match click_param(decorator, method == "argument", unit.source) {
                        Ok(param) => params.push(param),
                        Err(message) => {
                            output.diagnostic(unit.path, get_start_line(decorator), message)
                        }
                    }
                }
                _ => {}
            }
        }

        if let Some(mut command) = command {
            command.params = params;
            commands.insert(func_name, command);
        }
    }

    // group.add_command(cmd[, name])
    for call in descendants_of_kind(root, "call") {
        let Some(callee) = call_name(&call, unit.source) else {
            continue;
        };
        let Some((group, "add_command")) = callee.rsplit_once('.') else {
            continue;
        };
        let args = positional_args(&call);
        let Some(target) = args
            .first()
            .filter(|a| a.kind() == "identifier")
            .map(|a| get_node_text(a, unit.source).to_string())
        else {
            output.diagnostic(
                unit.path,
                get_start_line(&call),
                "add_command target is not a plain name; ignored",
            );
            continue;
        };

        let Some(command) = commands.get_mut(&target) else {
            continue;
        };
        command.parent = Some(group.to_string());
        let explicit = args
            .get(1)
            .copied()
            .or_else(|| keyword_arg(&call, "name", unit.source));
        if let Some(name) = explicit.and_then(|n| string_literal(&n, unit.source)) {
            command.name = name;
        }
    }

    commands
}

/// Explicit command name from `command("name")` or `command(name="name")`.
fn command_name(decorator: &Node, source: &str) -> Result<Option<String>, String> {
    if decorator.kind() != "call" {
        return Ok(None);
    }
    let explicit = positional_args(decorator)
        .first()
        .copied()
        .or_else(|| keyword_arg(decorator, "name", source));
    match explicit {
        Some(node) => string_literal(&node, source)
            .map(Some)
            .ok_or_else(|| "Command name is not a string literal; command skipped".to_string()),
        None => Ok(None),
    }
}

fn click_param(decorator: &Node, is_argument: bool, source: &str) -> Result<CliParam, String> {
    if has_splat_args(decorator) {
        return Err(UNPACKED_ARGS.to_string());
    }
    let decls = positional_args(decorator)
        .iter()
        .map(|a| string_literal(a, source))
        .collect::<Option<Vec<String>>>()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| "Parameter declarations are not string literals; skipped".to_string())?;

    let name = decls
        .iter()
        .find(|d| !d.starts_with('-'))
        .cloned()
        .or_else(|| {
            decls
                .iter()
                .filter(|d| d.starts_with("--"))
                .max_by_key(|d| d.len())
                .map(|d| d.trim_start_matches('-').replace('-', "_"))
        })
        .or_else(|| decls.first().map(|d| d.trim_start_matches('-').replace('-', "_")))
        .unwrap_or_default();

    let required = match keyword_arg(decorator, "required", source) {
        Some(value) => bool_literal(&value)
            .ok_or_else(|| format!("required of '{}' is not a literal; skipped", name))?,
        None if is_argument => {
            let variadic = keyword_arg(decorator, "nargs", source)
                .map(|n| get_node_text(&n, source).trim() == "-1")
                .unwrap_or(false);
            keyword_arg(decorator, "default", source).is_none() && !variadic
        }
        None => false,
    };

    Ok(CliParam {
        name,
        kind: if is_argument {
            ParamKind::PositionalOrKeyword
        } else {
            ParamKind::KeywordOnly
        },
        required,
    })
}

/// Resolve each click command's path below the root and record it.
fn click_paths(
    unit: &PythonUnit,
    click: &BTreeMap<String, ClickCommand>,
    commands: &mut BTreeMap<String, Vec<CliParam>>,
    output: &mut UnitOutput,
) {
    for (func, command) in click {
        match click_path(click, func, 0) {
            Some(path) => {
                commands.insert(path, command.params.clone());
            }
            None => output.diagnostic(
                unit.path,
                command.line,
                format!("Command '{}' is attached to an unknown group; skipped", command.name),
            ),
        }
    }
}

fn click_path(click: &BTreeMap<String, ClickCommand>, func: &str, depth: usize) -> Option<String> {
    if depth > click.len() {
        return None;
    }
    let command = click.get(func)?;
    match &command.parent {
        None => Some(String::new()),
        Some(parent) => {
            let prefix = click_path(click, parent, depth + 1)?;
            Some(format!("{} {}", prefix, command.name).trim().to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// argparse
// ---------------------------------------------------------------------------

fn collect_argparse(
    unit: &PythonUnit,
    root: &Node,
    root_parser: &Node,
    commands: &mut BTreeMap<String, Vec<CliParam>>,
    output: &mut UnitOutput,
) {
    // Variable name -> command path, for parsers and argument groups
    let mut parsers: HashMap<String, String> = HashMap::new();
    // Variable name -> command path of the parser owning the subparsers
    let mut subparsers: HashMap<String, String> = HashMap::new();

    match assigned_name(root_parser, unit.source) {
        Some(var) => {
            parsers.insert(var, String::new());
        }
        None => {
            output.diagnostic(
                unit.path,
                get_start_line(root_parser),
                "ArgumentParser is not assigned to a name; ignored",
            );
            return;
        }
    }
    commands.insert(String::new(), Vec::new());

    for call in descendants_of_kind(root, "call") {
        let Some(callee) = call_name(&call, unit.source) else {
            continue;
        };
        let Some((receiver, method)) = callee.rsplit_once('.') else {
            continue;
        };
        let line = get_start_line(&call);

        match method {
            "add_subparsers" => {
                if let (Some(path), Some(var)) =
                    (parsers.get(receiver).cloned(), assigned_name(&call, unit.source))
                {
                    subparsers.insert(var, path);
                }
            }
            "add_parser" => {
                let Some(parent) = subparsers.get(receiver).cloned() else {
                    output.diagnostic(
                        unit.path,
                        line,
                        format!("add_parser on unknown '{}'; ignored", receiver),
                    );
                    continue;
                };
                let Some(name) = positional_args(&call)
                    .first()
                    .and_then(|a| string_literal(a, unit.source))
                else {
                    output.diagnostic(
                        unit.path,
                        line,
                        "Subcommand name is not a string literal; skipped",
                    );
                    continue;
                };
                let path = format!("{} {}", parent, name).trim().to_string();
                commands.entry(path.clone()).or_default();
                if let Some(var) = assigned_name(&call, unit.source) {
                    parsers.insert(var, path);
                }
            }
            "add_argument_group" | "add_mutually_exclusive_group" => {
                if let (Some(path), Some(var)) =
                    (parsers.get(receiver).cloned(), assigned_name(&call, unit.source))
                {
                    parsers.insert(var, path);
                }
            }
            "add_argument" => {
                let Some(path) = parsers.get(receiver) else {
                    output.diagnostic(
                        unit.path,
                        line,
                        format!("add_argument on unknown '{}'; ignored", receiver),
                    );
                    continue;
                };
                match argparse_param(&call, unit.source) {
                    Ok(Some(param)) => commands.entry(path.clone()).or_default().push(param),
                    Ok(None) => {}
                    Err(message) => output.diagnostic(unit.path, line, message),
                }
            }
            _ => {}
        }
    }
}

/// Name bound by `name = <call>`.
fn assigned_name(call: &Node, source: &str) -> Option<String> {
    let parent = call.parent()?;
    if parent.kind() != "assignment" {
        return None;
    }
    let left = parent.child_by_field_name("left")?;
    (left.kind() == "identifier").then(|| get_node_text(&left, source).to_string())
}

fn argparse_param(call: &Node, source: &str) -> Result<Option<CliParam>, String> {
    if has_splat_args(call) {
        return Err(UNPACKED_ARGS.to_string());
    }
    let decls = positional_args(call)
        .iter()
        .map(|a| string_literal(a, source))
        .collect::<Option<Vec<String>>>()
        .filter(|d| !d.is_empty())
        .ok_or_else(|| "Argument declarations are not string literals; skipped".to_string())?;

    let positional = decls.iter().all(|d| !d.starts_with('-'));
    let dest = match keyword_arg(call, "dest", source) {
        Some(node) => string_literal(&node, source)
            .ok_or_else(|| "Argument dest is not a string literal; skipped".to_string())?,
        None => decls
            .iter()
            .find(|d| d.starts_with("--"))
            .or_else(|| decls.first())
            .map(|d| d.trim_start_matches('-').replace('-', "_"))
            .unwrap_or_default(),
    };
    if dest == "help" {
        return Ok(None);
    }

    let required = if positional {
        true
    } else {
        match keyword_arg(call, "required", source) {
            Some(value) => bool_literal(&value)
                .ok_or_else(|| format!("required of '{}' is not a literal; skipped", dest))?,
            None => false,
        }
    };

    Ok(Some(CliParam {
        name: dest,
        kind: if positional {
            ParamKind::PositionalOrKeyword
        } else {
            ParamKind::KeywordOnly
        },
        required,
    }))
}
