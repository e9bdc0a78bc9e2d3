use serde_json::{Map, Value};

use crate::commands::{CommandRegistry, PrepareError};
use crate::selector::Selector;
use crate::types::{AtomicRule, CompileError, CompositeRule, Operator, RuleNode};

pub(crate) fn compile(
    document: &Value,
    registry: &CommandRegistry,
) -> Result<RuleNode, CompileError> {
    let root = compile_node(document, "$", registry)?;
    tracing::debug!(checks = root.atomic_count(), "compiled rule document");
    Ok(root)
}

fn compile_node(
    value: &Value,
    path: &str,
    registry: &CommandRegistry,
) -> Result<RuleNode, CompileError> {
    let Some(object) = value.as_object() else {
        return Err(CompileError::malformed(
            path,
            format!("expected a rule object, found {}", kind_of(value)),
        ));
    };

    let composite = object.contains_key("operator");
    let atomic = object.contains_key("command") || object.contains_key("selector");
    match (composite, atomic) {
        (true, false) => compile_composite(object, path, registry),
        (false, true) => compile_atomic(object, path, registry),
        (true, true) => Err(CompileError::malformed(
            path,
            "a rule cannot have both 'operator' and 'command'/'selector'",
        )),
        (false, false) => Err(CompileError::malformed(
            path,
            "expected 'operator' for a composite rule or 'selector' and 'command' for a check",
        )),
    }
}

fn compile_composite(
    object: &Map<String, Value>,
    path: &str,
    registry: &CommandRegistry,
) -> Result<RuleNode, CompileError> {
    let operator = match object.get("operator") {
        Some(Value::String(s)) => s
            .parse::<Operator>()
            .map_err(|operator| CompileError::UnknownOperator {
                path: path.to_owned(),
                operator,
            })?,
        Some(other) => {
            return Err(CompileError::malformed(
                path,
                format!("'operator' must be a string, found {}", kind_of(other)),
            ))
        }
        None => return Err(CompileError::malformed(path, "missing 'operator'")),
    };

    let children = match object.get("children") {
        Some(Value::Array(children)) => children,
        Some(other) => {
            return Err(CompileError::malformed(
                path,
                format!("'children' must be an array, found {}", kind_of(other)),
            ))
        }
        None => return Err(CompileError::malformed(path, "missing 'children'")),
    };

    check_arity(operator, children.len(), path)?;

    let children = children
        .iter()
        .enumerate()
        .map(|(i, child)| compile_node(child, &format!("{path}.children[{i}]"), registry))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(RuleNode::Composite(CompositeRule { operator, children }))
}

fn check_arity(operator: Operator, count: usize, path: &str) -> Result<(), CompileError> {
    match operator {
        Operator::Not if count != 1 => Err(CompileError::malformed(
            path,
            format!("NOT takes exactly one child, found {count}"),
        )),
        Operator::And | Operator::Or if count == 0 => Err(CompileError::malformed(
            path,
            format!("{operator} needs at least one child"),
        )),
        _ => Ok(()),
    }
}

fn compile_atomic(
    object: &Map<String, Value>,
    path: &str,
    registry: &CommandRegistry,
) -> Result<RuleNode, CompileError> {
    let selector_text = required_str(object, "selector", path)?;
    let command = required_str(object, "command", path)?;

    let selector =
        Selector::parse(selector_text).map_err(|e| CompileError::InvalidSelector {
            path: path.to_owned(),
            selector: selector_text.to_owned(),
            reason: e.reason().to_owned(),
        })?;

    let arguments = object.get("arguments").cloned().unwrap_or(Value::Null);
    let check = registry
        .prepare(command, &arguments)
        .map_err(|e| match e {
            PrepareError::Unknown => CompileError::UnknownCommand {
                path: path.to_owned(),
                command: command.to_owned(),
            },
            PrepareError::InvalidArguments(reason) => CompileError::InvalidArguments {
                path: path.to_owned(),
                command: command.to_owned(),
                reason,
            },
        })?;

    let description = optional_str(object, "description", path)?
        .map_or_else(|| format!("{command}@{selector_text}"), str::to_owned);
    let comment = optional_str(object, "comment", path)?
        .unwrap_or_default()
        .to_owned();

    Ok(RuleNode::Atomic(AtomicRule {
        selector,
        command: command.to_owned(),
        arguments,
        description,
        comment,
        check,
        raw: Value::Object(object.clone()),
    }))
}

fn required_str<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<&'a str, CompileError> {
    match object.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(CompileError::malformed(
            path,
            format!("'{key}' must be a string, found {}", kind_of(other)),
        )),
        None => Err(CompileError::malformed(path, format!("missing '{key}'"))),
    }
}

fn optional_str<'a>(
    object: &'a Map<String, Value>,
    key: &str,
    path: &str,
) -> Result<Option<&'a str>, CompileError> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(other) => Err(CompileError::malformed(
            path,
            format!("'{key}' must be a string, found {}", kind_of(other)),
        )),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
