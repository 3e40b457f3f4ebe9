//! Resolution of `${...}` template expressions in a composed document.
//!
//! Three forms are supported:
//! - `${a.b.c}` — absolute path reference from the document root;
//! - `${eval:'expr'}` — arithmetic over numbers and path references;
//! - `${merge:a, b}` — concatenation of sequences or merging of mappings.
//!
//! A string that is exactly one interpolation keeps the type of the
//! referenced value; interpolations embedded in a larger string must
//! resolve to scalars and are stringified in place.

pub mod expr;

use anyhow::{anyhow, bail, Context, Result};
use serde_yaml::{Mapping, Value};

use expr::Num;

/// Resolve every interpolation in the document, returning a new document
/// with no `${...}` left. Resolution is idempotent.
pub fn resolve_document(root: &Value) -> Result<Value> {
    let mut stack = Vec::new();
    resolve_node(root, root, &mut stack)
}

fn resolve_node(root: &Value, node: &Value, stack: &mut Vec<String>) -> Result<Value> {
    match node {
        Value::String(s) => resolve_string(root, s, stack),
        Value::Sequence(items) => items
            .iter()
            .map(|v| resolve_node(root, v, stack))
            .collect::<Result<Vec<_>>>()
            .map(Value::Sequence),
        Value::Mapping(map) => {
            let mut out = Mapping::new();
            for (k, v) in map {
                out.insert(k.clone(), resolve_node(root, v, stack)?);
            }
            Ok(Value::Mapping(out))
        }
        other => Ok(other.clone()),
    }
}

fn resolve_string(root: &Value, s: &str, stack: &mut Vec<String>) -> Result<Value> {
    let Some((start, end)) = find_interpolation(s)? else {
        return Ok(Value::String(s.to_string()));
    };

    // A lone interpolation keeps the type of whatever it resolves to.
    if start == 0 && end == s.len() {
        return resolve_interpolation(root, &s[2..end - 1], stack);
    }

    let mut out = String::new();
    let mut rest = s;
    let mut range = Some((start, end));
    loop {
        let Some((start, end)) = range else {
            out.push_str(rest);
            return Ok(Value::String(out));
        };
        out.push_str(&rest[..start]);
        let inner = &rest[start + 2..end - 1];
        let value = resolve_interpolation(root, inner, stack)?;
        out.push_str(&scalar_to_string(&value).with_context(|| {
            format!("interpolation `{inner}` embedded in a string must resolve to a scalar")
        })?);
        rest = &rest[end..];
        range = find_interpolation(rest)?;
    }
}

fn resolve_interpolation(root: &Value, body: &str, stack: &mut Vec<String>) -> Result<Value> {
    let body = body.trim();
    if let Some(raw) = body.strip_prefix("eval:") {
        let raw = raw.trim();
        let raw = raw
            .strip_prefix('\'')
            .and_then(|e| e.strip_suffix('\''))
            .unwrap_or(raw);
        let expanded = expand_nested(root, raw, stack)?;
        let mut lookup = |path: &str| lookup_number(root, path, stack);
        let num = expr::eval(&expanded, &mut lookup)
            .with_context(|| format!("cannot evaluate `{raw}`"))?;
        Ok(num.into_value())
    } else if let Some(args) = body.strip_prefix("merge:") {
        resolve_merge(root, args, stack)
    } else {
        resolve_path(root, body, stack)
    }
}

fn resolve_merge(root: &Value, args: &str, stack: &mut Vec<String>) -> Result<Value> {
    let mut merged: Option<Value> = None;
    for arg in args.split(',') {
        let arg = arg.trim();
        if arg.is_empty() {
            bail!("empty argument in `merge:`");
        }
        let value = if arg.starts_with("${") {
            resolve_string(root, arg, stack)?
        } else {
            resolve_path(root, arg, stack)?
        };
        merged = Some(match (merged, value) {
            (None, v) => v,
            (Some(Value::Sequence(mut a)), Value::Sequence(b)) => {
                a.extend(b);
                Value::Sequence(a)
            }
            (Some(Value::Mapping(mut a)), Value::Mapping(b)) => {
                for (k, v) in b {
                    a.insert(k, v);
                }
                Value::Mapping(a)
            }
            (Some(a), b) => bail!(
                "`merge:` arguments must all be sequences or all be mappings, got {} and {}",
                kind(&a),
                kind(&b)
            ),
        });
    }
    merged.ok_or_else(|| anyhow!("`merge:` needs at least one argument"))
}

fn resolve_path(root: &Value, path: &str, stack: &mut Vec<String>) -> Result<Value> {
    if stack.iter().any(|p| p == path) {
        bail!(
            "cyclic interpolation through `{path}` (chain: {})",
            stack.join(" -> ")
        );
    }
    let node = lookup(root, path)
        .ok_or_else(|| anyhow!("interpolation references unknown key `{path}`"))?;
    stack.push(path.to_string());
    let resolved = resolve_node(root, node, stack);
    stack.pop();
    resolved
}

fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    let mut node = root;
    for part in path.split('.') {
        node = match node {
            Value::Mapping(_) => node.get(part)?,
            Value::Sequence(items) => items.get(part.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(node)
}

fn lookup_number(root: &Value, path: &str, stack: &mut Vec<String>) -> Result<Num> {
    let value = resolve_path(root, path, stack)?;
    match &value {
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Num::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(Num::Float(f))
            } else {
                bail!("`{path}` is out of numeric range for eval");
            }
        }
        other => bail!("`{path}` must be a number inside eval, got {}", kind(other)),
    }
}

/// Replace nested `${...}` in an eval expression with literal scalar text.
fn expand_nested(root: &Value, raw: &str, stack: &mut Vec<String>) -> Result<String> {
    let mut out = String::new();
    let mut rest = raw;
    while let Some((start, end)) = find_interpolation(rest)? {
        out.push_str(&rest[..start]);
        let inner = &rest[start + 2..end - 1];
        let value = resolve_interpolation(root, inner, stack)?;
        out.push_str(&scalar_to_string(&value).with_context(|| {
            format!("interpolation `{inner}` inside eval must resolve to a scalar")
        })?);
        rest = &rest[end..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Byte range of the first `${...}` in `s`, delimiters included.
/// Nested `${...}` are skipped over so the range covers the whole group.
fn find_interpolation(s: &str) -> Result<Option<(usize, usize)>> {
    let Some(start) = s.find("${") else {
        return Ok(None);
    };
    let bytes = s.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    while i < bytes.len() {
        if bytes[i] == b'$' && bytes.get(i + 1) == Some(&b'{') {
            depth += 1;
            i += 2;
        } else if bytes[i] == b'}' {
            depth -= 1;
            i += 1;
            if depth == 0 {
                return Ok(Some((start, i)));
            }
        } else {
            i += 1;
        }
    }
    bail!("unterminated interpolation in `{s}`");
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => Some("null".to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                // Debug formatting keeps the decimal point, so floats stay
                // floats when re-read inside an eval expression.
                n.as_f64().map(|f| format!("{f:?}"))
            }
        }
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a bool",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
