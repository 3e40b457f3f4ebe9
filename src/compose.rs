//! Loading and composition of experiment configuration documents.
//!
//! A root document may carry a `defaults` list selecting sub-configuration
//! files per group (`env`, `agents`, `model`, ...). Each entry `{group: option}`
//! loads `<dir>/<group>/<option>.yaml` and mounts it under the `group` key.
//! The root's own keys are merged last, so they win over group content.

use anyhow::{bail, Context, Result};
use serde_yaml::{Mapping, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

pub fn load_file(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("cannot read config file {}", path.display()))?;
    serde_yaml::from_str(&text)
        .with_context(|| format!("cannot parse {} as YAML", path.display()))
}

/// Load a root document and process its `defaults` list.
///
/// The `defaults` and `hydra` keys are consumed here and do not appear in
/// the composed output.
pub fn compose(path: &Path) -> Result<Value> {
    let raw = load_file(path)?;
    let Value::Mapping(mut root) = raw else {
        bail!("root of {} must be a mapping", path.display());
    };
    let dir = path.parent().unwrap_or_else(|| Path::new("."));

    let defaults = root.remove(Value::from("defaults"));
    root.remove(Value::from("hydra"));

    let mut composed = Value::Mapping(Mapping::new());
    if let Some(defaults) = defaults {
        let Value::Sequence(entries) = defaults else {
            bail!("`defaults` in {} must be a list", path.display());
        };
        for entry in entries {
            match entry {
                // The root document's own keys always merge last.
                Value::String(s) if s == "_self_" => continue,
                Value::Mapping(m) if m.len() == 1 => {
                    let Some((group, option)) = m.into_iter().next() else {
                        continue;
                    };
                    let (Value::String(group), Value::String(option)) = (group, option) else {
                        bail!("`defaults` entries must map a group name to an option name");
                    };
                    let group_path = dir.join(&group).join(format!("{option}.yaml"));
                    debug!(group, option, "loading config group");
                    let sub = load_file(&group_path)?;
                    let mut mount = Mapping::new();
                    mount.insert(Value::String(group), sub);
                    deep_merge(&mut composed, Value::Mapping(mount));
                }
                other => bail!("malformed `defaults` entry: {:?}", other),
            }
        }
    }

    deep_merge(&mut composed, Value::Mapping(root));
    Ok(composed)
}

/// Merge `overlay` into `base`. Mappings merge key by key, recursively;
/// any other node is replaced by the overlay.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(b), Value::Mapping(o)) => {
            for (k, v) in o {
                match b.get_mut(&k) {
                    Some(slot) => deep_merge(slot, v),
                    None => {
                        b.insert(k, v);
                    }
                }
            }
        }
        (slot, v) => *slot = v,
    }
}

/// Apply a dotted-path override of the form `a.b.c=value`.
/// The value side is parsed as a YAML scalar, so `true`, `3`, `0.5` and
/// quoted strings all keep their types. Intermediate mappings are created
/// as needed.
pub fn apply_override(root: &mut Value, spec: &str) -> Result<()> {
    let (path, raw) = spec
        .split_once('=')
        .with_context(|| format!("override `{spec}` must look like key=value"))?;
    let value: Value = serde_yaml::from_str(raw)
        .with_context(|| format!("cannot parse override value `{raw}` as YAML"))?;
    set_path(root, path.trim(), value)
}

fn set_path(root: &mut Value, path: &str, value: Value) -> Result<()> {
    let mut parts: Vec<&str> = path.split('.').collect();
    let last = parts.pop().filter(|p| !p.is_empty());
    let Some(last) = last else {
        bail!("override path `{path}` is empty");
    };

    let mut node = root;
    for part in parts {
        if part.is_empty() {
            bail!("override path `{path}` has an empty segment");
        }
        let Value::Mapping(map) = node else {
            bail!("override path `{path}` crosses a non-mapping node at `{part}`");
        };
        node = map
            .entry(Value::String(part.to_string()))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
    }
    let Value::Mapping(map) = node else {
        bail!("override path `{path}` crosses a non-mapping node at `{last}`");
    };
    map.insert(Value::String(last.to_string()), value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).unwrap()
    }

    #[test]
    fn deep_merge_is_recursive_on_mappings() {
        let mut base = yaml("a: {x: 1, y: 2}\nb: keep");
        deep_merge(&mut base, yaml("a: {y: 3, z: 4}"));
        assert_eq!(base, yaml("a: {x: 1, y: 3, z: 4}\nb: keep"));
    }

    #[test]
    fn deep_merge_replaces_sequences() {
        let mut base = yaml("xs: [1, 2, 3]");
        deep_merge(&mut base, yaml("xs: [9]"));
        assert_eq!(base, yaml("xs: [9]"));
    }

    #[test]
    fn override_keeps_scalar_types() {
        let mut doc = yaml("a: {}");
        apply_override(&mut doc, "a.flag=true").unwrap();
        apply_override(&mut doc, "a.n=42").unwrap();
        apply_override(&mut doc, "a.rate=0.5").unwrap();
        apply_override(&mut doc, "a.name=gridworld").unwrap();
        assert_eq!(doc, yaml("a: {flag: true, n: 42, rate: 0.5, name: gridworld}"));
    }

    #[test]
    fn override_creates_intermediate_mappings() {
        let mut doc = yaml("{}");
        apply_override(&mut doc, "env.metrics.period=10").unwrap();
        assert_eq!(doc, yaml("env: {metrics: {period: 10}}"));
    }

    #[test]
    fn override_through_scalar_fails() {
        let mut doc = yaml("a: 3");
        let err = apply_override(&mut doc, "a.b=1").unwrap_err();
        assert!(err.to_string().contains("non-mapping"));
    }

    #[test]
    fn override_without_equals_fails() {
        let mut doc = yaml("{}");
        assert!(apply_override(&mut doc, "just_a_key").is_err());
    }
}
