// ============================================================
// Configuration — Overrides and References
// ============================================================
// Overrides:  "--model.lin_neurons=64"  →  model: { lin_neurons: 64 }
//   The value part is parsed as YAML, so numbers, booleans and
//   lists ("--prepare.splits=[train, dev]") keep their types.
//
// References: "save_folder: <output_folder>/save"
//   Any `<name>` inside a string value is replaced by the
//   top-level scalar `name`. References may chain; a cycle or an
//   unknown name is an error.

use anyhow::{bail, Context, Result};
use serde_yaml::{Mapping, Value};

/// Maximum number of substitution rounds before declaring a cycle
const MAX_REF_DEPTH: usize = 16;

/// One parsed `key.path=value` override.
#[derive(Debug, Clone, PartialEq)]
pub struct Override {
    pub path:  Vec<String>,
    pub value: Value,
}

impl Override {
    /// Parse `--a.b=value`, `a.b=value` or `--a.b value`-joined strings.
    pub fn parse(raw: &str) -> Result<Self> {
        let body = raw.trim_start_matches('-');
        let (key, value) = body
            .split_once('=')
            .with_context(|| format!("Override '{raw}' is not of the form --key=value"))?;

        let path: Vec<String> = key.split('.').map(|s| s.trim().to_string()).collect();
        if path.iter().any(|p| p.is_empty()) {
            bail!("Override '{raw}' has an empty key segment");
        }

        let value: Value = serde_yaml::from_str(value)
            .with_context(|| format!("Override '{raw}' has a malformed value"))?;

        Ok(Self { path, value })
    }

    /// Write this override into a YAML mapping, creating nested maps as needed.
    pub fn apply(&self, root: &mut Mapping) -> Result<()> {
        let (last, parents) = self
            .path
            .split_last()
            .context("Override with an empty key")?;

        let mut node = root;
        for key in parents {
            let entry = node
                .entry(Value::String(key.clone()))
                .or_insert_with(|| Value::Mapping(Mapping::new()));
            node = match entry {
                Value::Mapping(m) => m,
                _ => bail!(
                    "Cannot override '{}': '{}' is not a mapping",
                    self.path.join("."),
                    key
                ),
            };
        }
        node.insert(Value::String(last.clone()), self.value.clone());
        Ok(())
    }
}

/// Parse and apply every override string in order.
pub fn apply_overrides(root: &mut Mapping, overrides: &[String]) -> Result<()> {
    for raw in overrides {
        let ov = Override::parse(raw)?;
        tracing::debug!("Override {} = {:?}", ov.path.join("."), ov.value);
        ov.apply(root)?;
    }
    Ok(())
}

/// Resolve `<name>` references in every string value of the tree.
pub fn resolve_references(root: &mut Mapping) -> Result<()> {
    for _ in 0..MAX_REF_DEPTH {
        // Snapshot the top-level scalars this round can point at
        let scalars: Vec<(String, String)> = root
            .iter()
            .filter_map(|(k, v)| Some((k.as_str()?.to_string(), scalar_text(v)?)))
            .collect();

        let mut changed = false;
        for (_, value) in root.iter_mut() {
            changed |= substitute(value, &scalars)?;
        }
        if !changed {
            return Ok(());
        }
    }
    bail!("Reference cycle in hyperparameters (more than {MAX_REF_DEPTH} rounds)")
}

fn scalar_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b)   => Some(b.to_string()),
        _ => None,
    }
}

fn substitute(value: &mut Value, scalars: &[(String, String)]) -> Result<bool> {
    match value {
        Value::String(s) => {
            let mut changed = false;
            let mut cursor  = 0usize;
            // Only scan past the last substitution; nested refs wait for the next round
            while let Some(open) = s[cursor..].find('<').map(|i| cursor + i) {
                let close = s[open..]
                    .find('>')
                    .map(|i| open + i)
                    .with_context(|| format!("Unterminated reference in '{s}'"))?;
                let name = &s[open + 1..close];
                let Some((_, text)) = scalars.iter().find(|(k, _)| k == name) else {
                    bail!("Unknown reference <{name}> in '{s}'");
                };
                cursor = open + text.len();
                *s = format!("{}{}{}", &s[..open], text, &s[close + 1..]);
                changed = true;
            }
            Ok(changed)
        }
        Value::Mapping(m) => {
            let mut changed = false;
            for (_, v) in m.iter_mut() {
                changed |= substitute(v, scalars)?;
            }
            Ok(changed)
        }
        Value::Sequence(seq) => {
            let mut changed = false;
            for v in seq.iter_mut() {
                changed |= substitute(v, scalars)?;
            }
            Ok(changed)
        }
        _ => Ok(false),
    }
}
