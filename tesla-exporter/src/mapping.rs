//! Mapping from the vehicle telemetry tree to flat Prometheus metric lines.
//!
//! Nested objects contribute their member names to the metric name, joined
//! with underscores. Leaves are rendered by type:
//!
//! | Leaf | Metric |
//! |------|--------|
//! | float | `name 238.890000` |
//! | integer | `name 67` |
//! | boolean | `name 1` / `name 0` |
//! | non-blank text | `name{value="2023.6.9_8b27e21d9137"} 1` |
//! | blank text, null, array | omitted |

use std::collections::HashMap;

use tesla_common::TelemetryValue;

/// Flat, ordered metric entries: `(name, value)`.
pub type MetricEntries = Vec<(String, String)>;

/// Flatten a telemetry tree into metric entries named below `prefix`.
///
/// Entries appear in document order. Total over any tree: a non-object root
/// yields no entries and unrecognised leaves are skipped.
pub fn flatten(tree: &TelemetryValue, prefix: &str) -> MetricEntries {
    let mut out = EntryBuilder::default();
    if let TelemetryValue::Object(members) = tree {
        walk(members, prefix, &mut out);
    }
    out.entries
}

fn walk(members: &[(String, TelemetryValue)], prefix: &str, out: &mut EntryBuilder) {
    for (key, value) in members {
        let name = join_name(prefix, key);
        match value {
            TelemetryValue::Object(children) => walk(children, &name, out),
            leaf => {
                if let Some((metric, rendered)) = render_leaf(&name, leaf) {
                    out.insert(metric, rendered);
                }
            }
        }
    }
}

/// Join a parent prefix and a member name.
pub fn join_name(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}_{}", prefix, key)
    }
}

/// Render a leaf as `(metric name, value)`, or `None` if it is not exported.
pub fn render_leaf(name: &str, value: &TelemetryValue) -> Option<(String, String)> {
    match value {
        TelemetryValue::Float(v) => Some((name.to_string(), format!("{:.6}", v))),
        TelemetryValue::Integer(v) => Some((name.to_string(), v.to_string())),
        TelemetryValue::Boolean(v) => {
            Some((name.to_string(), if *v { "1" } else { "0" }.to_string()))
        }
        TelemetryValue::Text(s) => {
            let label = sanitize_label_value(s)?;
            Some((format!("{}{{value=\"{}\"}}", name, label), "1".to_string()))
        }
        TelemetryValue::Null | TelemetryValue::Array(_) | TelemetryValue::Object(_) => None,
    }
}

/// Turn a text leaf into a label value.
///
/// Surrounding spaces are trimmed; blank strings yield `None`. Angle brackets
/// are dropped and commas and spaces become underscores.
pub fn sanitize_label_value(s: &str) -> Option<String> {
    let trimmed = s.trim_matches(' ');
    if trimmed.is_empty() {
        return None;
    }

    let mut result = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        match c {
            '<' | '>' => {}
            ',' | ' ' => result.push('_'),
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    Some(result)
}

/// Insertion-ordered entry set: a repeated name keeps its first position and
/// takes the latest value.
#[derive(Default)]
struct EntryBuilder {
    entries: MetricEntries,
    index: HashMap<String, usize>,
}

impl EntryBuilder {
    fn insert(&mut self, name: String, value: String) {
        match self.index.get(&name) {
            Some(&i) => self.entries[i].1 = value,
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, value));
            }
        }
    }
}
