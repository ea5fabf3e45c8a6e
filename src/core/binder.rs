//! Conversion of configuration subtrees into `config` values for binding.

use super::path;
use super::section::{Configuration, ConfigurationSection};
use config::{Map, Value, ValueKind};

/// Build a value tree from a set of child sections.
///
/// A node without children is its own value (or nil). A node whose children
/// are keyed `0..n` becomes an array, any other node a table keyed by the
/// lowercased child key.
pub(crate) fn to_value(children: Vec<ConfigurationSection>, value: Option<String>) -> Value {
    if children.is_empty() {
        return match value {
            Some(value) => Value::new(None, value),
            None => Value::new(None, ValueKind::Nil),
        };
    }

    let is_sequence = children
        .iter()
        .enumerate()
        .all(|(index, child)| child.key() == index.to_string());

    if is_sequence {
        let items: Vec<Value> = children.into_iter().map(node).collect();
        Value::new(None, ValueKind::Array(items))
    } else {
        let table: Map<String, Value> = children
            .into_iter()
            .map(|child| (path::normalize(child.key()), node(child)))
            .collect();
        Value::new(None, ValueKind::Table(table))
    }
}

fn node(section: ConfigurationSection) -> Value {
    let value = section.value();
    to_value(section.get_children(), value)
}
