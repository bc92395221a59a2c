//! Table creation order derived from priority hints and foreign keys.
//!
//! The same order backs the editor's "suggested order" and the generators'
//! emission order, so both go through [`order_tables`].

use crate::model::{Relationship, Table};
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// Order `tables` so that referenced tables precede the tables referencing them.
///
/// 1. Stable sort by priority (missing priority last, ties keep input order).
/// 2. Tables without dependencies on other present tables come first.
/// 3. Every other table is visited depth-first; its parents are emitted before it.
///    A parent still on the visit stack (a cycle) counts as satisfied.
///
/// Relationships whose tables or columns are absent from `tables` are skipped.
pub fn order_tables(tables: &[Table], relationships: &[Relationship]) -> Vec<Table> {
    let mut sorted: Vec<&Table> = tables.iter().collect();
    sorted.sort_by_key(|t| t.priority_key());

    // child -> parents, in relationship order
    let mut parents: HashMap<&str, Vec<&str>> = HashMap::new();
    for rel in relationships {
        if !rel.is_resolvable(tables) {
            warn!(
                relationship = %rel.id,
                "skipping relationship with a missing table or column"
            );
            continue;
        }
        if rel.from_table == rel.to_table {
            continue;
        }
        let deps = parents.entry(rel.from_table.as_str()).or_default();
        if !deps.contains(&rel.to_table.as_str()) {
            deps.push(rel.to_table.as_str());
        }
    }

    let by_name: HashMap<&str, &Table> = sorted.iter().map(|t| (t.name.as_str(), *t)).collect();
    let mut visitor = Visitor {
        parents: &parents,
        by_name: &by_name,
        visited: HashSet::new(),
        visiting: HashSet::new(),
        ordered: Vec::with_capacity(tables.len()),
    };

    let (independent, dependent): (Vec<&Table>, Vec<&Table>) = sorted
        .iter()
        .partition(|t| parents.get(t.name.as_str()).is_none_or(|p| p.is_empty()));

    for table in independent {
        if visitor.visited.insert(table.name.as_str()) {
            visitor.ordered.push(table);
        }
    }
    for table in dependent {
        visitor.visit(table.name.as_str());
    }

    visitor.ordered.into_iter().cloned().collect()
}

/// Names only; used for suggestions and logging.
pub fn order_names(tables: &[Table], relationships: &[Relationship]) -> Vec<String> {
    order_tables(tables, relationships)
        .into_iter()
        .map(|t| t.name)
        .collect()
}

/// Collect every relationship carried by `tables`.
pub fn relationships_of(tables: &[Table]) -> Vec<Relationship> {
    tables
        .iter()
        .flat_map(|t| t.relationships.iter().cloned())
        .collect()
}

struct Visitor<'a> {
    parents: &'a HashMap<&'a str, Vec<&'a str>>,
    by_name: &'a HashMap<&'a str, &'a Table>,
    visited: HashSet<&'a str>,
    visiting: HashSet<&'a str>,
    ordered: Vec<&'a Table>,
}

impl<'a> Visitor<'a> {
    fn visit(&mut self, name: &'a str) {
        if self.visited.contains(name) || self.visiting.contains(name) {
            return;
        }
        let by_name = self.by_name;
        let Some(table) = by_name.get(name).copied() else {
            return;
        };

        self.visiting.insert(name);
        let parents = self.parents;
        if let Some(deps) = parents.get(name) {
            for &parent in deps {
                self.visit(parent);
            }
        }
        self.visiting.remove(name);

        self.visited.insert(name);
        self.ordered.push(table);
    }
}

/// Re-sort so tables named in `order` come first in that sequence; the rest keep
/// their relative position after them.
pub fn apply_explicit_order(tables: Vec<Table>, order: &[String]) -> Vec<Table> {
    if order.is_empty() {
        return tables;
    }
    let position: HashMap<&str, usize> = order
        .iter()
        .enumerate()
        .map(|(i, name)| (name.as_str(), i))
        .collect();

    let mut indexed: Vec<(usize, Table)> = tables.into_iter().enumerate().collect();
    indexed.sort_by_key(|(i, t)| match position.get(t.name.as_str()) {
        Some(pos) => (0, *pos, *i),
        None => (1, 0, *i),
    });
    indexed.into_iter().map(|(_, t)| t).collect()
}

/// Final stable sort by priority; missing priority sorts last.
pub fn sort_by_priority(mut tables: Vec<Table>) -> Vec<Table> {
    tables.sort_by_key(Table::priority_key);
    tables
}
