//! Editable header rows with stable identity
//!
//! A draft's header map is edited as an ordered list of rows. Each row keeps
//! a client-generated id that survives renames, so editing a name never
//! tears down the row it belongs to. All operations are pure: they borrow
//! their input and return a fresh list, making each edit observably atomic.

use std::collections::BTreeMap;
use uuid::Uuid;

/// One editable (name, value) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderRow {
    /// Stable row id, independent of name and value
    pub id: String,
    pub name: String,
    pub value: String,
}

/// Which row field an update targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowField {
    Name,
    Value,
}

/// Synthesize a row id from the name, its ordinal, and a UUID salt. The
/// salt keeps ids unique for repeated header names and across repeated
/// invocations, however close together.
fn row_id(name: &str, ordinal: usize) -> String {
    format!("{}-{}-{}", name, ordinal, Uuid::new_v4().simple())
}

/// Expand a header map into rows, one per entry
pub fn rows_from_map(headers: &BTreeMap<String, String>) -> Vec<HeaderRow> {
    headers
        .iter()
        .enumerate()
        .map(|(ordinal, (name, value))| HeaderRow {
            id: row_id(name, ordinal),
            name: name.clone(),
            value: value.clone(),
        })
        .collect()
}

/// Collapse rows back into a map: rows with empty names are skipped, and
/// later rows overwrite earlier rows with the same name.
pub fn rows_to_map(rows: &[HeaderRow]) -> BTreeMap<String, String> {
    let mut headers = BTreeMap::new();
    for row in rows {
        if row.name.is_empty() {
            continue;
        }
        headers.insert(row.name.clone(), row.value.clone());
    }
    headers
}

/// Replace one field of the row matching `id`; no effect if the id is
/// not present.
pub fn update_row(rows: &[HeaderRow], id: &str, field: RowField, value: &str) -> Vec<HeaderRow> {
    rows.iter()
        .map(|row| {
            if row.id != id {
                return row.clone();
            }
            let mut updated = row.clone();
            match field {
                RowField::Name => updated.name = value.to_string(),
                RowField::Value => updated.value = value.to_string(),
            }
            updated
        })
        .collect()
}

/// Append one blank row with a fresh id
pub fn add_row(rows: &[HeaderRow]) -> Vec<HeaderRow> {
    let mut next = rows.to_vec();
    next.push(HeaderRow {
        id: row_id("hdr", rows.len()),
        name: String::new(),
        value: String::new(),
    });
    next
}

/// Drop the row matching `id`; no effect if the id is not present.
pub fn remove_row(rows: &[HeaderRow], id: &str) -> Vec<HeaderRow> {
    rows.iter().filter(|row| row.id != id).cloned().collect()
}
