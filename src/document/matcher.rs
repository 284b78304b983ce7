//! Filter, update and projection evaluation for the in-memory store.
//!
//! Covers the subset of the query language the application relies on:
//! equality (including array membership and dotted paths), the comparison
//! operators, `$and`/`$or`, the `$set`/`$unset`/`$inc` update operators and
//! top-level projections. Anything else is rejected with `Unsupported`.

use std::cmp::Ordering;

use mongodb::bson::{Bson, Document};

use super::errors::StoreError;

pub fn matches(doc: &Document, filter: &Document) -> Result<bool, StoreError> {
    for (key, condition) in filter {
        let matched = match key.as_str() {
            "$and" => all_clauses(doc, condition)?.iter().all(|m| *m),
            "$or" => all_clauses(doc, condition)?.iter().any(|m| *m),
            op if op.starts_with('$') => return Err(StoreError::Unsupported(op.to_string())),
            path => field_matches(get_path(doc, path), condition)?,
        };
        if !matched {
            return Ok(false);
        }
    }
    Ok(true)
}

fn all_clauses(doc: &Document, clauses: &Bson) -> Result<Vec<bool>, StoreError> {
    let Bson::Array(clauses) = clauses else {
        return Err(StoreError::Unsupported(
            "$and/$or expects an array".to_string(),
        ));
    };
    clauses
        .iter()
        .map(|clause| match clause {
            Bson::Document(sub) => matches(doc, sub),
            _ => Err(StoreError::Unsupported(
                "$and/$or clauses must be documents".to_string(),
            )),
        })
        .collect()
}

fn field_matches(value: Option<&Bson>, condition: &Bson) -> Result<bool, StoreError> {
    match condition {
        Bson::Document(ops) if is_operator_doc(ops) => {
            for (op, operand) in ops {
                if !operator_matches(value, op, operand)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        _ => Ok(value_equals(value, condition)),
    }
}

fn operator_matches(value: Option<&Bson>, op: &str, operand: &Bson) -> Result<bool, StoreError> {
    let result = match op {
        "$eq" => value_equals(value, operand),
        "$ne" => !value_equals(value, operand),
        "$gt" => compare_with(value, operand, |o| o == Ordering::Greater),
        "$gte" => compare_with(value, operand, |o| o != Ordering::Less),
        "$lt" => compare_with(value, operand, |o| o == Ordering::Less),
        "$lte" => compare_with(value, operand, |o| o != Ordering::Greater),
        "$in" => in_array(value, operand)?,
        "$nin" => !in_array(value, operand)?,
        "$exists" => value.is_some() == is_truthy(operand),
        other => return Err(StoreError::Unsupported(other.to_string())),
    };
    Ok(result)
}

fn in_array(value: Option<&Bson>, operand: &Bson) -> Result<bool, StoreError> {
    match operand {
        Bson::Array(candidates) => Ok(candidates.iter().any(|c| value_equals(value, c))),
        _ => Err(StoreError::Unsupported("$in/$nin expects an array".to_string())),
    }
}

fn compare_with(value: Option<&Bson>, operand: &Bson, accept: impl Fn(Ordering) -> bool) -> bool {
    match value {
        Some(Bson::Array(items)) => items
            .iter()
            .any(|item| compare_values(item, operand).map(&accept).unwrap_or(false)),
        Some(v) => compare_values(v, operand).map(accept).unwrap_or(false),
        None => false,
    }
}

/// Equality with the query language's conventions: a missing field equals
/// null, numbers compare by value across types, and an array field matches
/// when any element does.
fn value_equals(value: Option<&Bson>, expected: &Bson) -> bool {
    match value {
        None => matches!(expected, Bson::Null),
        Some(v) if scalar_equals(v, expected) => true,
        Some(Bson::Array(items)) => items.iter().any(|item| scalar_equals(item, expected)),
        Some(_) => false,
    }
}

fn scalar_equals(a: &Bson, b: &Bson) -> bool {
    match (as_f64(a), as_f64(b)) {
        (Some(x), Some(y)) => x == y,
        _ => a == b,
    }
}

fn compare_values(a: &Bson, b: &Bson) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (as_f64(a), as_f64(b)) {
        return x.partial_cmp(&y);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => Some(x.cmp(y)),
        (Bson::Boolean(x), Bson::Boolean(y)) => Some(x.cmp(y)),
        (Bson::DateTime(x), Bson::DateTime(y)) => Some(x.cmp(y)),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(n) => Some(f64::from(*n)),
        Bson::Int64(n) => Some(*n as f64),
        Bson::Double(n) => Some(*n),
        _ => None,
    }
}

fn is_truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Null => false,
        other => as_f64(other).map(|n| n != 0.0).unwrap_or(true),
    }
}

fn is_operator_doc(doc: &Document) -> bool {
    doc.keys().next().map(|k| k.starts_with('$')).unwrap_or(false)
}

pub fn get_path<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = match current {
            Bson::Document(sub) => sub.get(segment)?,
            _ => return None,
        };
    }
    Some(current)
}

fn set_path(doc: &mut Document, path: &str, value: Bson) -> Result<(), StoreError> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            let child = doc
                .entry(head.to_string())
                .or_insert_with(|| Bson::Document(Document::new()));
            match child {
                Bson::Document(sub) => set_path(sub, rest, value),
                _ => Err(StoreError::Unsupported(format!(
                    "cannot create field '{rest}' inside non-document '{head}'"
                ))),
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Bson::Document(sub)) = doc.get_mut(head) {
                remove_path(sub, rest);
            }
        }
    }
}

/// Applies an update document in place. Operator updates modify fields;
/// anything else replaces the document while keeping its `_id`.
pub fn apply_update(doc: &mut Document, update: &Document) -> Result<(), StoreError> {
    if !is_operator_doc(update) {
        let id = doc.get("_id").cloned();
        let mut replacement = update.clone();
        replacement.remove("_id");
        *doc = Document::new();
        if let Some(id) = id {
            doc.insert("_id", id);
        }
        doc.extend(replacement);
        return Ok(());
    }

    for (op, fields) in update {
        let Bson::Document(fields) = fields else {
            return Err(StoreError::Unsupported(format!("{op} expects a document")));
        };
        match op.as_str() {
            "$set" => {
                for (path, value) in fields {
                    set_path(doc, path, value.clone())?;
                }
            }
            "$unset" => {
                for (path, _) in fields {
                    remove_path(doc, path);
                }
            }
            "$inc" => {
                for (path, delta) in fields {
                    let current = get_path(doc, path).cloned();
                    let next = increment(current.as_ref(), delta, path)?;
                    set_path(doc, path, next)?;
                }
            }
            other => return Err(StoreError::Unsupported(other.to_string())),
        }
    }
    Ok(())
}

fn increment(current: Option<&Bson>, delta: &Bson, path: &str) -> Result<Bson, StoreError> {
    let current = current.unwrap_or(&Bson::Int32(0));
    let sum = match (current, delta) {
        (Bson::Int32(a), Bson::Int32(b)) => a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(i64::from(*a) + i64::from(*b))),
        (Bson::Int32(a), Bson::Int64(b)) => checked_i64(i64::from(*a), *b, path)?,
        (Bson::Int64(a), Bson::Int32(b)) => checked_i64(*a, i64::from(*b), path)?,
        (Bson::Int64(a), Bson::Int64(b)) => checked_i64(*a, *b, path)?,
        (a, b) => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => Bson::Double(x + y),
            _ => {
                return Err(StoreError::Unsupported(format!(
                    "$inc on non-numeric field '{path}'"
                )))
            }
        },
    };
    Ok(sum)
}

fn checked_i64(a: i64, b: i64, path: &str) -> Result<Bson, StoreError> {
    a.checked_add(b)
        .map(Bson::Int64)
        .ok_or_else(|| StoreError::Unsupported(format!("$inc overflow on field '{path}'")))
}

/// Builds the base document an upsert inserts when nothing matched: the
/// selector's plain equality fields.
pub fn seed_from_selector(selector: &Document) -> Result<Document, StoreError> {
    let mut seed = Document::new();
    for (key, condition) in selector {
        if key.starts_with('$') {
            continue;
        }
        match condition {
            Bson::Document(ops) if is_operator_doc(ops) => {
                if let Some(value) = ops.get("$eq") {
                    set_path(&mut seed, key, value.clone())?;
                }
            }
            value => set_path(&mut seed, key, value.clone())?,
        }
    }
    Ok(seed)
}

/// Applies a top-level projection. An empty projection returns the
/// document unchanged; dotted paths and mixed inclusion/exclusion are
/// rejected.
pub fn project(doc: &Document, projection: &Document) -> Result<Document, StoreError> {
    if projection.is_empty() {
        return Ok(doc.clone());
    }

    if let Some(key) = projection.keys().find(|key| key.contains('.')) {
        return Err(StoreError::Unsupported(format!(
            "dotted projection '{key}'"
        )));
    }

    let include_id = projection.get("_id").map(is_truthy).unwrap_or(true);
    let mut flags = projection
        .iter()
        .filter(|(key, _)| key.as_str() != "_id")
        .map(|(_, flag)| is_truthy(flag));
    let inclusive = flags.next().unwrap_or(false);
    if flags.any(|flag| flag != inclusive) {
        return Err(StoreError::Unsupported(
            "projection mixes inclusion and exclusion".to_string(),
        ));
    }

    let mut projected = Document::new();
    for (key, value) in doc {
        let keep = if key == "_id" {
            include_id
        } else if inclusive {
            projection.get(key).map(is_truthy).unwrap_or(false)
        } else {
            projection.get(key).map(is_truthy).unwrap_or(true)
        };
        if keep {
            projected.insert(key.clone(), value.clone());
        }
    }
    Ok(projected)
}
