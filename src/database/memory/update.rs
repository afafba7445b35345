use bson::{Bson, Document};

use super::value::{as_f64, lookup, set_path, BAD_VALUE, FAILED_TO_PARSE, TYPE_MISMATCH};
use crate::database::{StoreError, StoreResult};

const SUPPORTED: &[&str] = &["$set", "$inc"];

/// Rejects update expressions this backend cannot apply, before any document is touched.
pub fn validate(update: &Document) -> StoreResult<()> {
    if update.is_empty() {
        return Err(StoreError::coded(FAILED_TO_PARSE, "Update document must not be empty"));
    }
    for (op, fields) in update {
        if !op.starts_with('$') {
            return Err(StoreError::coded(
                FAILED_TO_PARSE,
                "update document requires atomic operators",
            ));
        }
        if !SUPPORTED.contains(&op.as_str()) {
            return Err(StoreError::coded(FAILED_TO_PARSE, format!("Unknown modifier: {}", op)));
        }
        if !matches!(fields, Bson::Document(_)) {
            return Err(StoreError::coded(
                FAILED_TO_PARSE,
                format!("Modifiers operate on fields but we found type {:?} instead", fields.element_type()),
            ));
        }
    }
    Ok(())
}

/// Applies a validated update expression. Returns whether the document changed.
pub fn apply(doc: &mut Document, update: &Document) -> StoreResult<bool> {
    let before = doc.clone();

    for (op, fields) in update {
        let Bson::Document(fields) = fields else { continue };
        for (path, value) in fields {
            let next = match op.as_str() {
                "$set" => value.clone(),
                "$inc" => {
                    let current = lookup(doc, path).cloned().unwrap_or(Bson::Int32(0));
                    increment(&current, value, path)?
                }
                other => return Err(StoreError::coded(FAILED_TO_PARSE, format!("Unknown modifier: {}", other))),
            };
            set_path(doc, path, next)?;
        }
    }

    Ok(*doc != before)
}

/// Int32 widens to Int64 on overflow; Int64 overflow is an error, as on the server.
fn increment(current: &Bson, by: &Bson, path: &str) -> StoreResult<Bson> {
    let overflow = || {
        StoreError::coded(
            BAD_VALUE,
            format!("Failed to apply $inc operations to current value ({}) for field '{}'", current, path),
        )
    };
    match (current, by) {
        (Bson::Int32(a), Bson::Int32(b)) => Ok(a
            .checked_add(*b)
            .map(Bson::Int32)
            .unwrap_or(Bson::Int64(i64::from(*a) + i64::from(*b)))),
        (Bson::Int32(_) | Bson::Int64(_), Bson::Int32(_) | Bson::Int64(_)) => {
            let (a, b) = (int_value(current), int_value(by));
            a.checked_add(b).map(Bson::Int64).ok_or_else(overflow)
        }
        _ => match (as_f64(current), as_f64(by)) {
            (Some(a), Some(b)) => Ok(Bson::Double(a + b)),
            _ => Err(StoreError::coded(
                TYPE_MISMATCH,
                format!("Cannot apply $inc to a value of non-numeric type. {{ {}: {} }}", path, current),
            )),
        },
    }
}

fn int_value(value: &Bson) -> i64 {
    match value {
        Bson::Int32(v) => i64::from(*v),
        Bson::Int64(v) => *v,
        _ => 0,
    }
}

/// Starting document for an upsert: the equality clauses of the filter.
pub fn seed_from_filter(filter: &Document) -> StoreResult<Document> {
    let mut seed = Document::new();
    for (key, value) in filter {
        match value {
            Bson::Document(ops) if ops.keys().next().map(|k| k.starts_with('$')).unwrap_or(false) => {
                if let Some(eq) = ops.get("$eq") {
                    set_path(&mut seed, key, eq.clone())?;
                }
            }
            other => set_path(&mut seed, key, other.clone())?,
        }
    }
    Ok(seed)
}
