use std::cmp::Ordering;

use bson::{Bson, Document};

use crate::database::{StoreError, StoreResult};

// Server error codes reproduced by the in-memory backend
pub const BAD_VALUE: i32 = 2;
pub const FAILED_TO_PARSE: i32 = 9;
pub const TYPE_MISMATCH: i32 = 14;
pub const DUPLICATE_KEY: i32 = 11000;
pub const STAGE_SHAPE: i32 = 40323;
pub const UNRECOGNIZED_STAGE: i32 = 40324;

/// Resolves a dotted path through nested documents.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Bson> {
    let mut parts = path.split('.');
    let mut current = doc.get(parts.next()?)?;
    for part in parts {
        current = match current {
            Bson::Document(inner) => inner.get(part)?,
            _ => return None,
        };
    }
    Some(current)
}

/// Writes `value` at a dotted path, creating intermediate documents.
pub fn set_path(doc: &mut Document, path: &str, value: Bson) -> StoreResult<()> {
    match path.split_once('.') {
        None => {
            doc.insert(path, value);
            Ok(())
        }
        Some((head, rest)) => {
            if !doc.contains_key(head) {
                doc.insert(head, Document::new());
            }
            match doc.get_mut(head) {
                Some(Bson::Document(inner)) => set_path(inner, rest, value),
                _ => Err(StoreError::coded(
                    TYPE_MISMATCH,
                    format!("Cannot create field '{}' in element {{{}: ...}}", rest, head),
                )),
            }
        }
    }
}

pub fn as_f64(value: &Bson) -> Option<f64> {
    match value {
        Bson::Int32(v) => Some(*v as f64),
        Bson::Int64(v) => Some(*v as f64),
        Bson::Double(v) => Some(*v),
        _ => None,
    }
}

pub fn as_i64(value: &Bson) -> Option<i64> {
    match value {
        Bson::Int32(v) => Some(*v as i64),
        Bson::Int64(v) => Some(*v),
        Bson::Double(v) if v.fract() == 0.0 => Some(*v as i64),
        _ => None,
    }
}

fn type_rank(value: &Bson) -> u8 {
    match value {
        Bson::Null | Bson::Undefined => 0,
        Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_) => 1,
        Bson::String(_) => 2,
        Bson::Document(_) => 3,
        Bson::Array(_) => 4,
        Bson::ObjectId(_) => 5,
        Bson::Boolean(_) => 6,
        Bson::DateTime(_) => 7,
        _ => 8,
    }
}

/// Cross-type ordering used for sorting and range comparisons.
pub fn compare(a: &Bson, b: &Bson) -> Ordering {
    let (rank_a, rank_b) = (type_rank(a), type_rank(b));
    if rank_a != rank_b {
        return rank_a.cmp(&rank_b);
    }
    match (a, b) {
        (Bson::String(x), Bson::String(y)) => x.cmp(y),
        (Bson::Boolean(x), Bson::Boolean(y)) => x.cmp(y),
        (Bson::DateTime(x), Bson::DateTime(y)) => x.cmp(y),
        (Bson::ObjectId(x), Bson::ObjectId(y)) => x.bytes().cmp(&y.bytes()),
        _ => match (as_f64(a), as_f64(b)) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => a.to_string().cmp(&b.to_string()),
        },
    }
}

pub fn values_equal(a: &Bson, b: &Bson) -> bool {
    compare(a, b) == Ordering::Equal
}

/// Applies a top-level inclusion (`{f: 1}`) or exclusion (`{f: 0}`) projection.
pub fn project(doc: &Document, projection: &Document) -> Document {
    let included = |flag: &Bson| as_f64(flag).map(|n| n != 0.0).unwrap_or(!matches!(flag, Bson::Boolean(false)));
    let keep_id = projection.get("_id").map(included).unwrap_or(true);
    let inclusive = projection.iter().any(|(field, flag)| field != "_id" && included(flag));

    doc.iter()
        .filter(|(field, _)| {
            if field.as_str() == "_id" {
                keep_id
            } else if inclusive {
                projection.get(field.as_str()).map(included).unwrap_or(false)
            } else {
                projection.get(field.as_str()).map(included).unwrap_or(true)
            }
        })
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}
