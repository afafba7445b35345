use bson::{Bson, Document};

use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::value::{as_i64, lookup, values_equal, BAD_VALUE, STAGE_SHAPE, UNRECOGNIZED_STAGE};
use crate::database::{StoreError, StoreResult};

/// Runs an aggregation pipeline over a snapshot of a collection.
///
/// Stages: `$match`, `$sort`, `$limit` and `$group` with `$sum`.
pub fn run(mut docs: Vec<Document>, pipeline: &[Document]) -> StoreResult<Vec<Document>> {
    for stage in pipeline {
        let mut entries = stage.iter();
        let (name, spec) = match (entries.next(), entries.next()) {
            (Some(entry), None) => entry,
            _ => {
                return Err(StoreError::coded(
                    STAGE_SHAPE,
                    "A pipeline stage specification object must contain exactly one field.",
                ))
            }
        };

        docs = match name.as_str() {
            "$match" => {
                let filter = FilterWhere::parse(stage_document(name, spec)?)?;
                docs.into_iter().filter(|d| filter.matches(d)).collect()
            }
            "$sort" => {
                let infos = FilterOrder::parse(stage_document(name, spec)?)?;
                FilterOrder::apply(&infos, &mut docs);
                docs
            }
            "$limit" => match as_i64(spec) {
                Some(n) if n > 0 => docs.into_iter().take(n as usize).collect(),
                _ => {
                    return Err(StoreError::coded(
                        BAD_VALUE,
                        format!("invalid argument to $limit stage: {}", spec),
                    ))
                }
            },
            "$group" => group(docs, stage_document(name, spec)?)?,
            other => {
                return Err(StoreError::coded(
                    UNRECOGNIZED_STAGE,
                    format!("Unrecognized pipeline stage name: '{}'", other),
                ))
            }
        };
    }
    Ok(docs)
}

fn stage_document<'a>(name: &str, spec: &'a Bson) -> StoreResult<&'a Document> {
    match spec {
        Bson::Document(d) => Ok(d),
        _ => Err(StoreError::coded(
            BAD_VALUE,
            format!("the {} stage specification must be an object", name),
        )),
    }
}

/// `"$path"` references a field; anything else is a literal.
fn evaluate(doc: &Document, expr: &Bson) -> Bson {
    match expr {
        Bson::String(s) if s.starts_with('$') => lookup(doc, &s[1..]).cloned().unwrap_or(Bson::Null),
        other => other.clone(),
    }
}

/// Running `$sum`: stays integral until a double appears or the total overflows.
#[derive(Debug, Clone, Copy)]
enum Sum {
    Int(i64),
    Float(f64),
}

impl Sum {
    fn add(self, value: &Bson) -> Sum {
        let int = match value {
            Bson::Int32(v) => Some(i64::from(*v)),
            Bson::Int64(v) => Some(*v),
            _ => None,
        };
        match (self, int, value) {
            (Sum::Int(total), Some(v), _) => match total.checked_add(v) {
                Some(next) => Sum::Int(next),
                None => Sum::Float(total as f64 + v as f64),
            },
            (Sum::Float(total), Some(v), _) => Sum::Float(total + v as f64),
            (Sum::Int(total), None, Bson::Double(v)) => Sum::Float(total as f64 + v),
            (Sum::Float(total), None, Bson::Double(v)) => Sum::Float(total + v),
            (current, _, _) => current,
        }
    }

    fn finish(self) -> Bson {
        match self {
            Sum::Int(total) => i32::try_from(total).map(Bson::Int32).unwrap_or(Bson::Int64(total)),
            Sum::Float(total) => Bson::Double(total),
        }
    }
}

fn group(docs: Vec<Document>, spec: &Document) -> StoreResult<Vec<Document>> {
    let key_expr = spec
        .get("_id")
        .ok_or_else(|| StoreError::coded(15955, "a group specification must include an _id"))?;

    // (output field, summed expression)
    let mut fields = Vec::new();
    for (name, accumulator) in spec {
        if name == "_id" {
            continue;
        }
        match accumulator {
            Bson::Document(d) if d.len() == 1 && d.contains_key("$sum") => {
                fields.push((name.clone(), d.get("$sum").cloned().unwrap_or(Bson::Null)));
            }
            Bson::Document(d) if d.len() == 1 => {
                let op = d.keys().next().cloned().unwrap_or_default();
                return Err(StoreError::coded(
                    UNRECOGNIZED_STAGE,
                    format!("Unknown group operator '{}'", op),
                ));
            }
            _ => {
                return Err(StoreError::coded(
                    40234,
                    format!("The field '{}' must be an accumulator object", name),
                ))
            }
        }
    }

    let mut groups: Vec<(Bson, Vec<Sum>)> = Vec::new();
    for doc in &docs {
        let key = evaluate(doc, key_expr);
        let index = match groups.iter().position(|(existing, _)| values_equal(existing, &key)) {
            Some(i) => i,
            None => {
                groups.push((key, vec![Sum::Int(0); fields.len()]));
                groups.len() - 1
            }
        };
        for ((_, expr), sum) in fields.iter().zip(groups[index].1.iter_mut()) {
            *sum = sum.add(&evaluate(doc, expr));
        }
    }

    Ok(groups
        .into_iter()
        .map(|(key, sums)| {
            let mut out = Document::new();
            out.insert("_id", key);
            for ((name, _), sum) in fields.iter().zip(sums) {
                out.insert(name.clone(), sum.finish());
            }
            out
        })
        .collect())
}
