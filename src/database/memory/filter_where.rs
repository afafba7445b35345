use bson::{Bson, Document};

use super::value::{as_f64, compare, lookup, values_equal, BAD_VALUE};
use crate::database::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub path: String,
    pub operator: FilterOp,
    pub data: Bson,
}

/// Compiled query filter: a conjunction of field conditions
#[derive(Debug, Clone, Default)]
pub struct FilterWhere {
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    /// Compiles a filter document, rejecting operators this backend does not know.
    pub fn parse(filter: &Document) -> StoreResult<Self> {
        let mut conditions = Vec::new();
        for (field, value) in filter {
            if field.starts_with('$') {
                return Err(StoreError::coded(
                    BAD_VALUE,
                    format!("unknown top level operator: {}", field),
                ));
            }
            match value {
                Bson::Document(ops) if ops.keys().next().map(|k| k.starts_with('$')).unwrap_or(false) => {
                    for (op_key, data) in ops {
                        let operator = Self::map_operator(op_key)?;
                        if operator == FilterOp::In && !matches!(data, Bson::Array(_)) {
                            return Err(StoreError::coded(BAD_VALUE, "$in needs an array"));
                        }
                        conditions.push(FilterWhereInfo {
                            path: field.clone(),
                            operator,
                            data: data.clone(),
                        });
                    }
                }
                // Implicit equality: { field: value }
                _ => conditions.push(FilterWhereInfo {
                    path: field.clone(),
                    operator: FilterOp::Eq,
                    data: value.clone(),
                }),
            }
        }
        Ok(Self { conditions })
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|info| {
            let value = lookup(doc, &info.path);
            match info.operator {
                FilterOp::Eq => Self::equals(value, &info.data),
                FilterOp::Ne => !Self::equals(value, &info.data),
                FilterOp::In => match &info.data {
                    Bson::Array(candidates) => candidates.iter().any(|c| Self::equals(value, c)),
                    _ => false,
                },
                _ => value.map(|v| Self::ordered(v, info)).unwrap_or(false),
            }
        })
    }

    fn map_operator(op_key: &str) -> StoreResult<FilterOp> {
        Ok(match op_key {
            "$eq" => FilterOp::Eq,
            "$ne" => FilterOp::Ne,
            "$gt" => FilterOp::Gt,
            "$gte" => FilterOp::Gte,
            "$lt" => FilterOp::Lt,
            "$lte" => FilterOp::Lte,
            "$in" => FilterOp::In,
            other => return Err(StoreError::coded(BAD_VALUE, format!("unknown operator: {}", other))),
        })
    }

    /// Equality with array fan-out; null also matches a missing field.
    fn equals(value: Option<&Bson>, expected: &Bson) -> bool {
        match value {
            None => matches!(expected, Bson::Null),
            Some(v) if values_equal(v, expected) => true,
            Some(Bson::Array(items)) => items.iter().any(|item| values_equal(item, expected)),
            Some(_) => false,
        }
    }

    /// Range comparisons only hold between values of the same type bracket.
    fn ordered(value: &Bson, info: &FilterWhereInfo) -> bool {
        let numeric = as_f64(value).is_some();
        if numeric != as_f64(&info.data).is_some() {
            return false;
        }
        if !numeric && std::mem::discriminant(value) != std::mem::discriminant(&info.data) {
            return false;
        }
        let ord = compare(value, &info.data);
        match info.operator {
            FilterOp::Gt => ord.is_gt(),
            FilterOp::Gte => ord.is_ge(),
            FilterOp::Lt => ord.is_lt(),
            FilterOp::Lte => ord.is_le(),
            _ => false,
        }
    }
}
