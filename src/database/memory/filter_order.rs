use std::cmp::Ordering;

use bson::{Bson, Document};

use super::value::{as_i64, compare, lookup, BAD_VALUE};
use crate::database::{StoreError, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub path: String,
    pub sort: SortDirection,
}

pub struct FilterOrder;

impl FilterOrder {
    /// Parses `{ field: 1 | -1, ... }`; key order is sort priority.
    pub fn parse(sort: &Document) -> StoreResult<Vec<FilterOrderInfo>> {
        let mut out = Vec::with_capacity(sort.len());
        for (path, direction) in sort {
            let sort = match as_i64(direction) {
                Some(1) => SortDirection::Asc,
                Some(-1) => SortDirection::Desc,
                _ => {
                    return Err(StoreError::coded(
                        BAD_VALUE,
                        format!("$sort key ordering must be 1 (for ascending) or -1 (for descending), got {} for {}", direction, path),
                    ))
                }
            };
            out.push(FilterOrderInfo { path: path.clone(), sort });
        }
        Ok(out)
    }

    /// Stable sort; missing fields order as null.
    pub fn apply(infos: &[FilterOrderInfo], docs: &mut [Document]) {
        if infos.is_empty() {
            return;
        }
        docs.sort_by(|a, b| {
            for info in infos {
                let left = lookup(a, &info.path).unwrap_or(&Bson::Null);
                let right = lookup(b, &info.path).unwrap_or(&Bson::Null);
                let ord = match info.sort {
                    SortDirection::Asc => compare(left, right),
                    SortDirection::Desc => compare(right, left),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}
