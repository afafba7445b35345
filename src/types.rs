/// Shared types used across the codebase

use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// Every guarded operation the gateway exposes.
/// Used by the router to attach role requirements and by the dispatcher for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    InsertOne,
    InsertMany,
    FindOne,
    Find,
    UpdateOne,
    Update,
    DeleteOne,
    Delete,
    Aggregate,
    CreatePrincipal,
    ListPrincipals,
}

const WRITERS: &[Role] = &[Role::WriteOnly, Role::ReadWrite, Role::Admin];
const READERS: &[Role] = &[Role::ReadOnly, Role::ReadWrite, Role::Admin];
const ADMINS: &[Role] = &[Role::Admin];

impl Operation {
    /// The nine generic data actions, in route order.
    pub const ACTIONS: [Operation; 9] = [
        Operation::InsertOne,
        Operation::InsertMany,
        Operation::FindOne,
        Operation::Find,
        Operation::UpdateOne,
        Operation::Update,
        Operation::DeleteOne,
        Operation::Delete,
        Operation::Aggregate,
    ];

    /// Roles allowed to invoke this operation. Empty means open.
    pub fn required_roles(&self) -> &'static [Role] {
        match self {
            Operation::InsertOne
            | Operation::InsertMany
            | Operation::UpdateOne
            | Operation::Update
            | Operation::DeleteOne
            | Operation::Delete => WRITERS,
            Operation::FindOne | Operation::Find | Operation::Aggregate => READERS,
            Operation::CreatePrincipal | Operation::ListPrincipals => ADMINS,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::InsertOne => "insertOne",
            Operation::InsertMany => "insertMany",
            Operation::FindOne => "findOne",
            Operation::Find => "find",
            Operation::UpdateOne => "updateOne",
            Operation::Update => "update",
            Operation::DeleteOne => "deleteOne",
            Operation::Delete => "delete",
            Operation::Aggregate => "aggregate",
            Operation::CreatePrincipal => "createUser",
            Operation::ListPrincipals => "listUsers",
        }
    }

    pub fn is_write(&self) -> bool {
        self.required_roles() == WRITERS
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// How many documents an update or delete touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_operations_exclude_readers() {
        for op in [
            Operation::InsertOne,
            Operation::InsertMany,
            Operation::UpdateOne,
            Operation::Update,
            Operation::DeleteOne,
            Operation::Delete,
        ] {
            let roles = op.required_roles();
            assert!(roles.contains(&Role::WriteOnly), "{op}");
            assert!(roles.contains(&Role::ReadWrite), "{op}");
            assert!(roles.contains(&Role::Admin), "{op}");
            assert!(!roles.contains(&Role::ReadOnly), "{op}");
            assert!(op.is_write());
        }
    }

    #[test]
    fn read_operations_exclude_writers() {
        for op in [Operation::FindOne, Operation::Find, Operation::Aggregate] {
            let roles = op.required_roles();
            assert!(roles.contains(&Role::ReadOnly));
            assert!(!roles.contains(&Role::WriteOnly));
            assert!(!op.is_write());
        }
    }

    #[test]
    fn provisioning_is_admin_only() {
        assert_eq!(Operation::CreatePrincipal.required_roles(), &[Role::Admin]);
        assert_eq!(Operation::ListPrincipals.required_roles(), &[Role::Admin]);
    }
}
