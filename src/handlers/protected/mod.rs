// Protected handlers
//
// Every route here sits behind the API-key middleware and carries its own
// required-role layer (see `types::Operation::required_roles`).
pub mod action; // POST /action/:operation
pub mod users; // POST|GET /users
