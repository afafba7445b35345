pub mod action_service;
pub mod bootstrap;
pub mod user_service;

pub use action_service::ActionService;
pub use user_service::{ProvisionError, UserService};
