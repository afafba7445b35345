//! Request and response bodies for the HTTP surface.

pub mod action;
pub mod users;
