pub mod principal;

pub use principal::{PrincipalIdentity, PrincipalRecord};
