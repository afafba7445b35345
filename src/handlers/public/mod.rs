// Public handlers: no API key required
pub mod health;
pub mod root;

pub use health::health;
pub use root::root;
