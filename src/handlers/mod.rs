// handlers/mod.rs - two security tiers
//
// Public (no auth) → Protected (API key + required role per route)
pub mod protected; // /action/*, /users
pub mod public; // /, /health
