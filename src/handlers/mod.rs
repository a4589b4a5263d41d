// handlers/mod.rs - handlers grouped by security tier
//
// Public (no auth) → Protected (JWT + active account). Admin-only routes live
// under protected and check the caller's role themselves.

pub mod protected;
pub mod public;
