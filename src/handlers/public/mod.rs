// handlers/public/mod.rs - endpoints reachable without a token
//
// Route Prefix: none (`/`, `/health`, `/auth/*`)

pub mod auth;
pub mod system;

pub use auth::{login as auth_login, register as auth_register};
pub use system::{health, root};
