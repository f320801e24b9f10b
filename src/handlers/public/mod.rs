// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Token acquisition only: registration, login and refresh.

pub mod auth;
