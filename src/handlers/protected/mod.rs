// handlers/protected/mod.rs - Protected handlers (JWT authentication required)
//
// Security Level: bearer access token
// Route Prefix: /api/* except the public auth routes
// Middleware: jwt_auth_middleware injects AuthUser; handlers turn it into a
// Principal for the service call.

pub mod auth;
pub mod dashboard;
pub mod employees;
pub mod forms;
