pub mod auth;
pub mod employees;
pub mod forms;
pub mod server;
