pub mod auth;
pub mod incidents;
pub mod middleware;
