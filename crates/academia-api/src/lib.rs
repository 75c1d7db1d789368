pub mod approvals;
pub mod auth;
pub mod bootstrap;
pub mod courses;
pub mod error;
pub mod files;
pub mod middleware;
pub mod notifications;
pub mod password;
pub mod profile;
pub mod routes;
pub mod settings;
pub mod state;
pub mod validate;
pub mod views;
