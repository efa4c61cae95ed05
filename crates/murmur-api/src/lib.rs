pub mod auth;
pub mod error;
pub mod image_store;
pub mod messages;
pub mod middleware;
pub mod reactions;
pub mod view;
