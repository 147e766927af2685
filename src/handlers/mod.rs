// HTTP request handlers, one module per resource

pub mod artisans;
pub mod auth;
pub mod categories;
pub mod events;
pub mod forum;
pub mod health;
pub mod products;
