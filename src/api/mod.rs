//! API handlers for Launchpad REST endpoints

pub mod health;
pub mod items;
pub mod openapi;
pub mod z3950;
