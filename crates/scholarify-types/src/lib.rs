//! Domain types shared by the database layer and the HTTP API.

pub mod api;
pub mod models;
