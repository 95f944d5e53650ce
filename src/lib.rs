//! Team Wire - team news collector and article page
//!
//! The collector turns a list of RSS/Atom feeds into a single JSON feed
//! document. The web page loads that document on every request and renders
//! a card list that can be filtered by source.

pub mod cli;
pub mod collector;
pub mod config;
pub mod dates;
pub mod escape;
pub mod feed;
pub mod loader;
pub mod render;
pub mod routes;
pub mod sources;
