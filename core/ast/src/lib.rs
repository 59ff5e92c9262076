#![warn(clippy::pedantic)]
pub mod arena;
pub mod builder;
pub mod errors;
pub mod nodes;
pub(crate) mod nodes_impl;
