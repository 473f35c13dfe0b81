//! File-backed implementations of the service stores.

pub mod class_catalog;
pub mod roster_store;
