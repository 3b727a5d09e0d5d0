//! Offline-first browser for the Rebrickable LEGO catalog.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
