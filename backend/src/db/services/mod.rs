//! The `services` module provides the data-access API for the application.
//! It owns all SQL for the `items` table so that HTTP handlers work with
//! domain models and the [`ItemRepository`] trait only.

pub mod item_query;
pub mod item_service;

pub use item_service::*;
