//! # Repository Module
//!
//! Repository implementations for each aggregate.
//!
//! ## Repository Pattern
//! Each repository wraps the shared `SqlitePool` and owns the SQL for one
//! aggregate. Engine services never see SQL; they see typed methods that
//! return domain rows from karat-core.
//!
//! - [`inventory`] - stock records; conditional sold-marking
//! - [`sale`] - sales, line items, installments; transactional create
//! - [`goldbuy`] - buy tickets and intake lines
//! - [`config`] - key/value app configuration (tax rate)

pub mod config;
pub mod goldbuy;
pub mod inventory;
pub mod sale;
