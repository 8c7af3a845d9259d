//! # karat-engine: Transaction & Payout Services
//!
//! The operation surface of the Karat back-office. Every operation is an
//! async service method following the same pipeline:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   lookup ──► compute ──► persist ──► side-effect                        │
//! │   (repos)    (karat-core  (karat-db,   (notification hook,              │
//! │               pure fns)    one tx)      fire-and-forget)                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//! - [`sale_service`] - create / refund / layaway payments / backfill
//! - [`goldbuy_service`] - intake tickets: create / update / cancel
//! - [`resolver`] - caller lines → priced, frozen `SaleItem` rows
//! - [`notify`] - `NotificationHook` trait and the default `LoggingHook`
//! - [`numbers`] - invoice/ticket number generation
//! - [`error`] - `ApiError`, `ErrorCode`, `ApiResponse` envelope
//!
//! ## Example
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("./karat.db")).await?;
//! let sales = SaleService::new(db.clone());
//! let detail = sales.create_sale(request).await?;
//! ```

pub mod error;
pub mod goldbuy_service;
pub mod notify;
pub mod numbers;
pub mod resolver;
pub mod sale_service;

pub use error::{ApiError, ApiResponse, ApiResult, ErrorCode};
pub use goldbuy_service::{
    CreateGoldBuyRequest, GoldBuyItemRequest, GoldBuyService, UpdateGoldBuyRequest,
};
pub use notify::{EngineEvent, LoggingHook, NotificationHook, NotifyError};
pub use resolver::SaleLineRequest;
pub use sale_service::{
    CreateSaleRequest, HistoricalLayawayRequest, PaymentRequest, SaleService,
};
