//! # billbook-register: The Register Service
//!
//! Orchestrates a checkout counter on top of `billbook-core` (rules) and
//! `billbook-db` (storage).
//!
//! ## Module Organization
//! ```text
//! billbook_register/
//! ├── lib.rs          ◄─── You are here
//! ├── app.rs          ◄─── Startup wiring (Billbook)
//! ├── register.rs     ◄─── Cart state, commit/hold/resume/mark_paid, reports
//! ├── catalog.rs      ◄─── Validated product/customer/settings management
//! ├── store.rs        ◄─── BillStore / Catalog traits + SQLite impls
//! ├── printer.rs      ◄─── Receipt snapshot and ReceiptPrinter seam
//! ├── config.rs       ◄─── RegisterConfig (TOML + settings + env)
//! ├── telemetry.rs    ◄─── tracing subscriber
//! └── error.rs        ◄─── RegisterError + ErrorCode for the UI
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use billbook_register::{Billbook, NoOpPrinter, RegisterConfig};
//!
//! let config = RegisterConfig::load(None)?;
//! let app = Billbook::open(config, Arc::new(NoOpPrinter)).await?;
//!
//! app.register.add_product(&rice.id, Decimal::from(2)).await?;
//! let outcome = app.register.commit(PaymentMethod::Upi).await?;
//! ```

pub mod app;
pub mod catalog;
pub mod config;
pub mod error;
pub mod printer;
pub mod register;
pub mod store;
pub mod telemetry;

pub use app::Billbook;
pub use catalog::CatalogService;
pub use config::{ConfigError, ConfigResult, DatabaseSettings, RegisterConfig, StoreConfig};
pub use error::{ErrorCode, ErrorPayload, RegisterError, RegisterResult};
pub use printer::{JsonLinePrinter, NoOpPrinter, PrintError, Receipt, ReceiptLine, ReceiptPrinter};
pub use register::{CommitOutcome, MarkPaidOutcome, Register};
pub use store::{BillStore, Catalog};
