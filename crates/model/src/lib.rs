//! Data model for the stockroom retail dashboard.
//!
//! Every tracked entity comes in two shapes:
//! * a full [`Record`] with every field required, as returned by a bulk read, and
//! * a sparse [`Patch`] with every mutable field optional, as pushed over an
//!   update stream.
//!
//! Keeping the two distinct means a patch can only ever be merged into an
//! existing record; there is no way to build a record out of a patch.
//!
//! The remaining types are request and response payloads of the dashboard API
//! (authentication, stock mutations, forecasts and summary statistics).

#![warn(missing_docs)]

pub mod analytics;
pub mod auth;
pub mod delivery;
pub mod id;
pub mod inventory;
pub mod ledger;
pub mod record;
pub mod time;

pub use analytics::{DashboardStats, ForecastPoint};
pub use auth::{AccessToken, Credentials, Registration, Role, UserProfile};
pub use delivery::{Delivery, DeliveryPatch, DeliveryStatus, NewDelivery, ROUTE_STAGES};
pub use id::{EntityId, EntityKind};
pub use inventory::{InventoryItem, InventoryPatch, NewInventoryItem, StockAction, StockAdjusted, StockAdjustment};
pub use ledger::{ChainBreak, ChainReport, GENESIS_HASH, LedgerEntry, LedgerPatch, TransactionKind, verify_links};
pub use record::{FieldChanges, Patch, Record};
