//! Bridge layer: transaction building, reconciliation and the translated
//! handlers built on top of them.

pub mod builder;
pub mod handlers;
pub mod reconciler;

pub use builder::{normalize_abi, TransactionBuilder};
pub use handlers::{EthBridge, Reply};
pub use reconciler::{CodeLookup, ReceiptState, Reconciler, PLACEHOLDER_CODE};
