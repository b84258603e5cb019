//! JSON-RPC surface.

pub mod router;

pub use router::dispatch;
