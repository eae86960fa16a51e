//! Backend access
//!
//! The `Fetcher` trait is the single round trip the engine performs against
//! the log-search backend. `HttpTransport` is the production implementation;
//! tests use `crate::mock::MockBackend`.

pub mod page;
pub mod transport;

pub use page::{EntryError, Page};
pub use transport::{Fetcher, HttpTransport, TransportError};
