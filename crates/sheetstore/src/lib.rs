//! Treat a spreadsheet range as a small record store.
//!
//! The first row of a range is the header. Every other row is a record keyed
//! by header names. [`SheetStore`] implements select, append, insert,
//! prepend, update and delete on top of a [`GridTransport`], which is the
//! only thing that talks to the remote service.

pub mod errors;
pub mod filter;
pub mod grid;
pub mod memory;
pub mod mutation;
pub mod record;
pub mod store;
pub mod transport;

pub use errors::{Result, SheetStoreError};
pub use filter::{Filter, FilterValue, Predicate};
pub use grid::Grid;
pub use memory::MemoryTransport;
pub use record::Record;
pub use store::SheetStore;
pub use transport::{GridTransport, InputOption, RenderMode, SheetRange};
