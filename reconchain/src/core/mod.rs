//! Core value types: collection methods, enumeration domains, link status.

mod domain;
mod methods;
mod status;

pub use domain::{dedup_by_sid, EnumerationDomain};
pub use methods::{resolve_collection_methods, CollectionMethod, CollectionMethodOption};
pub use status::LinkStatus;
