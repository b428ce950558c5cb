//! Canonical listing shapes shared across layers.

pub mod record;
pub mod value;

pub use record::{
    AssetPath, Attribute, ListingDuration, Price, Record, SaleMethod, SaleMethodKind,
    SpecificBuyer, UnlockableContent,
};
pub use value::Value;
