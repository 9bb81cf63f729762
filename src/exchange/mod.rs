pub mod traits;

pub use traits::{CatalogSnapshot, ExecutionVenue, MarketCatalog, VenueAck, VenueOrderState};

#[cfg(test)]
pub use traits::MockExecutionVenue;
