pub mod clob;
pub mod dry_run;
pub mod gamma;

pub use clob::ClobVenue;
pub use dry_run::DryRunVenue;
pub use gamma::GammaCatalog;
