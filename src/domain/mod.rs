pub mod market;
pub mod order;
pub mod trade;

pub use market::*;
pub use order::*;
pub use trade::*;
