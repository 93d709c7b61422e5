//! Purchase request to RFQ workflow

pub mod rfq;

pub use rfq::*;
