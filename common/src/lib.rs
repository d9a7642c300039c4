//! RateBridge Common Types
//!
//! Shared types used across the RateBridge workspace: currency codes, the
//! required-currency set, source quotes and resolved rates, plus the fixed-point
//! rounding rules every stage applies to rate values.

pub mod currency;
pub mod quote;
pub mod rate;
pub mod rounding;

pub use currency::*;
pub use quote::*;
pub use rate::*;
pub use rounding::*;
