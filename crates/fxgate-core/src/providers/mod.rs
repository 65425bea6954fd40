//! Concrete [`RateProvider`](crate::RateProvider) implementations.

mod frankfurter;

pub use frankfurter::FrankfurterProvider;
