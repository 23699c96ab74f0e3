//! Market data adapters

pub mod jupiter;

pub use jupiter::JupiterPriceSource;
