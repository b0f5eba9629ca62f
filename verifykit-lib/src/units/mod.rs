//! Units and quantities with dimension-aware conversion
//!
//! Measurements and thresholds carry physical units written the way astronomy
//! tooling writes them (`mmag`, `marcsec`, `arcsec2`, `mag / arcsec^2`, `%`).
//! This module parses those strings into a [`Unit`], which records a scale
//! relative to the base unit of its dimension together with a vector of base
//! dimension exponents.
//!
//! # Implementation Model
//!
//! Two units are equivalent when their [`Dimensions`] match; converting a value
//! between equivalent units multiplies it by the ratio of their scales. Unit
//! strings are products of factors separated by whitespace or `*`, with any
//! `/` moving the following factors into the denominator. Each factor is a
//! known symbol, optionally preceded by an SI prefix when the symbol accepts
//! one, and optionally followed by an integer exponent (`arcsec2`, `s^-1`).
//!
//! A [`Quantity`] pairs an `f64` with a [`Unit`] and is the value type used by
//! datums, measurements and threshold specifications.

mod dimensions;
mod quantity;
mod unit;

pub use dimensions::{BaseDimension, Dimensions};
pub use quantity::Quantity;
pub use unit::Unit;
