//! Value codec subsystem
//!
//! Cell values are never stored raw. Every write passes through
//! `ValueCodec::encode` for the field's declared type and every read
//! through `ValueCodec::decode`.

mod decimal;
mod value;
mod value_codec;

pub use decimal::Decimal;
pub use value::LogicalValue;
pub use value_codec::{ValueCodec, DEFAULT_SHORT_TEXT_MAX};
