pub mod decoder;
pub mod frame;

pub use decoder::{DecodeSummary, SyntheticDecoder};
pub use frame::Frame;
pub use frame::PixelFormat;
