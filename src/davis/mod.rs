pub mod decoder;
pub mod packet;

pub use decoder::decode;
pub use packet::{scan, RawFrame};
