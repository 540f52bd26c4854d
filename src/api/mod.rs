pub mod decoder;

pub use decoder::{DecoderOptions, GlyphDecoder};
