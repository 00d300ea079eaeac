//! Streaming decoding of OSM map data, change documents and upload diff
//! results into change-tracked entities.
//!
//! - [`xml`]: the element-by-element XML walker every decoder is built on
//! - [`decode`]: map data, change and diff decoders plus their handler traits
//! - [`data`]: coordinates, bounding boxes and the node/way/relation model

pub mod data;
pub mod decode;
pub mod errors;
pub mod xml;

pub use errors::{DecodeCause, Error, Result};
