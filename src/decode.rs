//! Decoders for the three document shapes the map server sends: plain map
//! data, change documents grouped into create/modify/delete sections, and the
//! diff result returned after an upload.

pub mod changes;
pub mod diff;
pub mod handler;
pub mod map_data;

pub use changes::{decode_map_data_changes, MapDataChangesDecoder};
pub use diff::{decode_diff, DiffDecoder, DiffRecord};
pub use handler::{
    ChangeGroup, Handler, ListHandler, MapDataChangesHandler, MapDataHandler,
    SingleElementHandler,
};
pub use map_data::{decode_map_data, MapDataDecoder};
