//! Reader, editor, and writer for Quake-2 style IBSP v38 map files: the
//! binary lump container, the fixed-record geometry/visibility/brush lumps,
//! and the ASCII entity lump, plus the handful of edit operations a map
//! tool needs to round-trip a file it didn't otherwise touch.

pub mod byte_view;
pub mod entities;
pub mod error;
pub mod header;
pub mod lump_codecs;
pub mod model;
pub mod records;
pub mod vis;

mod edit_ops;

pub use entities::{message_from_tokens, message_tokens, Entity, EntityLump, MessageToken};
pub use error::{Error, Result, Warning};
pub use header::{Header, LoadOptions, LumpDirectory, LumpEntry, LumpId};
pub use model::{load, BspModel, Loaded, OpaqueLumps};
pub use records::*;
pub use vis::{ClusterVis, VisData};
