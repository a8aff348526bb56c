//! Timelines: ordered trees of item actors under a supervising actor.
//!
//! - [`structure`] - the structural description format
//! - [`item`] - one actor per item
//! - [`ItemTree`] - the keyed, ordered item collection owned by a timeline
//! - [`actor`] - the timeline actor and its handle

pub mod actor;
mod error;
pub mod item;
pub mod structure;
mod tree;

pub use actor::{TimelineActor, TimelineChange, TimelineEvent, TimelineHandle, TimelineNotice};
pub use error::TimelineError;
pub use item::{ItemActor, ItemEvent, ItemHandle};
pub use structure::{ItemRecord, ItemType};
pub use tree::{ItemTree, TreeEntry};
