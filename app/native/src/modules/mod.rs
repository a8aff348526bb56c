//! Feature modules for Reel.
//!
//! - [`hotkeys`] - hotkey definitions, watcher registries and the keypress monitor
//! - [`timeline`] - item actors, the item tree and the timeline supervisor

pub mod hotkeys;
pub mod timeline;
