//! Change watching: availability state, subscriber registry and the
//! long-poll loop that ties them together.

mod callbacks;
mod state;
mod watcher;

pub use callbacks::*;
pub use state::*;
pub(crate) use watcher::*;
