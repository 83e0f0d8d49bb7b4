pub mod change_watcher;
pub mod events;


pub use change_watcher::*;
pub use events::*;
