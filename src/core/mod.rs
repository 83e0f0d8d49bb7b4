pub mod config;
pub mod error;
pub mod media;


pub use config::*;
pub use error::*;
pub use media::*;
