pub mod launcher;
pub mod service_gate;
pub mod stream_session;

pub use launcher::*;
pub use service_gate::*;
pub use stream_session::*;
