pub mod dispatcher;
pub mod instance;

pub use dispatcher::{DEFAULT_DISPATCHER_HEADER, render_dispatcher};
pub use instance::{DEFAULT_INSTANCE_HEADER, PORT_PLACEHOLDER, render_instance};
