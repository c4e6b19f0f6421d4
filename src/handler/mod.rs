pub mod builtin;
pub mod executor;
pub mod handler;
pub mod registry;

pub use builtin::{EchoHandler, FlakyHandler, FnHandler};
pub use executor::TaskExecutor;
pub use handler::{TaskHandler, TaskInvocation};
pub use registry::HandlerRegistry;
