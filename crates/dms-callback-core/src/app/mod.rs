//! App layer: the resolver (token lifecycle) and the event handler that feeds it.
//!
//! - **resolver**: register / stop / failure operations over the ports
//! - **handler**: decode a trigger event, pick the operation, apply config defaults

pub mod handler;
pub mod resolver;

pub use self::handler::{
    DEFAULT_TABLE, EventHandler, HandlerConfig, HandlerError, HandlerOutcome,
};
pub use self::resolver::{
    NotificationResolver, Resolution, ResolveError, decide_failure, decide_stop,
};
