//! The connection dispatcher: listen/accept loop and per-connection
//! lifecycle, parameterized by a [`ServiceConfig`].

pub mod dispatcher;

pub use dispatcher::{Dispatcher, Route, ServeError, ServiceConfig};
