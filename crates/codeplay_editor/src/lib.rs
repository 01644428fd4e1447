//! CodePlay Editor
//!
//! The session controller that ties the pipeline, the console bridge, the
//! debouncers and the persistence services together, and the command-line
//! front end built on it.

pub mod app;
pub mod cli;
pub mod commands;
pub mod watch;

pub use app::{App, StartupSource, TickReport};
