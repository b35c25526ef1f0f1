//! Parser-instance API: compiles a grammar spec, runs it against bytes,
//! and implements the built-in callback-action catalogue the compiled
//! bytecode calls into.

pub mod config;
pub mod error;
pub mod host;
pub mod instance;

pub use config::{CompileConfig, RuntimeConfig};
pub use error::ParseError;
pub use host::RuntimeHost;
pub use instance::{ParseOutput, ParserInstance};
