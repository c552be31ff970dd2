//! toolgraph library - expose modules for testing
//!
//! The binary is a thin host around [`lifecycle::CompilerSession`]; the
//! commands only supply the build/serve context and the lifecycle triggers.

pub mod commands;
pub mod common;
pub mod errors;
pub mod lifecycle;

pub use common::GlobalOpts;
pub use toolgraph_logger as logger;
