//! Permission catalog domain entities.

pub mod action;
pub mod edge;
pub mod module;

pub use action::PosAction;
pub use edge::{ModuleActionEdge, ModuleActionMeta};
pub use module::PosModule;
