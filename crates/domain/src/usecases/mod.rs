//! Application use cases / business logic

pub mod command;
pub mod filter;
pub mod relay;
pub mod render;

pub use filter::NewPostPolicy;
pub use relay::{RelayConfig, RelayLoop};
pub use render::{RenderConfig, Renderer};
