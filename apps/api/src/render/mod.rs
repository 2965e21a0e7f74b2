pub mod handlers;
pub mod templates;
pub mod tree;

pub use templates::render;
pub use tree::VisualTree;
