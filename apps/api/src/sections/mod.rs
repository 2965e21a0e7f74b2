// Section Registry: per-type schemas, defaults and titles for custom sections.

pub mod handlers;
pub mod registry;
