pub mod handlers;
pub mod mutations;
pub mod save;
pub mod session;

pub use save::SaveScheduler;
pub use session::SessionRegistry;
