pub mod format;
pub mod manager;
pub mod session;
