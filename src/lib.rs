pub mod app;
pub mod core;
pub mod flow;
pub mod identity;
pub mod scanner;
pub mod store;
