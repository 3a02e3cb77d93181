pub mod config;
pub mod factory;
pub mod handlers;
pub mod response;
pub mod restful;
