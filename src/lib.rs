pub mod access;
pub mod authn;
pub mod authz;
pub mod clock;
pub mod code;
pub mod config;
pub mod context;
pub mod logs;
pub mod server;
pub mod session;
pub mod users;
