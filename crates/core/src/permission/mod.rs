//! Per-actor access control on credential names

pub mod ports;
pub mod service;

pub use ports::PermissionRepository;
pub use service::PermissionService;
