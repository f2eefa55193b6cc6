//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Maintenance: evicts idle cached queries and sweeps expired sessions

mod maintenance;

pub use maintenance::spawn_maintenance_task;
