pub mod attendance;
pub mod branch;
pub mod catalog;
pub mod checkin;
pub mod employee;
pub mod incident;
pub mod logs;
pub mod schedule;
pub mod template;
pub mod zone;
