pub mod attendance;
pub mod branch;
pub mod department;
pub mod employee;
pub mod employee_log;
pub mod face_template;
pub mod incident;
pub mod role;
pub mod schedule;
pub mod user;
pub mod zone;
