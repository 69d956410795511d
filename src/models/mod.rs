pub mod admin;
pub mod alert;
pub mod booking;
pub mod classroom;
pub mod dashboard;
pub mod user;
