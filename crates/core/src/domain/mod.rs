pub mod booking;
pub mod incident;
pub mod payment;
pub mod quote;
pub mod vendor;
