pub mod booking_repo;
pub mod memory;
pub mod mongo;
