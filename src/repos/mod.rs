pub mod error;
pub mod user_repo;
pub mod workout_repo;
