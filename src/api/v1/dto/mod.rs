pub mod users;
pub mod workouts;
