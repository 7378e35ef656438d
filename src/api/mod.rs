pub mod attendance;
pub mod users;
