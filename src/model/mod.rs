pub mod attendance;
pub mod gym;
pub mod location;
pub mod role;
pub mod shift;
pub mod user;
