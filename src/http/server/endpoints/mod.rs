pub mod federation;
pub mod token;
pub mod users;
