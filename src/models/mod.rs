mod course;
mod lecture;
mod purchase;
mod user;

pub use course::*;
pub use lecture::*;
pub use purchase::*;
pub use user::*;
