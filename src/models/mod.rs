mod discount_code;
mod server;
mod subscription;
mod user;

pub use discount_code::*;
pub use server::*;
pub use subscription::*;
pub use user::*;
