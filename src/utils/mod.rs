pub mod derangement;
pub mod email;
pub mod jwt;
pub mod password;

pub use derangement::{derangement, is_derangement};
pub use email::*;
pub use jwt::*;
pub use password::*;
