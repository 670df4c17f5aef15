pub mod account;
pub mod common;
pub mod event;
pub mod gift;
pub mod roster;

pub use account::*;
pub use common::*;
pub use event::*;
pub use gift::*;
pub use roster::*;
