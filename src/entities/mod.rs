pub mod accounts;
pub mod events;

pub use accounts as account_entity;
pub use events as event_entity;
