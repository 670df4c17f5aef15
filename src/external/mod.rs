pub mod assets;
#[cfg(test)]
pub mod fakes;
pub mod mailer;

pub use assets::*;
pub use mailer::*;
