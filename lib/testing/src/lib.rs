pub mod fixtures;
pub mod platform;

pub use fixtures::{at, issue, merged};
pub use platform::InMemoryPlatform;
