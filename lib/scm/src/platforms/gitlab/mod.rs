mod models;
mod provider;

pub use provider::GitlabProvider;
