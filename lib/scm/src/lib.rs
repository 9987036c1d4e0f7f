pub mod commit;
pub mod errors;
pub mod platforms;

pub use tokio_util::sync::CancellationToken;
