mod backend;
pub mod blocking;
mod error;
mod record;

pub use backend::LockBackend;
pub use blocking::{CancelToken, PollPolicy};
pub use error::LockError;
pub use record::{from_unix_millis, to_unix_millis, Lock};

pub(crate) use record::is_expired;
