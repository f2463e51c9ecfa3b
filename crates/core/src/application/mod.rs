// Application Layer - Use Cases and Business Logic

pub mod recovery;
pub mod status;
pub mod submit;
pub mod watchdog;
pub mod worker;

// Re-exports
pub use recovery::RecoveryService;
pub use status::{JobStatusView, StatusService};
pub use submit::{SubmitRequest, SubmitService};
pub use watchdog::Watchdog;
pub use worker::{shutdown_channel, wake_channel, ShutdownSender, ShutdownToken, Worker};
