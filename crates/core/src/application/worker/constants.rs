// Worker constants (no magic values)
use std::time::Duration;

/// Sleep duration when no jobs are pending and no wake arrives (500ms)
pub const IDLE_SLEEP_DURATION: Duration = Duration::from_millis(500);

/// Sleep duration after a worker error before retry (1s)
pub const ERROR_RECOVERY_SLEEP_DURATION: Duration = Duration::from_secs(1);

/// Default maximum time a job may stay in Processing before the
/// watchdog force-fails it (5 minutes)
pub const DEFAULT_MAX_PROCESSING_MS: i64 = 5 * 60 * 1000;

/// Default watchdog sweep interval (30 seconds)
pub const DEFAULT_WATCHDOG_SWEEP_INTERVAL: Duration = Duration::from_secs(30);
