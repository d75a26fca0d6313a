mod merge;
mod refresher;
mod retention;
mod throttle;
mod unread;

pub use merge::{merge, urls_of};
pub use refresher::{FeedRefreshResult, RefreshStatus, Refresher};
pub use retention::{partition_retained, retain, retain_at, RETENTION_WINDOW_HOURS};
pub use throttle::{should_fetch, should_fetch_at, ThrottleDecision, ThrottleReason};
pub use unread::{reconcile, reconcile_all};
