use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThrottleReason {
    NoLimit,
    NeverFetched,
    RefreshLimitExceeded,
    WithinLimit,
}

impl ThrottleReason {
    pub fn as_str(self) -> &'static str {
        match self {
            ThrottleReason::NoLimit => "no_limit",
            ThrottleReason::NeverFetched => "never_fetched",
            ThrottleReason::RefreshLimitExceeded => "refresh_limit_exceeded",
            ThrottleReason::WithinLimit => "within_limit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleDecision {
    pub eligible: bool,
    pub reason: ThrottleReason,
}

impl ThrottleDecision {
    fn eligible(reason: ThrottleReason) -> Self {
        Self { eligible: true, reason }
    }

    fn throttled() -> Self {
        Self {
            eligible: false,
            reason: ThrottleReason::WithinLimit,
        }
    }
}

/// Whether a refresh may run, given the minimum interval and the last fetch.
/// A forced refresh never consults this.
pub fn should_fetch_at(
    interval_minutes: u32,
    last_fetch: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> ThrottleDecision {
    if interval_minutes == 0 {
        return ThrottleDecision::eligible(ThrottleReason::NoLimit);
    }
    let Some(last) = last_fetch else {
        return ThrottleDecision::eligible(ThrottleReason::NeverFetched);
    };

    if now - last >= Duration::minutes(i64::from(interval_minutes)) {
        ThrottleDecision::eligible(ThrottleReason::RefreshLimitExceeded)
    } else {
        ThrottleDecision::throttled()
    }
}

pub fn should_fetch(interval_minutes: u32, last_fetch: Option<DateTime<Utc>>) -> ThrottleDecision {
    should_fetch_at(interval_minutes, last_fetch, Utc::now())
}
