use chrono::{DateTime, Duration, Utc};

use super::r#trait::AuditLogError;

/// Days covered by a log query when the caller gives no start.
pub const DEFAULT_WINDOW_DAYS: i64 = 30;

/// Inclusive time range `[start, end]` for log range scans.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TimeWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, AuditLogError> {
        if start > end {
            return Err(AuditLogError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// `[now - days, now]`.
    pub fn last_days(now: DateTime<Utc>, days: i64) -> Self {
        Self {
            start: now - Duration::days(days),
            end: now,
        }
    }

    /// Fill missing bounds: start defaults to 30 days before `now`, end to `now`.
    pub fn resolve(
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Self, AuditLogError> {
        let start = start.unwrap_or_else(|| now - Duration::days(DEFAULT_WINDOW_DAYS));
        let end = end.unwrap_or(now);
        Self::new(start, end)
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && at <= self.end
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_window_is_rejected() {
        let now = Utc::now();
        let err = TimeWindow::new(now, now - Duration::seconds(1)).unwrap_err();
        assert!(matches!(err, AuditLogError::InvalidWindow { .. }));
    }

    #[test]
    fn bounds_are_inclusive() {
        let now = Utc::now();
        let w = TimeWindow::new(now - Duration::minutes(1), now).unwrap();
        assert!(w.contains(now));
        assert!(w.contains(w.start()));
        assert!(!w.contains(now + Duration::milliseconds(1)));
    }

    #[test]
    fn missing_bounds_default_to_last_thirty_days() {
        let now = Utc::now();
        let w = TimeWindow::resolve(None, None, now).unwrap();
        assert_eq!(w, TimeWindow::last_days(now, DEFAULT_WINDOW_DAYS));

        let start = now - Duration::days(2);
        let w = TimeWindow::resolve(Some(start), None, now).unwrap();
        assert_eq!(w.start(), start);
        assert_eq!(w.end(), now);
    }
}
