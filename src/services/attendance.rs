// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Attendance Recorder: one QR check-in per user per day.

use crate::db::Store;
use crate::error::{Result, RuleViolation};
use crate::models::{Attendance, User, UserSummary};
use crate::services::qr;
use crate::time_utils::{DateKey, DatePolicy};
use serde::Serialize;
use std::sync::Arc;
use subtle::ConstantTimeEq;

/// Display format for check-in times, e.g. "Jun 1, 2024 9:30 AM".
const CHECK_IN_DISPLAY_FORMAT: &str = "%b %-d, %Y %-I:%M %p";

/// A check-in joined with who made it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceEntry {
    #[serde(flatten)]
    pub attendance: Attendance,
    /// Check-in time rendered in the business timezone
    pub check_in_display: String,
    pub user: UserSummary,
}

pub struct AttendanceService {
    store: Arc<dyn Store>,
    policy: DatePolicy,
}

impl AttendanceService {
    pub fn new(store: Arc<dyn Store>, policy: DatePolicy) -> Self {
        Self { store, policy }
    }

    /// Redeem `presented_code` for `user` on the current business date.
    ///
    /// Checks run in a fixed order: an existing check-in wins over any code
    /// problem, so a second scan fails with `AlreadyCheckedIn` whatever is
    /// presented.
    pub async fn record_check_in(&self, user: &User, presented_code: &str) -> Result<Attendance> {
        let today = self.policy.business_date();

        if self.store.find_attendance(&user.uid, &today).await?.is_some() {
            return Err(RuleViolation::AlreadyCheckedIn.into());
        }

        let presented_code = presented_code.trim();
        if !qr::is_well_formed(presented_code) {
            return Err(RuleViolation::InvalidCode.into());
        }

        let qr_code = self
            .store
            .list_active_qr_codes(&today)
            .await?
            .into_iter()
            .find(|qr| bool::from(qr.code.as_bytes().ct_eq(presented_code.as_bytes())))
            .ok_or(RuleViolation::InvalidCode)?;

        let now = self.policy.now();
        if qr_code.is_expired_at(now) {
            return Err(RuleViolation::Expired.into());
        }

        let attendance = Attendance::new(&user.uid, today, &qr_code.id, now);
        if !self.store.create_attendance(&attendance).await? {
            return Err(RuleViolation::AlreadyCheckedIn.into());
        }

        tracing::info!(
            user_id = %user.uid,
            date = %today,
            qr_id = %qr_code.id,
            "Check-in recorded"
        );

        Ok(attendance)
    }

    /// Check-ins for `date` (default: today), most recent first.
    pub async fn list_attendance(&self, date: Option<DateKey>) -> Result<Vec<AttendanceEntry>> {
        let date = date.unwrap_or_else(|| self.policy.business_date());

        let mut records = self.store.list_attendance_for_date(&date).await?;
        records.sort_by(|a, b| b.check_in_time.cmp(&a.check_in_time));

        let mut user_ids: Vec<String> = records.iter().map(|a| a.user_id.clone()).collect();
        user_ids.sort();
        user_ids.dedup();
        let users = self.store.get_users(&user_ids).await?;

        Ok(records
            .into_iter()
            .map(|attendance| AttendanceEntry {
                check_in_display: self
                    .policy
                    .format_local(attendance.check_in_time, CHECK_IN_DISPLAY_FORMAT),
                user: UserSummary::from_user(users.get(&attendance.user_id), &attendance.user_id),
                attendance,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::error::AppError;
    use crate::models::QrCode;
    use crate::time_utils::OrderWindow;
    use chrono::{DateTime, Duration, Utc};
    use mockable::Clock;
    use std::sync::Mutex;

    struct StepClock(Mutex<DateTime<Utc>>);

    impl Clock for StepClock {
        fn local(&self) -> DateTime<chrono::Local> {
            self.utc().with_timezone(&chrono::Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    const SECRET: &[u8] = b"unit-test-secret";

    struct Fixture {
        db: Arc<MemoryDb>,
        clock: Arc<StepClock>,
        policy: DatePolicy,
        service: AttendanceService,
    }

    fn fixture(now: &str) -> Fixture {
        let now = DateTime::parse_from_rfc3339(now).unwrap().with_timezone(&Utc);
        let db = Arc::new(MemoryDb::new());
        let clock = Arc::new(StepClock(Mutex::new(now)));
        let policy = DatePolicy::new(
            chrono_tz::America::New_York,
            OrderWindow::NextDay,
            clock.clone(),
        );
        let service = AttendanceService::new(db.clone(), policy.clone());
        Fixture {
            db,
            clock,
            policy,
            service,
        }
    }

    fn user(uid: &str) -> User {
        User::first_login(uid, Some("someone@example.com"), Some(uid), None, Utc::now())
    }

    fn todays_code(f: &Fixture) -> QrCode {
        let today = f.policy.business_date();
        let qr = QrCode {
            id: QrCode::doc_id(&today),
            date: today,
            code: qr::sign_code(SECRET, &today, "abcd").unwrap(),
            created_at: f.policy.now(),
            created_by: "admin".to_string(),
            is_active: true,
            expires_at: f.policy.end_of_day(&today),
        };
        f.db.put_qr_code(qr.clone());
        qr
    }

    #[tokio::test]
    async fn test_check_in_then_duplicate() {
        let f = fixture("2024-06-01T13:30:00Z");
        let qr = todays_code(&f);
        let alice = user("alice");

        let record = f.service.record_check_in(&alice, &qr.code).await.unwrap();
        assert_eq!(record.qr_code_id, qr.id);
        assert_eq!(record.date.to_string(), "2024-06-01");

        // Second attempt fails as a conflict regardless of the code presented.
        for code in [qr.code.as_str(), "bogus"] {
            let err = f.service.record_check_in(&alice, code).await.unwrap_err();
            assert_eq!(err.rule(), Some(&RuleViolation::AlreadyCheckedIn));
        }
        assert_eq!(f.db.attendance_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_code_is_invalid() {
        let f = fixture("2024-06-01T13:30:00Z");
        let qr = todays_code(&f);
        let alice = user("alice");

        let zeros = "0".repeat(64);
        for code in ["not-a-real-code", zeros.as_str(), &qr.code[..63]] {
            let err = f.service.record_check_in(&alice, code).await.unwrap_err();
            assert_eq!(err.rule(), Some(&RuleViolation::InvalidCode));
        }
        assert_eq!(f.db.attendance_count(), 0);
    }

    #[tokio::test]
    async fn test_matches_any_active_code_for_today() {
        let f = fixture("2024-06-01T13:30:00Z");
        let first = todays_code(&f);
        let today = f.policy.business_date();
        let second = QrCode {
            id: "legacy-second".to_string(),
            code: qr::sign_code(SECRET, &today, "ef01").unwrap(),
            created_at: first.created_at - Duration::hours(1),
            ..first.clone()
        };
        f.db.put_qr_code(second.clone());

        let record = f
            .service
            .record_check_in(&user("alice"), &second.code)
            .await
            .unwrap();
        assert_eq!(record.qr_code_id, "legacy-second");

        let record = f
            .service
            .record_check_in(&user("bob"), &first.code)
            .await
            .unwrap();
        assert_eq!(record.qr_code_id, first.id);
    }

    #[tokio::test]
    async fn test_no_code_issued_is_invalid() {
        let f = fixture("2024-06-01T13:30:00Z");
        let code = qr::sign_code(SECRET, &f.policy.business_date(), "abcd").unwrap();

        let err = f.service.record_check_in(&user("alice"), &code).await.unwrap_err();
        assert!(matches!(err, AppError::Rule(RuleViolation::InvalidCode)));
    }

    #[tokio::test]
    async fn test_expired_code_rejected_while_still_active() {
        let f = fixture("2024-06-01T13:30:00Z");
        let mut qr = todays_code(&f);
        qr.expires_at = f.policy.now() - Duration::minutes(1);
        assert!(qr.is_active);
        f.db.put_qr_code(qr.clone());

        let err = f.service.record_check_in(&user("alice"), &qr.code).await.unwrap_err();
        assert_eq!(err.rule(), Some(&RuleViolation::Expired));
        assert_eq!(f.db.attendance_count(), 0);
    }

    #[tokio::test]
    async fn test_listing_defaults_to_today_newest_first() {
        let f = fixture("2024-06-01T13:30:00Z");
        let qr = todays_code(&f);

        f.service.record_check_in(&user("alice"), &qr.code).await.unwrap();
        *f.clock.0.lock().unwrap() += Duration::minutes(10);
        f.service.record_check_in(&user("bob"), &qr.code).await.unwrap();

        f.db.upsert_user(&user("alice")).await.unwrap();

        let entries = f.service.list_attendance(None).await.unwrap();
        let uids: Vec<&str> = entries.iter().map(|e| e.attendance.user_id.as_str()).collect();
        assert_eq!(uids, vec!["bob", "alice"]);

        assert_eq!(entries[1].check_in_display, "Jun 1, 2024 9:30 AM");
        assert_eq!(entries[1].user.display_name, "alice");
        assert_eq!(entries[0].user.display_name, "Unknown User");
        assert_eq!(entries[0].user.email, "Unknown Email");

        let other_day = f
            .service
            .list_attendance(Some("2024-05-31".parse().unwrap()))
            .await
            .unwrap();
        assert!(other_day.is_empty());
    }
}
