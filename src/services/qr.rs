// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! QR Issuance Service.
//!
//! Each business date has at most one code. The redeemable value is
//! `hex(HMAC-SHA256(secret, "<date>-<nonce>"))`: it has no decodable
//! structure, so a presented code is authentic only if it matches the
//! stored record for today.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{QrCode, User};
use crate::time_utils::{DateKey, DatePolicy};
use anyhow::anyhow;
use hmac::{Hmac, Mac};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;

type HmacSha256 = Hmac<Sha256>;

const NONCE_LEN: usize = 16;
/// Length of a hex-encoded SHA-256 MAC.
pub const CODE_LEN: usize = 64;

/// Compute the code value for `date` and `nonce`.
pub fn sign_code(secret: &[u8], date: &DateKey, nonce: &str) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow!("invalid QR secret: {e}")))?;
    mac.update(format!("{date}-{nonce}").as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Whether `code` has the shape of a value produced by [`sign_code`].
pub fn is_well_formed(code: &str) -> bool {
    code.len() == CODE_LEN && code.bytes().all(|b| b.is_ascii_hexdigit())
}

pub struct QrService {
    store: Arc<dyn Store>,
    policy: DatePolicy,
    secret: Vec<u8>,
    rng: SystemRandom,
}

impl QrService {
    pub fn new(store: Arc<dyn Store>, policy: DatePolicy, secret: Vec<u8>) -> Self {
        Self {
            store,
            policy,
            secret,
            rng: SystemRandom::new(),
        }
    }

    /// Return today's active code, creating it if there is none.
    ///
    /// The boolean is `true` when this call created the code.
    pub async fn issue_for_today(&self, admin: &User) -> Result<(QrCode, bool)> {
        if !admin.is_admin {
            return Err(AppError::admin_required("generate QR codes"));
        }

        let today = self.policy.business_date();
        let active = self.store.list_active_qr_codes(&today).await?;
        if let Some(existing) = newest(active) {
            return Ok((existing, false));
        }

        let nonce = self.nonce()?;
        let now = self.policy.now();
        let qr = QrCode {
            id: QrCode::doc_id(&today),
            date: today,
            code: sign_code(&self.secret, &today, &nonce)?,
            created_at: now,
            created_by: admin.uid.clone(),
            is_active: true,
            expires_at: self.policy.end_of_day(&today),
        };

        if !self.store.create_qr_code(&qr).await? {
            // Another admin won the race; hand back their code.
            let active = self.store.list_active_qr_codes(&today).await?;
            let winner = newest(active).ok_or_else(|| {
                AppError::Internal(anyhow!("QR code for {today} exists but is inactive"))
            })?;
            return Ok((winner, false));
        }

        tracing::info!(
            qr_id = %qr.id,
            date = %today,
            admin_id = %admin.uid,
            expires_at = %qr.expires_at,
            "QR code issued"
        );

        if let Err(e) = self.store.deactivate_qr_codes_before(&today).await {
            tracing::warn!(error = %e, "Failed to deactivate earlier QR codes");
        }

        Ok((qr, true))
    }

    /// Today's active, unexpired code.
    pub async fn get_active_for_today(&self, admin: &User) -> Result<QrCode> {
        if !admin.is_admin {
            return Err(AppError::admin_required("view QR codes"));
        }

        let today = self.policy.business_date();
        let now = self.policy.now();
        let active = self.store.list_active_qr_codes(&today).await?;
        newest(active.into_iter().filter(|qr| qr.is_redeemable_at(now)))
            .ok_or_else(|| AppError::NotFound("No active QR code found for today".to_string()))
    }

    fn nonce(&self) -> Result<String> {
        let mut bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| AppError::Internal(anyhow!("failed to generate QR nonce")))?;
        Ok(hex::encode(bytes))
    }
}

/// Most recently created of `codes`.
fn newest(codes: impl IntoIterator<Item = QrCode>) -> Option<QrCode> {
    codes.into_iter().max_by_key(|qr| qr.created_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryDb;
    use crate::time_utils::OrderWindow;
    use chrono::{DateTime, Utc};
    use mockable::Clock;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn local(&self) -> DateTime<chrono::Local> {
            self.0.with_timezone(&chrono::Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn service_at(db: Arc<MemoryDb>, rfc3339: &str) -> QrService {
        let now = DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc);
        let policy = DatePolicy::new(
            chrono_tz::America::New_York,
            OrderWindow::NextDay,
            Arc::new(FixedClock(now)),
        );
        QrService::new(db, policy, b"unit-test-secret".to_vec())
    }

    fn admin() -> User {
        let mut user =
            User::first_login("admin", Some("admin@example.com"), None, None, Utc::now());
        user.is_admin = true;
        user
    }

    #[test]
    fn test_sign_code_is_keyed_hmac() {
        let date: DateKey = "2024-06-01".parse().unwrap();
        let code = sign_code(b"secret", &date, "00ff").unwrap();
        assert!(is_well_formed(&code));
        assert_eq!(code, sign_code(b"secret", &date, "00ff").unwrap());
        assert_ne!(code, sign_code(b"other", &date, "00ff").unwrap());
        assert_ne!(code, sign_code(b"secret", &date, "00fe").unwrap());
    }

    #[test]
    fn test_well_formed_codes() {
        assert!(is_well_formed(&"a".repeat(64)));
        assert!(!is_well_formed(&"a".repeat(63)));
        assert!(!is_well_formed(&"g".repeat(64)));
        assert!(!is_well_formed("not-a-code"));
    }

    #[tokio::test]
    async fn test_issue_is_idempotent_per_day() {
        let db = Arc::new(MemoryDb::new());
        let service = service_at(db.clone(), "2024-06-01T14:00:00Z");

        let (first, created) = service.issue_for_today(&admin()).await.unwrap();
        assert!(created);
        assert_eq!(first.id, "qr_2024-06-01");
        assert_eq!(
            crate::time_utils::format_utc_rfc3339(first.expires_at),
            "2024-06-02T03:59:59.999Z"
        );

        let (second, created) = service.issue_for_today(&admin()).await.unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.code, first.code);
        assert_eq!(db.qr_code_count(), 1);
    }

    #[tokio::test]
    async fn test_issuing_deactivates_earlier_codes() {
        let db = Arc::new(MemoryDb::new());
        let (yesterday, _) = service_at(db.clone(), "2024-05-31T14:00:00Z")
            .issue_for_today(&admin())
            .await
            .unwrap();

        service_at(db.clone(), "2024-06-01T14:00:00Z")
            .issue_for_today(&admin())
            .await
            .unwrap();

        let stale = db.list_active_qr_codes(&yesterday.date).await.unwrap();
        assert!(stale.is_empty());
        assert_eq!(db.qr_code_count(), 2);
    }

    #[tokio::test]
    async fn test_existing_codes_return_newest() {
        let db = Arc::new(MemoryDb::new());
        let service = service_at(db.clone(), "2024-06-01T14:00:00Z");
        let date: DateKey = "2024-06-01".parse().unwrap();
        let at = |rfc3339: &str| {
            DateTime::parse_from_rfc3339(rfc3339)
                .unwrap()
                .with_timezone(&Utc)
        };

        let legacy = [
            ("older", "2024-06-01T11:00:00Z"),
            ("newer", "2024-06-01T12:00:00Z"),
        ];
        for (id, created) in legacy {
            db.put_qr_code(QrCode {
                id: id.to_string(),
                date,
                code: sign_code(b"secret", &date, id).unwrap(),
                created_at: at(created),
                created_by: "admin".to_string(),
                is_active: true,
                expires_at: at("2024-06-02T03:59:59.999Z"),
            });
        }

        let (issued, created) = service.issue_for_today(&admin()).await.unwrap();
        assert!(!created);
        assert_eq!(issued.id, "newer");
        assert_eq!(db.qr_code_count(), 2);

        let active = service.get_active_for_today(&admin()).await.unwrap();
        assert_eq!(active.id, "newer");
    }

    #[tokio::test]
    async fn test_non_admin_rejected() {
        let db = Arc::new(MemoryDb::new());
        let service = service_at(db.clone(), "2024-06-01T14:00:00Z");
        let user = User::first_login("u1", Some("u1@example.com"), None, None, Utc::now());

        assert!(matches!(
            service.issue_for_today(&user).await,
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            service.get_active_for_today(&user).await,
            Err(AppError::Forbidden(_))
        ));
        assert_eq!(db.qr_code_count(), 0);
    }

    #[tokio::test]
    async fn test_get_active_for_today() {
        let db = Arc::new(MemoryDb::new());
        let service = service_at(db.clone(), "2024-06-01T14:00:00Z");

        assert!(matches!(
            service.get_active_for_today(&admin()).await,
            Err(AppError::NotFound(_))
        ));

        let (issued, _) = service.issue_for_today(&admin()).await.unwrap();
        let active = service.get_active_for_today(&admin()).await.unwrap();
        assert_eq!(active.id, issued.id);
    }
}
