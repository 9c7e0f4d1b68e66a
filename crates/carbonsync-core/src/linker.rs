//! Report-NFT linker: correlates minted report tokens with report records.
//!
//! The NFT contract stores a payload per token of the form
//! `<ciphertext>.<signature>`. The ciphertext decrypts to a JSON document
//! carrying the report's correlation `uuid`.
//!
//! Payload failures (split, decrypt, parse) are logged and reported as
//! [`LinkOutcome::Skipped`]. Report-store failures are returned as errors so
//! the range is retried.

use std::sync::Arc;

use alloy_primitives::U256;
use serde::Deserialize;
use tracing::{error, info};

use crate::error::SyncError;
use crate::store::ReportStore;

/// Separator between ciphertext and signature in the on-chain payload.
pub const PAYLOAD_SEPARATOR: char = '.';

/// Opaque payload decryption, provided by the platform's crypto utilities.
pub trait PayloadDecryptor: Send + Sync {
    fn decrypt(&self, ciphertext: &str) -> Result<String, SyncError>;
}

/// The two halves of an on-chain report payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPayload<'a> {
    pub ciphertext: &'a str,
    pub signature: Option<&'a str>,
}

impl<'a> SealedPayload<'a> {
    pub fn split(raw: &'a str) -> Result<Self, SyncError> {
        let (ciphertext, signature) = match raw.split_once(PAYLOAD_SEPARATOR) {
            Some((c, s)) => (c, Some(s)),
            None => (raw, None),
        };
        if ciphertext.is_empty() {
            return Err(SyncError::Payload("empty ciphertext".into()));
        }
        Ok(Self { ciphertext, signature })
    }
}

#[derive(Debug, Deserialize)]
struct ReportPayload {
    uuid: Option<uuid::Uuid>,
}

/// Extract the correlation UUID from a decrypted payload.
pub fn parse_report_uuid(plaintext: &str) -> Result<uuid::Uuid, SyncError> {
    let payload: ReportPayload = serde_json::from_str(plaintext)
        .map_err(|e| SyncError::Payload(format!("report data is not valid JSON: {e}")))?;
    payload
        .uuid
        .ok_or_else(|| SyncError::Payload("UUID not found in report data".into()))
}

/// Result of [`ReportLinker::link`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    Linked { report_id: i64 },
    ReportNotFound { uuid: uuid::Uuid },
    Skipped { reason: String },
}

pub struct ReportLinker {
    reports: Arc<dyn ReportStore>,
    decryptor: Arc<dyn PayloadDecryptor>,
}

impl ReportLinker {
    pub fn new(reports: Arc<dyn ReportStore>, decryptor: Arc<dyn PayloadDecryptor>) -> Self {
        Self { reports, decryptor }
    }

    /// Link the report referenced by `payload` to `nft_id` minted in `tx_hash`.
    pub async fn link(&self, payload: &str, nft_id: U256, tx_hash: &str) -> Result<LinkOutcome, SyncError> {
        match self.try_link(payload, nft_id, tx_hash).await {
            Err(e) if e.is_skippable() => {
                error!(nft_id = %nft_id, hash = %tx_hash, error = %e, "report link skipped");
                Ok(LinkOutcome::Skipped { reason: e.to_string() })
            }
            other => other,
        }
    }

    async fn try_link(&self, payload: &str, nft_id: U256, tx_hash: &str) -> Result<LinkOutcome, SyncError> {
        let sealed = SealedPayload::split(payload)?;
        let plaintext = self.decryptor.decrypt(sealed.ciphertext)?;
        let uuid = parse_report_uuid(&plaintext)?;

        let Some(report) = self.reports.find_by_uuid(&uuid).await? else {
            error!(uuid = %uuid, nft_id = %nft_id, "report not found");
            return Ok(LinkOutcome::ReportNotFound { uuid });
        };

        self.reports.link_mint(report.id, nft_id, tx_hash).await?;
        info!(report = report.id, uuid = %uuid, nft_id = %nft_id, hash = %tx_hash, "report linked to NFT");
        Ok(LinkOutcome::Linked { report_id: report.id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Report;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    const UUID: &str = "6f1c2a3e-9b7d-4c5e-8f10-2a3b4c5d6e7f";

    /// "Decrypts" by stripping a `enc:` prefix.
    struct PrefixDecryptor;

    impl PayloadDecryptor for PrefixDecryptor {
        fn decrypt(&self, ciphertext: &str) -> Result<String, SyncError> {
            ciphertext
                .strip_prefix("enc:")
                .map(str::to_string)
                .ok_or_else(|| SyncError::Payload("bad ciphertext".into()))
        }
    }

    #[derive(Default)]
    struct Reports(Mutex<Vec<Report>>, AtomicBool);

    #[async_trait]
    impl ReportStore for Reports {
        async fn find_by_uuid(&self, uuid: &uuid::Uuid) -> Result<Option<Report>, SyncError> {
            if self.1.load(Ordering::SeqCst) {
                return Err(SyncError::Storage("connection reset".into()));
            }
            Ok(self.0.lock().unwrap().iter().find(|r| r.uuid == *uuid).cloned())
        }

        async fn link_mint(&self, report_id: i64, nft_id: U256, tx_hash: &str) -> Result<(), SyncError> {
            let mut reports = self.0.lock().unwrap();
            if let Some(r) = reports.iter_mut().find(|r| r.id == report_id) {
                r.nft_id = Some(nft_id);
                r.transaction_hash = Some(tx_hash.to_string());
            }
            Ok(())
        }
    }

    fn linker_with(reports: Vec<Report>) -> (ReportLinker, Arc<Reports>) {
        let store = Arc::new(Reports(Mutex::new(reports), AtomicBool::new(false)));
        (ReportLinker::new(store.clone(), Arc::new(PrefixDecryptor)), store)
    }

    fn report() -> Report {
        Report { id: 4, uuid: UUID.parse().unwrap(), nft_id: None, transaction_hash: None }
    }

    #[test]
    fn split_payload() {
        let p = SealedPayload::split("abc.def").unwrap();
        assert_eq!(p.ciphertext, "abc");
        assert_eq!(p.signature, Some("def"));

        let p = SealedPayload::split("abc").unwrap();
        assert_eq!(p.signature, None);

        assert!(SealedPayload::split(".sig").is_err());
    }

    #[test]
    fn uuid_missing_from_payload() {
        assert!(parse_report_uuid(r#"{"annual":2024}"#).is_err());
        assert!(parse_report_uuid("not json").is_err());
        assert_eq!(parse_report_uuid(&format!(r#"{{"uuid":"{UUID}"}}"#)).unwrap().to_string(), UUID);
    }

    #[tokio::test]
    async fn links_matching_report() {
        let (linker, store) = linker_with(vec![report()]);
        let payload = format!(r#"enc:{{"uuid":"{UUID}","annual":2024}}.sig"#);

        let outcome = linker.link(&payload, U256::from(12u64), "ff").await.unwrap();
        assert_eq!(outcome, LinkOutcome::Linked { report_id: 4 });

        let r = &store.0.lock().unwrap()[0];
        assert_eq!(r.nft_id, Some(U256::from(12u64)));
        assert_eq!(r.transaction_hash.as_deref(), Some("ff"));
    }

    #[tokio::test]
    async fn unknown_uuid_leaves_store_untouched() {
        let (linker, store) = linker_with(vec![report()]);
        let other = "00000000-0000-4000-8000-000000000001";
        let payload = format!(r#"enc:{{"uuid":"{other}"}}.sig"#);

        let outcome = linker.link(&payload, U256::from(12u64), "ff").await.unwrap();
        assert!(matches!(outcome, LinkOutcome::ReportNotFound { .. }));
        assert_eq!(store.0.lock().unwrap()[0], report());
    }

    #[tokio::test]
    async fn decrypt_failure_is_a_skip() {
        let (linker, store) = linker_with(vec![report()]);
        let outcome = linker.link("garbage.sig", U256::from(12u64), "ff").await.unwrap();
        assert!(matches!(outcome, LinkOutcome::Skipped { .. }));
        assert_eq!(store.0.lock().unwrap()[0], report());
    }

    #[tokio::test]
    async fn store_failure_is_returned() {
        let (linker, store) = linker_with(vec![report()]);
        store.1.store(true, Ordering::SeqCst);
        let payload = format!(r#"enc:{{"uuid":"{UUID}"}}.sig"#);

        let err = linker.link(&payload, U256::from(12u64), "ff").await.unwrap_err();
        assert!(matches!(err, SyncError::Storage(_)));
        assert_eq!(store.0.lock().unwrap()[0], report());
    }
}
