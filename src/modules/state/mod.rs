// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::{async_find_impl, delete_impl, upsert_impl, with_rw_impl};
use crate::modules::error::{code::ErrorCode, RustTicketResult};
use crate::{raise_error, utc_now};
use native_db::db_type::Error as DbError;
use native_db::*;
use native_model::{native_model, Model};
use serde::{Deserialize, Serialize};
use std::sync::Arc;


/// Permanent memory of messages that already produced a ticket.
/// Bounded: once the cap is exceeded the oldest ids are evicted first.
const MAX_STORED_IDS: usize = 5000;

/// Singleton rows share this primary key.
const SINGLETON_KEY: u64 = 1;

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 1, version = 1)]
#[native_db]
pub struct SyncWatermark {
    #[primary_key]
    pub key: u64,
    /// The highest fully-applied Gmail `historyId`. All notifications up to
    /// and including this value have been processed.
    pub history_id: u64,
    pub updated_at: i64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 2, version = 1)]
#[native_db]
pub struct ProcessedRegistry {
    #[primary_key]
    pub key: u64,
    pub message_ids: Vec<String>,
}

/// Short-lived reservation on a message id. Created atomically at the start
/// of processing; deleted only on failure. A row left behind by a completed
/// message is harmless because the processed registry is checked first.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 3, version = 1)]
#[native_db]
pub struct MessageClaim {
    #[primary_key]
    pub message_id: String,
    pub claimed_at: i64,
}

#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[native_model(id = 4, version = 1)]
#[native_db]
pub struct WatchState {
    #[primary_key]
    pub key: u64,
    pub history_id: u64,
    /// Expiration of the Gmail watch registration, epoch milliseconds.
    pub expiration: i64,
}

/// Persistent dedup/claim state shared by all in-flight message invocations.
///
/// The database handle is injected so tests run against an in-memory
/// instance; see `DatabaseManager`.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database<'static>>,
}

impl StateStore {
    pub fn new(db: Arc<Database<'static>>) -> Self {
        Self { db }
    }

    /// Attempts to take exclusive ownership of `message_id`.
    ///
    /// Returns false when the id was already processed or another invocation
    /// currently holds the claim. The processed-set check and the conditional
    /// insert run inside one write transaction, so two concurrent callers can
    /// never both observe "unclaimed" and proceed.
    pub async fn claim(&self, message_id: &str) -> RustTicketResult<bool> {
        let claim = MessageClaim {
            message_id: message_id.to_string(),
            claimed_at: utc_now!(),
        };
        with_rw_impl(&self.db, move |rw| {
            let registry: Option<ProcessedRegistry> = rw
                .get()
                .primary(SINGLETON_KEY)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            if let Some(registry) = registry {
                if registry.message_ids.iter().any(|id| id == &claim.message_id) {
                    return Ok(false);
                }
            }
            match rw.insert(claim) {
                Ok(()) => Ok(true),
                Err(DbError::DuplicateKey { .. }) => Ok(false),
                Err(e) => Err(raise_error!(format!("{:#?}", e), ErrorCode::InternalError)),
            }
        })
        .await
    }

    /// Releases a claim after a failed attempt so the next notification
    /// covering the same range can retry the message.
    pub async fn unclaim(&self, message_id: &str) -> RustTicketResult<()> {
        let message_id = message_id.to_string();
        delete_impl::<MessageClaim>(&self.db, move |rw| {
            rw.get()
                .primary(message_id)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))
        })
        .await
    }

    pub async fn is_processed(&self, message_id: &str) -> RustTicketResult<bool> {
        let registry: Option<ProcessedRegistry> =
            async_find_impl(&self.db, SINGLETON_KEY).await?;
        Ok(registry
            .map(|r| r.message_ids.iter().any(|id| id == message_id))
            .unwrap_or(false))
    }

    /// Appends `message_id` to the processed registry, evicting the oldest
    /// entries beyond the cap. The claim row is deliberately left in place.
    pub async fn mark_processed(&self, message_id: &str) -> RustTicketResult<()> {
        let message_id = message_id.to_string();
        with_rw_impl(&self.db, move |rw| {
            let mut registry: ProcessedRegistry = rw
                .get()
                .primary(SINGLETON_KEY)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?
                .unwrap_or(ProcessedRegistry {
                    key: SINGLETON_KEY,
                    message_ids: Vec::new(),
                });
            registry.message_ids.push(message_id);
            if registry.message_ids.len() > MAX_STORED_IDS {
                let excess = registry.message_ids.len() - MAX_STORED_IDS;
                registry.message_ids.drain(..excess);
            }
            rw.upsert(registry)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            Ok(())
        })
        .await
    }

    /// Returns 0 when no watermark has been persisted yet.
    pub async fn watermark(&self) -> RustTicketResult<u64> {
        let watermark: Option<SyncWatermark> = async_find_impl(&self.db, SINGLETON_KEY).await?;
        Ok(watermark.map(|w| w.history_id).unwrap_or(0))
    }

    /// Advances the watermark. Never moves it backwards.
    pub async fn set_watermark(&self, history_id: u64) -> RustTicketResult<()> {
        with_rw_impl(&self.db, move |rw| {
            let current: Option<SyncWatermark> = rw
                .get()
                .primary(SINGLETON_KEY)
                .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            if current.map(|w| w.history_id >= history_id).unwrap_or(false) {
                return Ok(());
            }
            rw.upsert(SyncWatermark {
                key: SINGLETON_KEY,
                history_id,
                updated_at: utc_now!(),
            })
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
            Ok(())
        })
        .await
    }

    pub async fn watch(&self) -> RustTicketResult<Option<WatchState>> {
        async_find_impl(&self.db, SINGLETON_KEY).await
    }

    pub async fn set_watch(&self, history_id: u64, expiration: i64) -> RustTicketResult<()> {
        upsert_impl(
            &self.db,
            WatchState {
                key: SINGLETON_KEY,
                history_id,
                expiration,
            },
        )
        .await
    }
}
