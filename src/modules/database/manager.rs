// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::database::META_MODELS;
use crate::modules::error::{code::ErrorCode, RustTicketResult};
use crate::raise_error;
use native_db::{Builder, Database};
use std::path::Path;
use std::sync::Arc;

/// Opens the embedded metadata database.
///
/// The manager is constructed once at process startup and the resulting
/// handle is injected into the components that need it, so tests can swap
/// in an in-memory database instead.
pub struct DatabaseManager;

impl DatabaseManager {
    pub fn open(path: &Path) -> RustTicketResult<Arc<Database<'static>>> {
        let mut database = Builder::new()
            .create(&META_MODELS, path)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        database
            .compact()
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(Arc::new(database))
    }

    pub fn open_in_memory() -> RustTicketResult<Arc<Database<'static>>> {
        let database = Builder::new()
            .create_in_memory(&META_MODELS)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(Arc::new(database))
    }
}
