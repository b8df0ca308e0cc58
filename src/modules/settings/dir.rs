// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use crate::modules::settings::cli::SETTINGS;
use crate::{
    modules::error::{code::ErrorCode, RustTicketResult},
    raise_error,
};
use std::path::PathBuf;
use std::sync::LazyLock;

pub const META_FILE: &str = "meta.db";
const LOG_DIR: &str = "logs";

pub static DATA_DIR_MANAGER: LazyLock<DataDirManager> =
    LazyLock::new(|| DataDirManager::new(PathBuf::from(&SETTINGS.rustticket_root_dir)));

#[derive(Debug)]
pub struct DataDirManager {
    pub root_dir: PathBuf,
    pub meta_db: PathBuf,
    pub log_dir: PathBuf,
}

impl DataDirManager {
    pub fn new(root_dir: PathBuf) -> Self {
        Self {
            meta_db: root_dir.join(META_FILE),
            log_dir: root_dir.join(LOG_DIR),
            root_dir,
        }
    }

    pub fn initialize() -> RustTicketResult<()> {
        std::fs::create_dir_all(&DATA_DIR_MANAGER.root_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        std::fs::create_dir_all(&DATA_DIR_MANAGER.log_dir)
            .map_err(|e| raise_error!(format!("{:#?}", e), ErrorCode::InternalError))?;
        Ok(())
    }
}
