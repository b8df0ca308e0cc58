// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

pub mod classify;
pub mod common;
pub mod database;
pub mod document;
pub mod error;
pub mod gmail;
pub mod jira;
pub mod logger;
pub mod processor;
pub mod render;
pub mod rest;
pub mod settings;
pub mod state;
pub mod sync;
pub mod utils;
