// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use code::ErrorCode;
use snafu::{Location, Snafu};

pub mod code;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RustTicketError {
    #[snafu(display("{message}"))]
    Generic {
        message: String,
        #[snafu(implicit)]
        location: Location,
        code: ErrorCode,
    },
}

impl RustTicketError {
    pub fn code(&self) -> ErrorCode {
        match self {
            RustTicketError::Generic { code, .. } => *code,
        }
    }
}

pub type RustTicketResult<T, E = RustTicketError> = std::result::Result<T, E>;
