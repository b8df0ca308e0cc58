// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum ErrorCode {
    // Client-side errors (10000–10999)
    MissingConfiguration = 10020,

    // Network connection errors (40000–40999)
    NetworkError = 40000,

    // Mail service errors (50000–50999)
    GmailApiCallFailed = 50070,
    GmailApiInvalidHistoryId = 50080,

    // Issue tracker errors (51000–51999)
    JiraApiCallFailed = 51000,

    // Internal system errors (70000–70999)
    InternalError = 70000,
}
