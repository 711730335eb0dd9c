pub mod admin;
pub mod delivery;
pub mod headers;
pub mod public;

pub use public::{
    CaptchaResponse, EventSummary, VerifyRequest, VerifyResponse, __path_download_certificate,
    __path_get_event, __path_issue_captcha, __path_list_archive, __path_list_events,
    __path_preview_certificate, __path_verify_email,
};
