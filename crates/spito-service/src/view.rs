use jiff::Timestamp;
use serde::Serialize;
use spito_core::{ImageFormat, Spit, SpitKind};

/// Presentation of a spit for JSON consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpitView {
    pub id: String,
    pub url: String,
    pub spit_type: SpitKind,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_fmt: Option<ImageFormat>,
    pub exp: u64,
    pub date_created: Timestamp,
    pub created: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_expiration: Option<Timestamp>,
    /// Whole seconds left, absent for spits that never expire.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remaining_secs: Option<i64>,
    pub is_url: bool,
    pub clicks: u64,
}

impl SpitView {
    pub fn new(spit: &Spit, base_url: &str, now: Timestamp) -> Self {
        Self {
            id: spit.id().to_string(),
            url: spit.absolute_url(base_url),
            spit_type: spit.kind(),
            content: spit.content().to_string(),
            image_fmt: spit.image_format(),
            exp: spit.exp(),
            date_created: spit.date_created(),
            created: spit.formatted_created_time(),
            date_expiration: spit.date_expiration(),
            remaining_secs: spit.remaining_ttl(now).map(|ttl| ttl.as_secs()),
            is_url: spit.is_url(),
            clicks: spit.clicks(),
        }
    }
}
