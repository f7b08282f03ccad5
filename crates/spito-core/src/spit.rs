use crate::error::{Result, SpitError};
use crate::id::{MintedId, RawId, SpitId};
use crate::validation::{
    check_content, check_image_format, parse_absolute_url, validate, RawSpitFields,
    ValidationErrors, FIELD_CONTENT, FIELD_IMAGE, FIELD_SPIT_TYPE,
};
use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// The kind of content a spit holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpitKind {
    #[serde(rename = "text")]
    Text,
    #[serde(rename = "url")]
    Url,
    #[serde(rename = "img")]
    Image,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown spit type: {0}")]
pub struct UnknownKind(String);

impl SpitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpitKind::Text => "text",
            SpitKind::Url => "url",
            SpitKind::Image => "img",
        }
    }
}

impl FromStr for SpitKind {
    type Err = UnknownKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "text" => Ok(SpitKind::Text),
            "url" => Ok(SpitKind::Url),
            "img" | "image" => Ok(SpitKind::Image),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

impl Display for SpitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

impl FromStr for ImageFormat {
    type Err = UnknownKind;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ImageFormat::Png),
            "jpeg" | "jpg" => Ok(ImageFormat::Jpeg),
            "gif" => Ok(ImageFormat::Gif),
            other => Err(UnknownKind(other.to_string())),
        }
    }
}

/// What a spit carries, tagged by its `spit_type`.
///
/// Image spits point at an already uploaded blob; `content` is its location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "spit_type")]
pub enum SpitPayload {
    #[serde(rename = "text")]
    Text { content: String },
    #[serde(rename = "url")]
    Url { content: String },
    #[serde(rename = "img")]
    Image {
        content: String,
        image_fmt: ImageFormat,
    },
}

impl SpitPayload {
    pub fn kind(&self) -> SpitKind {
        match self {
            SpitPayload::Text { .. } => SpitKind::Text,
            SpitPayload::Url { .. } => SpitKind::Url,
            SpitPayload::Image { .. } => SpitKind::Image,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            SpitPayload::Text { content }
            | SpitPayload::Url { content }
            | SpitPayload::Image { content, .. } => content,
        }
    }
}

fn field_error(field: &'static str, message: impl Into<String>) -> SpitError {
    let mut errors = ValidationErrors::new();
    errors.insert(field, message);
    SpitError::Validation(errors)
}

/// A validated spit that has not been saved yet and therefore has no ID.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpitDraft {
    payload: SpitPayload,
    exp: i64,
}

impl SpitDraft {
    /// Validates a text or url spit. `exp` is the time-to-live in seconds.
    pub fn new(content: &str, exp: i64, kind: SpitKind) -> Result<Self> {
        if let Some((field, message)) = check_content(kind, content) {
            return Err(field_error(field, message));
        }

        let content = content.trim().to_string();
        let payload = match kind {
            SpitKind::Text => SpitPayload::Text { content },
            SpitKind::Url => SpitPayload::Url { content },
            SpitKind::Image => {
                return Err(field_error(FIELD_IMAGE, "Cannot find the image format"));
            }
        };

        Ok(Self { payload, exp })
    }

    /// An image spit pointing at a blob uploaded to `location`.
    pub fn image(location: &str, format: ImageFormat, exp: i64) -> Result<Self> {
        let location = location.trim();
        if location.is_empty() {
            return Err(field_error(FIELD_CONTENT, "Cannot find the uploaded image"));
        }

        Ok(Self {
            payload: SpitPayload::Image {
                content: location.to_string(),
                image_fmt: format,
            },
            exp,
        })
    }

    /// Validates a raw submission and builds the draft it describes.
    pub fn from_fields(fields: &RawSpitFields) -> Result<Self> {
        validate(fields).into_result()?;

        let exp = fields
            .exp
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .parse::<i64>()
            .unwrap_or_default();
        let kind = fields
            .spit_type
            .as_deref()
            .unwrap_or_default()
            .parse::<SpitKind>()
            .map_err(|_| field_error(FIELD_SPIT_TYPE, "Wrong spit type specified"))?;
        let content = fields.content.as_deref().unwrap_or_default();

        match kind {
            SpitKind::Image => {
                let format = check_image_format(fields.image_fmt.as_deref())
                    .map_err(|message| field_error(FIELD_IMAGE, message))?;
                Self::image(content, format, exp)
            }
            kind => Self::new(content, exp, kind),
        }
    }

    pub fn kind(&self) -> SpitKind {
        self.payload.kind()
    }

    pub fn content(&self) -> &str {
        self.payload.content()
    }

    pub fn exp(&self) -> i64 {
        self.exp
    }

    pub fn payload(&self) -> &SpitPayload {
        &self.payload
    }

    /// Turns the draft into a saved record under a freshly minted ID.
    ///
    /// A non-positive `exp` means the spit never expires.
    pub fn into_spit(self, minted: MintedId, now: Timestamp) -> Spit {
        let exp = self.exp.max(0) as u64;
        let date_expiration = if exp > 0 {
            now.checked_add(SignedDuration::from_secs(self.exp)).ok()
        } else {
            None
        };
        let is_url = match &self.payload {
            SpitPayload::Image { .. } => false,
            payload => parse_absolute_url(payload.content()).is_some(),
        };

        Spit {
            id: minted.id,
            id_raw: minted.raw,
            exp,
            payload: self.payload,
            date_created: now,
            date_expiration,
            is_url,
            clicks: 0,
        }
    }
}

/// A saved spit, as persisted in the store.
///
/// The click counter is kept under its own key and is not part of the
/// serialized document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spit {
    id: SpitId,
    id_raw: RawId,
    exp: u64,
    #[serde(flatten)]
    payload: SpitPayload,
    date_created: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date_expiration: Option<Timestamp>,
    is_url: bool,
    #[serde(skip)]
    clicks: u64,
}

impl Spit {
    pub fn id(&self) -> &SpitId {
        &self.id
    }

    pub fn id_raw(&self) -> &RawId {
        &self.id_raw
    }

    /// Requested time-to-live in seconds, `0` for none.
    pub fn exp(&self) -> u64 {
        self.exp
    }

    pub fn kind(&self) -> SpitKind {
        self.payload.kind()
    }

    pub fn content(&self) -> &str {
        self.payload.content()
    }

    pub fn payload(&self) -> &SpitPayload {
        &self.payload
    }

    pub fn image_format(&self) -> Option<ImageFormat> {
        match self.payload {
            SpitPayload::Image { image_fmt, .. } => Some(image_fmt),
            _ => None,
        }
    }

    pub fn date_created(&self) -> Timestamp {
        self.date_created
    }

    pub fn date_expiration(&self) -> Option<Timestamp> {
        self.date_expiration
    }

    pub fn is_url(&self) -> bool {
        self.is_url
    }

    pub fn clicks(&self) -> u64 {
        self.clicks
    }

    pub fn with_clicks(mut self, clicks: u64) -> Self {
        self.clicks = clicks;
        self
    }

    pub fn absolute_url(&self, base_url: &str) -> String {
        self.id.to_url(base_url)
    }

    /// Creation date laid out like `January 02, 2006 | Monday`.
    pub fn formatted_created_time(&self) -> String {
        self.date_created.strftime("%B %d, %Y | %A").to_string()
    }

    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.exp > 0
            && self
                .date_expiration
                .is_some_and(|expire_at| now >= expire_at)
    }

    /// Time left before expiry, `None` if the spit never expires.
    pub fn remaining_ttl(&self, now: Timestamp) -> Option<SignedDuration> {
        if self.exp == 0 {
            return None;
        }
        self.date_expiration
            .map(|expire_at| now.duration_until(expire_at).max(SignedDuration::ZERO))
    }

    /// Where a public view of this spit should redirect to, if anywhere.
    pub fn redirect_target(&self) -> Option<&str> {
        match self.payload {
            SpitPayload::Image { .. } => None,
            _ if self.is_url => Some(self.content()),
            _ => None,
        }
    }
}
