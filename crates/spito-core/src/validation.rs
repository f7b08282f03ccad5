use crate::spit::{ImageFormat, SpitKind};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Display;
use url::Url;

/// Maximum number of characters of a text or url spit.
pub const MAX_CONTENT_CHARS: usize = 10_000;

pub const FIELD_EXP: &str = "Exp";
pub const FIELD_SPIT_TYPE: &str = "SpitType";
pub const FIELD_CONTENT: &str = "Content";
pub const FIELD_IMAGE: &str = "Image";

/// The raw, unparsed fields of a spit submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSpitFields {
    pub exp: Option<String>,
    pub spit_type: Option<String>,
    pub content: Option<String>,
    pub image_fmt: Option<String>,
}

impl RawSpitFields {
    /// Picks the `exp`, `spit_type`, `content` and `image_fmt` entries of a form.
    pub fn from_map(values: &HashMap<String, String>) -> Self {
        Self {
            exp: values.get("exp").cloned(),
            spit_type: values.get("spit_type").cloned(),
            content: values.get("content").cloned(),
            image_fmt: values.get("image_fmt").cloned(),
        }
    }
}

/// Field name to human-readable message. Empty means the input is valid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<&'static str, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.insert(field, message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.0.iter().map(|(field, message)| (*field, message.as_str()))
    }

    /// Turns an empty error map into `Ok(())`.
    pub fn into_result(self) -> Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, message) in self.iter() {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Checks a raw submission without touching any store.
pub fn validate(fields: &RawSpitFields) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    match fields.exp.as_deref().map(str::trim) {
        None | Some("") => errors.insert(FIELD_EXP, "Cannot find expiration time"),
        Some(exp) => match exp.parse::<i64>() {
            Err(_) => errors.insert(FIELD_EXP, "Invalid expiration time posted"),
            Ok(exp) if exp < 0 => {
                errors.insert(FIELD_EXP, "Negative expiration time not allowed")
            }
            Ok(_) => {}
        },
    }

    let spit_type = fields.spit_type.as_deref().map(str::trim).unwrap_or("");
    let kind = if spit_type.is_empty() {
        errors.insert(FIELD_SPIT_TYPE, "Empty spit type is not allowed");
        None
    } else {
        match spit_type.parse::<SpitKind>() {
            Ok(kind) => Some(kind),
            Err(_) => {
                errors.insert(FIELD_SPIT_TYPE, "Wrong spit type specified");
                None
            }
        }
    };

    let content = fields.content.as_deref().unwrap_or("");
    match kind {
        Some(kind @ (SpitKind::Text | SpitKind::Url)) => {
            if let Some((field, message)) = check_content(kind, content) {
                errors.insert(field, message);
            }
        }
        Some(SpitKind::Image) => {
            if let Err(message) = check_image_format(fields.image_fmt.as_deref()) {
                errors.insert(FIELD_IMAGE, message);
            }
            if content.trim().is_empty() {
                errors.insert(FIELD_CONTENT, "Cannot find the uploaded image");
            }
        }
        None => {}
    }

    errors
}

/// Content rules shared by form validation and programmatic construction.
pub(crate) fn check_content(kind: SpitKind, content: &str) -> Option<(&'static str, String)> {
    let content = content.trim();
    if content.is_empty() {
        return Some((FIELD_CONTENT, "Empty spit is not allowed".to_string()));
    }
    if content.chars().count() > MAX_CONTENT_CHARS {
        return Some((
            FIELD_CONTENT,
            format!("Spit content should be at most {MAX_CONTENT_CHARS} characters"),
        ));
    }
    if kind == SpitKind::Url && parse_absolute_url(content).is_none() {
        return Some((
            FIELD_CONTENT,
            "Spit content is not a valid absolute url".to_string(),
        ));
    }
    None
}

pub(crate) fn check_image_format(format: Option<&str>) -> Result<ImageFormat, &'static str> {
    match format.map(str::trim) {
        None | Some("") => Err("Cannot find the image format"),
        Some(format) => format.parse().map_err(|_| "Unsupported image format"),
    }
}

/// Parses `s` as an absolute URL with a host. Syntax only, nothing is fetched.
pub fn parse_absolute_url(s: &str) -> Option<Url> {
    Url::parse(s.trim()).ok().filter(Url::has_host)
}
