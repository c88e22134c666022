use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, ToonifyError};

/// Opaque job identifier issued by the generation service.
///
/// The service is not consistent about the JSON type of ids, so both
/// strings and numbers are accepted and normalised to a string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GenerationId(String);

impl GenerationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GenerationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for GenerationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for GenerationId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl<'de> Deserialize<'de> for GenerationId {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => GenerationId(s),
            RawId::Unsigned(n) => GenerationId(n.to_string()),
            RawId::Signed(n) => GenerationId(n.to_string()),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Pending,
    Processing,
    Complete,
    Failed,
    NotFound,
}

impl GenerationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            GenerationStatus::Complete | GenerationStatus::Failed | GenerationStatus::NotFound
        )
    }

    /// Forward-only lifecycle: `pending -> processing`, and any non-terminal
    /// status to a terminal one. Staying on the same non-terminal status is
    /// allowed so repeated polls are harmless.
    pub fn can_transition_to(&self, next: GenerationStatus) -> bool {
        use GenerationStatus::*;
        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (Pending, Pending | Processing) => true,
            (Processing, Processing) => true,
            (Processing, Pending) => false,
            (_, to) => to.is_terminal(),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationStatus::Pending => "pending",
            GenerationStatus::Processing => "processing",
            GenerationStatus::Complete => "complete",
            GenerationStatus::Failed => "failed",
            GenerationStatus::NotFound => "not_found",
        }
    }
}

impl fmt::Display for GenerationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output style requested for a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Ghiblix,
    Anime,
    Comic,
    Pixar,
    Sketch,
}

impl Variant {
    pub fn all() -> &'static [Variant] {
        &[
            Variant::Ghiblix,
            Variant::Anime,
            Variant::Comic,
            Variant::Pixar,
            Variant::Sketch,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Ghiblix => "ghiblix",
            Variant::Anime => "anime",
            Variant::Comic => "comic",
            Variant::Pixar => "pixar",
            Variant::Sketch => "sketch",
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Ghiblix
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = ToonifyError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        Variant::all()
            .iter()
            .copied()
            .find(|variant| variant.as_str() == wanted)
            .ok_or_else(|| ToonifyError::InvalidInputError(format!("Unknown variant: {}", s)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Generation {
    pub id: GenerationId,
    #[serde(alias = "original_image_url", default)]
    pub original_image_url: String,
    #[serde(alias = "cartoon_image_url", default)]
    pub cartoon_image_url: Option<String>,
    pub status: GenerationStatus,
    #[serde(alias = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(alias = "credits_used", default, skip_serializing_if = "Option::is_none")]
    pub credits_used: Option<u32>,
}

impl Generation {
    pub fn pending(
        id: GenerationId,
        original_image_url: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            original_image_url: original_image_url.into(),
            cartoon_image_url: None,
            status: GenerationStatus::Pending,
            created_at,
            credits_used: None,
        }
    }

    pub fn with_credits_used(mut self, credits: Option<u32>) -> Self {
        self.credits_used = credits;
        self
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// A result URL is present exactly when the status is `complete`.
    pub fn check_result_invariant(&self) -> Result<()> {
        check_result_url(&self.id, self.status, self.cartoon_image_url.as_deref())
    }
}

pub(crate) fn check_result_url(
    id: &GenerationId,
    status: GenerationStatus,
    cartoon_image_url: Option<&str>,
) -> Result<()> {
    match (status, cartoon_image_url) {
        (GenerationStatus::Complete, Some(url)) if !url.trim().is_empty() => Ok(()),
        (GenerationStatus::Complete, _) => Err(ToonifyError::InvalidTransitionError(format!(
            "{} is complete without a cartoon image url",
            id
        ))),
        (_, Some(_)) => Err(ToonifyError::InvalidTransitionError(format!(
            "{} has a cartoon image url while {}",
            id, status
        ))),
        (_, None) => Ok(()),
    }
}

/// The photo handed to the submitter.
#[derive(Clone, PartialEq)]
pub enum ImageSource {
    Bytes {
        data: Vec<u8>,
        file_name: Option<String>,
        content_type: Option<String>,
    },
    /// Content reference such as a local file URI or an already uploaded URL.
    Uri(String),
}

impl ImageSource {
    pub fn from_bytes(data: impl Into<Vec<u8>>) -> Self {
        ImageSource::Bytes {
            data: data.into(),
            file_name: None,
            content_type: None,
        }
    }

    pub fn from_uri(uri: impl Into<String>) -> Self {
        ImageSource::Uri(uri.into())
    }

    pub fn with_file_name(self, name: impl Into<String>) -> Self {
        match self {
            ImageSource::Bytes {
                data, content_type, ..
            } => ImageSource::Bytes {
                data,
                file_name: Some(name.into()),
                content_type,
            },
            other => other,
        }
    }

    pub fn with_content_type(self, mime: impl Into<String>) -> Self {
        match self {
            ImageSource::Bytes {
                data, file_name, ..
            } => ImageSource::Bytes {
                data,
                file_name,
                content_type: Some(mime.into()),
            },
            other => other,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            ImageSource::Bytes { data, .. } => data.is_empty(),
            ImageSource::Uri(uri) => uri.trim().is_empty(),
        }
    }

    /// What the store shows as the original image until the service
    /// reports the uploaded URL.
    pub fn local_reference(&self) -> String {
        match self {
            ImageSource::Bytes {
                file_name: Some(name),
                ..
            } => format!("local://{}", name),
            ImageSource::Bytes { .. } => "local://upload".to_string(),
            ImageSource::Uri(uri) => uri.clone(),
        }
    }
}

impl fmt::Debug for ImageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageSource::Bytes {
                data,
                file_name,
                content_type,
            } => f
                .debug_struct("Bytes")
                .field("len", &data.len())
                .field("file_name", file_name)
                .field("content_type", content_type)
                .finish(),
            ImageSource::Uri(uri) => f.debug_tuple("Uri").field(uri).finish(),
        }
    }
}

/// Opaque bearer credential supplied by the session layer.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

/// Returns the token if it is present and non-blank.
pub fn require_token(token: Option<&AuthToken>) -> Result<&AuthToken> {
    match token {
        Some(token) if !token.is_blank() => Ok(token),
        Some(_) => Err(ToonifyError::AuthError("Auth token is empty".into())),
        None => Err(ToonifyError::AuthError("No auth token available".into())),
    }
}
