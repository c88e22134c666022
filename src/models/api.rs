use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generation::{Generation, GenerationId, GenerationStatus, ImageSource, Variant};

/// JSON body of a submit call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitRequest {
    pub variant: Variant,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

impl SubmitRequest {
    pub fn new(image: &ImageSource, variant: Variant) -> Self {
        match image {
            ImageSource::Bytes {
                data,
                file_name,
                content_type,
            } => SubmitRequest {
                variant,
                image_base64: Some(STANDARD.encode(data)),
                image_url: None,
                file_name: file_name.clone(),
                content_type: content_type.clone(),
            },
            ImageSource::Uri(uri) => SubmitRequest {
                variant,
                image_base64: None,
                image_url: Some(uri.clone()),
                file_name: None,
                content_type: None,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    #[serde(alias = "job_id", alias = "id", default)]
    pub job_id: Option<GenerationId>,
    #[serde(default = "default_submit_status")]
    pub status: GenerationStatus,
    #[serde(alias = "original_image_url", default)]
    pub original_image_url: Option<String>,
    #[serde(alias = "created_at", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(alias = "credits_used", default)]
    pub credits_used: Option<u32>,
}

fn default_submit_status() -> GenerationStatus {
    GenerationStatus::Pending
}

impl SubmitResponse {
    pub fn accepted(job_id: impl Into<GenerationId>) -> Self {
        SubmitResponse {
            job_id: Some(job_id.into()),
            status: GenerationStatus::Pending,
            original_image_url: None,
            created_at: None,
            credits_used: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PollResponse {
    pub status: GenerationStatus,
    #[serde(alias = "cartoon_image_url", default)]
    pub cartoon_image_url: Option<String>,
    #[serde(alias = "error_message", alias = "error", default)]
    pub error_message: Option<String>,
}

impl PollResponse {
    pub fn with_status(status: GenerationStatus) -> Self {
        PollResponse {
            status,
            cartoon_image_url: None,
            error_message: None,
        }
    }

    pub fn complete(cartoon_image_url: impl Into<String>) -> Self {
        PollResponse {
            status: GenerationStatus::Complete,
            cartoon_image_url: Some(cartoon_image_url.into()),
            error_message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        PollResponse {
            status: GenerationStatus::Failed,
            cartoon_image_url: None,
            error_message: Some(message.into()),
        }
    }
}

/// History comes back either as a bare array or wrapped in an object.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HistoryResponse {
    List(Vec<Generation>),
    Wrapped { generations: Vec<Generation> },
}

impl HistoryResponse {
    pub fn into_generations(self) -> Vec<Generation> {
        match self {
            HistoryResponse::List(generations) => generations,
            HistoryResponse::Wrapped { generations } => generations,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submit_request_encodes_bytes() {
        let image = ImageSource::from_bytes(b"jpeg".to_vec())
            .with_file_name("me.jpg")
            .with_content_type("image/jpeg");
        let body = serde_json::to_value(SubmitRequest::new(&image, Variant::Ghiblix)).unwrap();

        assert_eq!(body["variant"], json!("ghiblix"));
        assert_eq!(body["imageBase64"], json!("anBlZw=="));
        assert_eq!(body["fileName"], json!("me.jpg"));
        assert!(body.get("imageUrl").is_none());
    }

    #[test]
    fn test_submit_request_forwards_uri() {
        let image = ImageSource::from_uri("https://cdn/me.jpg");
        let body = serde_json::to_value(SubmitRequest::new(&image, Variant::Comic)).unwrap();

        assert_eq!(body["imageUrl"], json!("https://cdn/me.jpg"));
        assert!(body.get("imageBase64").is_none());
    }

    #[test]
    fn test_submit_response_aliases() {
        let response: SubmitResponse =
            serde_json::from_value(json!({ "job_id": 99, "status": "pending" })).unwrap();
        assert_eq!(response.job_id, Some(GenerationId::from(99u64)));

        let bare: SubmitResponse = serde_json::from_value(json!({ "id": "x1" })).unwrap();
        assert_eq!(bare.status, GenerationStatus::Pending);

        let missing: SubmitResponse = serde_json::from_value(json!({ "status": "pending" })).unwrap();
        assert!(missing.job_id.is_none());
    }

    #[test]
    fn test_history_accepts_both_shapes() {
        let item = json!({
            "id": "a",
            "originalImageUrl": "https://cdn/a.jpg",
            "status": "failed",
            "createdAt": "2024-01-01T00:00:00Z"
        });
        let bare: HistoryResponse = serde_json::from_value(json!([item.clone()])).unwrap();
        let wrapped: HistoryResponse =
            serde_json::from_value(json!({ "generations": [item] })).unwrap();

        assert_eq!(bare.into_generations().len(), 1);
        assert_eq!(wrapped.into_generations()[0].status, GenerationStatus::Failed);
    }
}
