use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use log::{debug, error, info};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-image";
const API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

pub const PROMPT_SUGGESTIONS: [&str; 4] = [
    "a friendly bear who finds a magic hat",
    "a little robot who wants to be a baker",
    "a curious bunny exploring a sparkling cave",
    "a mermaid who makes friends with a starfish",
];

#[derive(Debug, thiserror::Error)]
pub enum GenerationFailure {
    #[error("request to the model failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model answered HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to generate complete story and image")]
    Incomplete,
}

#[derive(Debug, thiserror::Error)]
pub enum StoryError {
    #[error("API Key is missing. Please configure your environment.")]
    MissingApiKey,
    #[error("Could not create the story. The magic spell might have failed!")]
    Generation(#[source] GenerationFailure),
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inline_data: Option<InlineData>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct InlineData {
    pub mime_type: String,
    pub data: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_modalities: Vec<String>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug, Default)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoryResult {
    pub story: String,
    /// `data:<mime>;base64,<payload>`
    pub image_url: String,
}

impl StoryResult {
    pub fn image_bytes(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let payload = self
            .image_url
            .split_once(";base64,")
            .map(|(_, payload)| payload)
            .unwrap_or_default();
        STANDARD.decode(payload)
    }
}

/// One call to a text-and-image generation model.
#[async_trait]
pub trait ImageModel: Send + Sync {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationFailure>;
}

pub struct GeminiClient {
    client: reqwest::Client,
    model: String,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, model: String) -> Self {
        Self { client, model }
    }
}

#[async_trait]
impl ImageModel for GeminiClient {
    async fn generate_content(
        &self,
        api_key: &str,
        request: &GenerateContentRequest,
    ) -> Result<GenerateContentResponse, GenerationFailure> {
        let response = self
            .client
            .post(format!("{}/{}:generateContent", API_BASE, self.model))
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationFailure::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(response.json::<GenerateContentResponse>().await?)
    }
}

pub fn story_request(prompt: &str) -> GenerateContentRequest {
    let text = format!(
        "Create a short, happy, and simple story for a 5-year-old child about {}. \
         The story should be no more than 150 words. \
         Also, create a single, colorful and cute illustration for this story in a whimsical, friendly cartoon style.",
        prompt.trim()
    );

    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![Part {
                text: Some(text),
                inline_data: None,
            }],
        }],
        generation_config: GenerationConfig {
            response_modalities: vec!["TEXT".to_string(), "IMAGE".to_string()],
        },
    }
}

/// Joins every text part of the first candidate and keeps its first image.
pub fn collect_story(response: GenerateContentResponse) -> Result<StoryResult, GenerationFailure> {
    let parts = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts)
        .unwrap_or_default();

    let mut story = String::new();
    let mut image_url = None;
    for part in parts {
        if let Some(text) = part.text {
            story.push_str(&text);
        } else if let Some(image) = part.inline_data {
            if image_url.is_none() {
                image_url = Some(format!("data:{};base64,{}", image.mime_type, image.data));
            }
        }
    }

    match image_url {
        Some(image_url) if !story.trim().is_empty() => Ok(StoryResult { story, image_url }),
        _ => Err(GenerationFailure::Incomplete),
    }
}

pub struct StoryMaker<M> {
    model: M,
    api_key: Option<String>,
}

impl<M: ImageModel> StoryMaker<M> {
    pub fn new(model: M, api_key: Option<String>) -> Self {
        Self { model, api_key }
    }

    pub async fn generate(&self, prompt: &str) -> Result<StoryResult, StoryError> {
        let api_key = self
            .api_key
            .as_deref()
            .filter(|key| !key.is_empty())
            .ok_or(StoryError::MissingApiKey)?;

        info!("Generating story about {:?}", prompt);
        let request = story_request(prompt);

        let result = self
            .model
            .generate_content(api_key, &request)
            .await
            .and_then(collect_story);

        match result {
            Ok(story) => {
                debug!("Story has {} characters", story.story.len());
                Ok(story)
            }
            Err(err) => {
                error!("Error generating story with Gemini: {}", err);
                Err(StoryError::Generation(err))
            }
        }
    }
}
