use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::common::errors::Error;

pub const SENTIMENT_API_URL_DEFAULT: &str =
    "https://api-inference.huggingface.co/models/distilbert-base-uncased-finetuned-sst-2-english";

/// One label/score pair as the inference API returns it. The full response is
/// a nested list, one inner list per input, ordered by descending score.
#[derive(Debug, Clone, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct SentimentClient {
    http: reqwest::Client,
    api_url: String,
    api_token: String,
}

impl SentimentClient {
    pub fn new(api_url: String, api_token: String) -> Self {
        SentimentClient {
            http: reqwest::Client::new(),
            api_url,
            api_token,
        }
    }

    pub async fn classify(&self, text: &str) -> Result<Prediction, Error> {
        info!("Classifying feedback text");
        let predictions: Vec<Vec<Prediction>> = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&json!({ "inputs": text }))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        first_prediction(predictions)
    }
}

pub fn first_prediction(predictions: Vec<Vec<Prediction>>) -> Result<Prediction, Error> {
    predictions
        .into_iter()
        .next()
        .and_then(|inner| inner.into_iter().next())
        .ok_or(Error::EmptyClassification)
}
