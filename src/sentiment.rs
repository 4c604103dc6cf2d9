//! Review sentiment via a hosted text-classification model.
//!
//! The model answers `[[{"label": "LABEL_2", "score": 0.98}, ...]]`. Any
//! failure on the way (transport, auth, timeout, unexpected body) degrades to
//! [`Sentiment::Unknown`] so review writes never fail because of it.

use reqwest::Client;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::{debug, warn};

use crate::config::SentimentConfig;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(
    enum_name = "sentiment_enum",
    db_type = "String(StringLen::N(16))",
    rs_type = "String"
)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    #[sea_orm(string_value = "positive")]
    Positive,
    #[sea_orm(string_value = "neutral")]
    Neutral,
    #[sea_orm(string_value = "negative")]
    Negative,
    #[sea_orm(string_value = "unknown")]
    Unknown,
}

impl Sentiment {
    pub fn from_label(label: &str) -> Self {
        match label {
            "LABEL_0" => Sentiment::Negative,
            "LABEL_1" => Sentiment::Neutral,
            "LABEL_2" => Sentiment::Positive,
            _ => Sentiment::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "positive",
            Sentiment::Neutral => "neutral",
            Sentiment::Negative => "negative",
            Sentiment::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

#[derive(Clone, Debug)]
pub struct SentimentClient {
    http: Client,
    api_url: String,
    api_token: Option<String>,
}

impl SentimentClient {
    pub fn new(config: &SentimentConfig) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            api_token: config.api_token.clone(),
        })
    }

    pub async fn analyze(&self, text: &str) -> Sentiment {
        match self.request(text).await {
            Ok(body) => {
                let sentiment = classify(&body);
                debug!(%sentiment, "Sentiment analysed");
                sentiment
            }
            Err(err) => {
                warn!(error = %err, timeout = err.is_timeout(), "Sentiment analysis error");
                Sentiment::Unknown
            }
        }
    }

    async fn request(&self, text: &str) -> Result<Value, reqwest::Error> {
        let mut request = self.http.post(&self.api_url).json(&json!({ "inputs": text }));
        if let Some(token) = &self.api_token {
            request = request.bearer_auth(token);
        }

        request.send().await?.error_for_status()?.json().await
    }
}

/// Picks the highest scoring label of the first prediction group.
pub fn classify(body: &Value) -> Sentiment {
    let Some(predictions) = body.get(0).and_then(Value::as_array) else {
        warn!(%body, "Unexpected sentiment response format");
        return Sentiment::Unknown;
    };

    predictions
        .iter()
        .filter_map(|prediction| LabelScore::deserialize(prediction).ok())
        .reduce(|best, next| if next.score > best.score { next } else { best })
        .map(|top| Sentiment::from_label(&top.label))
        .unwrap_or(Sentiment::Unknown)
}
