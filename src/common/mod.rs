pub mod errors;
pub mod sentiment;
pub mod utils;

use aws_sdk_dynamodb::types::AttributeValue;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::common::errors::Error;
use crate::common::sentiment::Prediction;

pub const TABLE_NAME_DEFAULT: &str = "Customer_Feedback";

pub const FEEDBACK_TEXTS: [&str; 9] = [
    "Great service!",
    "Could be better.",
    "Very disappointed.",
    "Amazing experience!",
    "Not what I expected.",
    "I love this product!",
    "Terrible customer service.",
    "Highly recommended!",
    "Waste of money.",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeedbackSource {
    App,
    Web,
    Email,
}

impl FeedbackSource {
    pub const ALL: [FeedbackSource; 3] = [Self::App, Self::Web, Self::Email];

    pub fn pick(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::App => "App",
            Self::Web => "Web",
            Self::Email => "Email",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "App" => Some(Self::App),
            "Web" => Some(Self::Web),
            "Email" => Some(Self::Email),
            _ => None,
        }
    }
}

pub fn pick_feedback_text(rng: &mut impl Rng) -> &'static str {
    FEEDBACK_TEXTS[rng.gen_range(0..FEEDBACK_TEXTS.len())]
}

/// One stored feedback item. All six attributes are always present; the id is
/// only second-resolution, so concurrent writes within the same second
/// overwrite each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub feedback_id: String,
    pub timestamp: String,
    pub source: FeedbackSource,
    pub sentiment: String,
    #[serde(rename = "sentimentScore")]
    pub sentiment_score: String,
    #[serde(rename = "feedbackText")]
    pub feedback_text: String,
}

impl FeedbackRecord {
    pub fn new(
        feedback_text: &str,
        source: FeedbackSource,
        prediction: &Prediction,
        created_at: DateTime<Utc>,
    ) -> Self {
        FeedbackRecord {
            feedback_id: format!("feedback-{}", created_at.timestamp()),
            timestamp: created_at.to_rfc3339_opts(SecondsFormat::Micros, true),
            source,
            sentiment: prediction.label.to_lowercase(),
            sentiment_score: prediction.score.to_string(),
            feedback_text: feedback_text.into(),
        }
    }
}

impl From<FeedbackRecord> for HashMap<String, AttributeValue> {
    fn from(record: FeedbackRecord) -> Self {
        HashMap::from([
            ("feedback_id".into(), AttributeValue::S(record.feedback_id)),
            ("timestamp".into(), AttributeValue::S(record.timestamp)),
            (
                "source".into(),
                AttributeValue::S(record.source.as_str().into()),
            ),
            ("sentiment".into(), AttributeValue::S(record.sentiment)),
            (
                "sentimentScore".into(),
                AttributeValue::S(record.sentiment_score),
            ),
            (
                "feedbackText".into(),
                AttributeValue::S(record.feedback_text),
            ),
        ])
    }
}

impl TryFrom<&HashMap<String, AttributeValue>> for FeedbackRecord {
    type Error = Error;

    fn try_from(item: &HashMap<String, AttributeValue>) -> Result<Self, Error> {
        let source = string_attr(item, "source")?;
        Ok(FeedbackRecord {
            feedback_id: string_attr(item, "feedback_id")?,
            timestamp: string_attr(item, "timestamp")?,
            source: FeedbackSource::parse(&source).ok_or(Error::Attribute("source"))?,
            sentiment: string_attr(item, "sentiment")?,
            sentiment_score: string_attr(item, "sentimentScore")?,
            feedback_text: string_attr(item, "feedbackText")?,
        })
    }
}

fn string_attr(item: &HashMap<String, AttributeValue>, key: &'static str) -> Result<String, Error> {
    match item.get(key) {
        Some(AttributeValue::S(value)) => Ok(value.clone()),
        _ => Err(Error::Attribute(key)),
    }
}

pub fn item_to_json(item: &HashMap<String, AttributeValue>) -> Result<Value, Error> {
    let fields = item
        .iter()
        .map(|(key, value)| Ok((key.clone(), attribute_to_json(value)?)))
        .collect::<Result<serde_json::Map<String, Value>, Error>>()?;

    Ok(Value::Object(fields))
}

/// DynamoDB numbers are arbitrary-precision decimals, which JSON cannot carry
/// without loss, so `N` values come back as strings. Binary attributes have
/// no JSON representation and are rejected.
pub fn attribute_to_json(value: &AttributeValue) -> Result<Value, Error> {
    let value = match value {
        AttributeValue::S(text) => Value::String(text.clone()),
        AttributeValue::N(number) => Value::String(number.clone()),
        AttributeValue::Bool(flag) => Value::Bool(*flag),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(list) => Value::Array(
            list.iter()
                .map(attribute_to_json)
                .collect::<Result<Vec<_>, Error>>()?,
        ),
        AttributeValue::M(map) => Value::Object(
            map.iter()
                .map(|(key, value)| Ok((key.clone(), attribute_to_json(value)?)))
                .collect::<Result<serde_json::Map<String, Value>, Error>>()?,
        ),
        AttributeValue::Ss(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        AttributeValue::Ns(values) => {
            Value::Array(values.iter().cloned().map(Value::String).collect())
        }
        _ => return Err(Error::UnsupportedAttribute),
    };

    Ok(value)
}
