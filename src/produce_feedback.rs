use aws_config::BehaviorVersion;
use chrono::Utc;
use lambda_http::http::StatusCode;
use lambda_http::{
    run, service_fn, Error as LambdaError, Request as LambdaRequest, Response as LambdaResponse,
};
use serde::Serialize;
use tracing::{error, info};

mod common;
use crate::common::errors::Error;
use crate::common::sentiment::{SentimentClient, SENTIMENT_API_URL_DEFAULT};
use crate::common::utils::{error_response, json_response};
use crate::common::{pick_feedback_text, FeedbackRecord, FeedbackSource, TABLE_NAME_DEFAULT};

const STORED_MESSAGE: &str = "Feedback stored";
const STORE_FAILED_MESSAGE: &str = "Failed to store feedback";

#[derive(Debug, Serialize)]
struct Response<'a> {
    message: &'a str,
    feedback: &'a FeedbackRecord,
}

async fn store_feedback(
    sentiment_client: &SentimentClient,
    dynamo_client: &aws_sdk_dynamodb::Client,
    table_name: &str,
) -> Result<FeedbackRecord, Error> {
    let (feedback_text, source) = {
        let mut rng = rand::thread_rng();
        (pick_feedback_text(&mut rng), FeedbackSource::pick(&mut rng))
    };

    let prediction = sentiment_client.classify(feedback_text).await?;
    let record = FeedbackRecord::new(feedback_text, source, &prediction, Utc::now());

    info!("Storing feedback with id: {}", record.feedback_id);
    dynamo_client
        .put_item()
        .table_name(table_name)
        .set_item(Some(record.clone().into()))
        .send()
        .await
        .map_err(Error::store)?;

    Ok(record)
}

// The request payload is unused; the lambda fabricates one record per
// invocation regardless of the trigger.
#[tracing::instrument(skip_all)]
async fn process_request(
    _request: LambdaRequest,
    sentiment_client: &SentimentClient,
    dynamo_client: &aws_sdk_dynamodb::Client,
    table_name: &str,
) -> Result<LambdaResponse<String>, Error> {
    match store_feedback(sentiment_client, dynamo_client, table_name).await {
        Ok(feedback) => json_response(
            StatusCode::OK,
            &Response {
                message: STORED_MESSAGE,
                feedback: &feedback,
            },
        ),
        Err(err) => {
            error!("{STORE_FAILED_MESSAGE}: {err}");
            error_response(STORE_FAILED_MESSAGE, &err)
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), LambdaError> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_ansi(false)
        .without_time() // CloudWatch will add the ingestion time
        .with_target(false)
        .init();

    let table_name = std::env::var("TABLE_NAME").unwrap_or(TABLE_NAME_DEFAULT.into());
    let api_url = std::env::var("SENTIMENT_API_URL").unwrap_or(SENTIMENT_API_URL_DEFAULT.into());
    let api_token = std::env::var("HF_API_TOKEN").unwrap_or_default();

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let dynamo_client = aws_sdk_dynamodb::Client::new(&config);
    let sentiment_client = SentimentClient::new(api_url, api_token);

    run(service_fn(|request: LambdaRequest| async {
        process_request(request, &sentiment_client, &dynamo_client, &table_name)
            .await
            .map_err(LambdaError::from)
    }))
    .await
}
