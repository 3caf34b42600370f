use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::operation::scan::ScanOutput;
use aws_sdk_dynamodb::types::AttributeValue;
use lambda_http::http::StatusCode;
use lambda_http::{
    run, service_fn, Error as LambdaError, Request as LambdaRequest, Response as LambdaResponse,
};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{error, info};

mod common;
use crate::common::errors::Error;
use crate::common::utils::{error_response, json_response};
use crate::common::{item_to_json, TABLE_NAME_DEFAULT};

const FETCHED_MESSAGE: &str = "Successfully fetched feedback data";
const FETCH_FAILED_MESSAGE: &str = "Failed to fetch feedback data";

#[derive(Debug, Serialize)]
struct Response<'a> {
    message: &'a str,
    feedback_data: &'a [Value],
}

fn extend_page(
    items: &mut Vec<HashMap<String, AttributeValue>>,
    page: ScanOutput,
) -> Option<HashMap<String, AttributeValue>> {
    items.extend(page.items.unwrap_or_default());
    page.last_evaluated_key
}

async fn fetch_feedback(
    dynamo_client: &aws_sdk_dynamodb::Client,
    table_name: &str,
) -> Result<Vec<Value>, Error> {
    let mut items = Vec::new();
    let mut start_key = None;

    // A scan page is capped at 1 MB; follow LastEvaluatedKey until the table
    // is exhausted.
    loop {
        let page = dynamo_client
            .scan()
            .table_name(table_name)
            .set_exclusive_start_key(start_key.take())
            .send()
            .await
            .map_err(Error::store)?;

        start_key = extend_page(&mut items, page);
        if start_key.is_none() {
            break;
        }
    }

    info!("Fetched {} feedback records", items.len());
    items.iter().map(item_to_json).collect()
}

#[tracing::instrument(skip_all)]
async fn process_request(
    _request: LambdaRequest,
    dynamo_client: &aws_sdk_dynamodb::Client,
    table_name: &str,
) -> Result<LambdaResponse<String>, Error> {
    match fetch_feedback(dynamo_client, table_name).await {
        Ok(feedback_data) => json_response(
            StatusCode::OK,
            &Response {
                message: FETCHED_MESSAGE,
                feedback_data: &feedback_data,
            },
        ),
        Err(err) => {
            error!("{FETCH_FAILED_MESSAGE}: {err}");
            error_response(FETCH_FAILED_MESSAGE, &err)
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

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let dynamo_client = aws_sdk_dynamodb::Client::new(&config);

    run(service_fn(|request: LambdaRequest| async {
        process_request(request, &dynamo_client, &table_name)
            .await
            .map_err(LambdaError::from)
    }))
    .await
}
