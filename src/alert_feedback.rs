use aws_config::BehaviorVersion;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_ses::types::{Body, Content, Destination, Message};
use chrono::{Duration, SecondsFormat, Utc};
use lambda_http::http::StatusCode;
use lambda_http::{
    run, service_fn, Error as LambdaError, Request as LambdaRequest, Response as LambdaResponse,
};
use serde::Serialize;
use tracing::{error, info};

mod common;
use crate::common::errors::Error;
use crate::common::utils::{error_response, json_response};
use crate::common::{FeedbackRecord, TABLE_NAME_DEFAULT};

const INDEX_NAME_DEFAULT: &str = "sentiment-timestamp-index";
const ALERT_EMAIL_DEFAULT: &str = "feedback-alerts@example.com";
const DASHBOARD_URL_DEFAULT: &str = "http://localhost:3000/";

const ALERT_THRESHOLD: usize = 5;
const ALERT_WINDOW_MINUTES: i64 = 5;
const QUERY_LIMIT: i32 = 10;
const EXAMPLE_COUNT: usize = 5;

const CHECK_FAILED_MESSAGE: &str = "Failed to check feedback";

#[derive(Debug, Serialize)]
struct Response {
    message: String,
    #[serde(rename = "thresholdMet")]
    threshold_met: bool,
}

#[derive(Debug, PartialEq)]
struct SpikeAlert {
    count: usize,
    sources: Vec<&'static str>,
    examples: Vec<String>,
}

/// Fires once the recent-negative count reaches the threshold. Sources are
/// deduplicated in first-seen order; examples keep the query's
/// newest-first order.
fn spike_alert(records: &[FeedbackRecord]) -> Option<SpikeAlert> {
    if records.len() < ALERT_THRESHOLD {
        return None;
    }

    let mut sources = Vec::new();
    for record in records {
        let name = record.source.as_str();
        if !sources.contains(&name) {
            sources.push(name);
        }
    }

    let examples = records
        .iter()
        .take(EXAMPLE_COUNT)
        .map(|record| {
            format!(
                "\"{}\" ({} via {})",
                record.feedback_text,
                record.timestamp,
                record.source.as_str()
            )
        })
        .collect();

    Some(SpikeAlert {
        count: records.len(),
        sources,
        examples,
    })
}

fn alert_subject(alert: &SpikeAlert) -> String {
    format!("Negative Feedback Spike ({} items)", alert.count)
}

fn alert_html(alert: &SpikeAlert, dashboard_url: &str) -> String {
    let examples = alert
        .examples
        .iter()
        .map(|example| format!("<li>{example}</li>"))
        .collect::<String>();

    format!(
        "<h3>Negative Feedback Spike Detected</h3>\
         <p><strong>Time Window:</strong> Last {ALERT_WINDOW_MINUTES} minutes</p>\
         <p><strong>Count:</strong> {} negative feedback items</p>\
         <p><strong>Sources:</strong> {}</p>\
         <h4>Recent Examples:</h4>\
         <ul>{examples}</ul>\
         <p><a href=\"{dashboard_url}\">View Full Dashboard</a></p>",
        alert.count,
        alert.sources.join(", "),
    )
}

async fn send_alert(
    ses_client: &aws_sdk_ses::Client,
    alert_email: &str,
    dashboard_url: &str,
    alert: &SpikeAlert,
) -> Result<(), Error> {
    let subject = Content::builder()
        .charset("UTF-8")
        .data(alert_subject(alert))
        .build()
        .map_err(Error::alert)?;
    let html = Content::builder()
        .charset("UTF-8")
        .data(alert_html(alert, dashboard_url))
        .build()
        .map_err(Error::alert)?;
    let message = Message::builder()
        .subject(subject)
        .body(Body::builder().html(html).build())
        .build();

    ses_client
        .send_email()
        .source(alert_email)
        .destination(Destination::builder().to_addresses(alert_email).build())
        .message(message)
        .send()
        .await
        .map_err(Error::alert)?;

    Ok(())
}

async fn check_feedback(
    dynamo_client: &aws_sdk_dynamodb::Client,
    table_name: &str,
    index_name: &str,
    ses_client: &aws_sdk_ses::Client,
    alert_email: &str,
    dashboard_url: &str,
) -> Result<Response, Error> {
    let window_start = (Utc::now() - Duration::minutes(ALERT_WINDOW_MINUTES))
        .to_rfc3339_opts(SecondsFormat::Micros, true);

    info!("Querying negative feedback since {window_start}");
    let result = dynamo_client
        .query()
        .table_name(table_name)
        .index_name(index_name)
        .key_condition_expression("sentiment = :sentiment AND #ts > :timestamp")
        .expression_attribute_names("#ts", "timestamp")
        .expression_attribute_values(":sentiment", AttributeValue::S("negative".into()))
        .expression_attribute_values(":timestamp", AttributeValue::S(window_start))
        .scan_index_forward(false)
        .limit(QUERY_LIMIT)
        .send()
        .await
        .map_err(Error::store)?;

    let records = result
        .items
        .unwrap_or_default()
        .iter()
        .map(FeedbackRecord::try_from)
        .collect::<Result<Vec<_>, Error>>()?;

    let threshold_met = if let Some(alert) = spike_alert(&records) {
        send_alert(ses_client, alert_email, dashboard_url, &alert).await?;
        info!("Alert sent for {} negative feedback items", alert.count);
        true
    } else {
        false
    };

    Ok(Response {
        message: format!("Checked feedback. Found {} negative items.", records.len()),
        threshold_met,
    })
}

#[tracing::instrument(skip_all)]
async fn process_request(
    _request: LambdaRequest,
    dynamo_client: &aws_sdk_dynamodb::Client,
    table_name: &str,
    index_name: &str,
    ses_client: &aws_sdk_ses::Client,
    alert_email: &str,
    dashboard_url: &str,
) -> Result<LambdaResponse<String>, Error> {
    let result = check_feedback(
        dynamo_client,
        table_name,
        index_name,
        ses_client,
        alert_email,
        dashboard_url,
    )
    .await;

    match result {
        Ok(response) => json_response(StatusCode::OK, &response),
        Err(err) => {
            error!("{CHECK_FAILED_MESSAGE}: {err}");
            error_response(CHECK_FAILED_MESSAGE, &err)
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
    let index_name = std::env::var("INDEX_NAME").unwrap_or(INDEX_NAME_DEFAULT.into());
    let alert_email = std::env::var("ALERT_EMAIL").unwrap_or(ALERT_EMAIL_DEFAULT.into());
    let dashboard_url = std::env::var("DASHBOARD_URL").unwrap_or(DASHBOARD_URL_DEFAULT.into());

    let config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let dynamo_client = aws_sdk_dynamodb::Client::new(&config);
    let ses_client = aws_sdk_ses::Client::new(&config);

    run(service_fn(|request: LambdaRequest| async {
        process_request(
            request,
            &dynamo_client,
            &table_name,
            &index_name,
            &ses_client,
            &alert_email,
            &dashboard_url,
        )
        .await
        .map_err(LambdaError::from)
    }))
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::sentiment::Prediction;
    use crate::common::FeedbackSource;
    use chrono::TimeZone;
    use serde_json::{json, Value};

    fn negative_record(text: &str, source: FeedbackSource) -> FeedbackRecord {
        FeedbackRecord::new(
            text,
            source,
            &Prediction {
                label: "NEGATIVE".into(),
                score: 0.99,
            },
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
        )
    }

    #[test]
    fn below_threshold_raises_no_alert() {
        let records: Vec<FeedbackRecord> = (0..4)
            .map(|_| negative_record("Waste of money.", FeedbackSource::App))
            .collect();
        assert_eq!(spike_alert(&records), None);
    }

    #[test]
    fn threshold_raises_alert_with_deduplicated_sources() {
        let records = vec![
            negative_record("Waste of money.", FeedbackSource::App),
            negative_record("Very disappointed.", FeedbackSource::Web),
            negative_record("Terrible customer service.", FeedbackSource::App),
            negative_record("Not what I expected.", FeedbackSource::Web),
            negative_record("Could be better.", FeedbackSource::App),
            negative_record("Waste of money.", FeedbackSource::Email),
        ];

        let alert = spike_alert(&records).unwrap();
        assert_eq!(alert.count, 6);
        assert_eq!(alert.sources, vec!["App", "Web", "Email"]);
        assert_eq!(alert.examples.len(), EXAMPLE_COUNT);
        assert!(alert.examples[0].starts_with("\"Waste of money.\""));
    }

    #[test]
    fn alert_body_reports_count_sources_and_examples() {
        let records = vec![
            negative_record("Waste of money.", FeedbackSource::App),
            negative_record("Very disappointed.", FeedbackSource::Web),
            negative_record("Terrible customer service.", FeedbackSource::App),
            negative_record("Not what I expected.", FeedbackSource::Web),
            negative_record("Could be better.", FeedbackSource::App),
        ];
        let alert = spike_alert(&records).unwrap();

        assert_eq!(alert_subject(&alert), "Negative Feedback Spike (5 items)");
        let html = alert_html(&alert, DASHBOARD_URL_DEFAULT);
        assert!(html.contains("5 negative feedback items"));
        assert!(html.contains("App, Web"));
        assert!(html.contains("<li>\"Waste of money.\""));
        assert!(html.contains(DASHBOARD_URL_DEFAULT));
    }

    #[test]
    fn check_response_reports_count_and_threshold() {
        let response = json_response(
            StatusCode::OK,
            &Response {
                message: "Checked feedback. Found 2 negative items.".into(),
                threshold_met: false,
            },
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(
            body["message"],
            json!("Checked feedback. Found 2 negative items.")
        );
        assert_eq!(body["thresholdMet"], json!(false));
    }

    #[test]
    fn check_failure_maps_to_a_500_body() {
        let err = Error::alert("email rejected");
        let response = error_response(CHECK_FAILED_MESSAGE, &err).unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body: Value = serde_json::from_str(response.body()).unwrap();
        assert_eq!(body["message"], json!("Failed to check feedback"));
        assert!(body["error"].as_str().unwrap().contains("email rejected"));
    }
}
