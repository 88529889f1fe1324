use anyhow::Result;
use colored::*;
use reqwest::StatusCode;
use serde_json::json;
use std::time::{Duration, Instant};

use crate::api_client::ApiClient;
use crate::output::{print_event, TestResult};
use crate::sse_client::Connection;

const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Both connections open with a snapshot array before any fact is published.
pub async fn test_connection(sse1: &mut Connection, sse2: &mut Connection) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Connection ===".bright_cyan().bold());

    for sse in [sse1, sse2] {
        println!("{} Waiting for snapshot on {}...", "→".blue(), sse.label);

        match sse.wait_for_snapshot(EVENT_TIMEOUT).await {
            Ok(envelopes) => println!(
                "{} {} received snapshot with {} fact(s)",
                "✓".green(),
                sse.label,
                envelopes.len()
            ),
            Err(e) => {
                println!("{} No snapshot for {}: {}", "✗".red(), sse.label, e);
                return Ok(TestResult::fail(
                    "connection",
                    format!("{}: {}", sse.label, e),
                    start.elapsed(),
                ));
            }
        }
    }

    Ok(TestResult::pass("connection", start.elapsed()))
}

/// A published fact reaches every open connection with the sequence the publisher got back.
pub async fn test_broadcast(
    api_client: &ApiClient,
    sse1: &mut Connection,
    sse2: &mut Connection,
) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Broadcast ===".bright_cyan().bold());

    let marker = uuid::Uuid::new_v4().to_string();
    let fact = json!({ "kind": "broadcast", "marker": marker });

    println!("{} Publishing fact...", "→".blue());
    let sequence = api_client.publish_fact(&fact).await?;
    println!("{} Fact published (sequence: {})", "✓".green(), sequence);

    for sse in [sse1, sse2] {
        match sse.wait_for_sequence(sequence, EVENT_TIMEOUT).await {
            Ok(event) => {
                print_event(&sse.label, &event);

                if event.data["payload"] != fact {
                    println!("{} Payload mismatch on {}", "✗".red(), sse.label);
                    return Ok(TestResult::fail(
                        "broadcast",
                        format!(
                            "{}: expected payload {}, got {}",
                            sse.label, fact, event.data["payload"]
                        ),
                        start.elapsed(),
                    ));
                }
            }
            Err(e) => {
                println!("{} {} missed the fact: {}", "✗".red(), sse.label, e);
                return Ok(TestResult::fail(
                    "broadcast",
                    format!("{}: {}", sse.label, e),
                    start.elapsed(),
                ));
            }
        }
    }

    println!("{} Both subscribers received the fact", "✓".green());
    Ok(TestResult::pass("broadcast", start.elapsed()))
}

/// The status endpoint counts the open connections and reports the latest sequence.
pub async fn test_status(api_client: &ApiClient) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Status ===".bright_cyan().bold());

    let sequence = api_client
        .publish_fact(&json!({ "kind": "status" }))
        .await?;
    let status = api_client.status().await?;

    println!(
        "{} active_subscribers={}, last_sequence={:?}",
        "→".blue(),
        status.active_subscribers,
        status.last_sequence
    );

    if status.active_subscribers < 2 {
        return Ok(TestResult::fail(
            "status",
            format!(
                "Expected at least 2 active subscribers, got {}",
                status.active_subscribers
            ),
            start.elapsed(),
        ));
    }

    match status.last_sequence {
        Some(last) if last >= sequence => Ok(TestResult::pass("status", start.elapsed())),
        other => Ok(TestResult::fail(
            "status",
            format!("Expected last_sequence >= {}, got {:?}", sequence, other),
            start.elapsed(),
        )),
    }
}

/// A connection opened after a publish finds that fact at the end of its snapshot.
pub async fn test_replay(api_client: &ApiClient, base_url: &str) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Replay ===".bright_cyan().bold());

    let sequence = api_client
        .publish_fact(&json!({ "kind": "replay" }))
        .await?;
    println!("{} Fact published (sequence: {})", "✓".green(), sequence);

    let mut late = Connection::establish(base_url, "Late subscriber".to_string()).await?;

    let envelopes = match late.wait_for_snapshot(EVENT_TIMEOUT).await {
        Ok(envelopes) => envelopes,
        Err(e) => {
            return Ok(TestResult::fail(
                "replay",
                format!("No snapshot: {}", e),
                start.elapsed(),
            ))
        }
    };

    let last = envelopes.last().and_then(|env| env["sequence"].as_u64());
    if last == Some(sequence) {
        println!(
            "{} Snapshot ends with sequence {}",
            "✓".green(),
            sequence
        );
        Ok(TestResult::pass("replay", start.elapsed()))
    } else {
        Ok(TestResult::fail(
            "replay",
            format!("Expected snapshot to end with {}, got {:?}", sequence, last),
            start.elapsed(),
        ))
    }
}

/// A null fact is rejected and is never broadcast.
pub async fn test_invalid_payload(api_client: &ApiClient) -> Result<TestResult> {
    let start = Instant::now();

    println!("\n{}", "=== TEST: Invalid Payload ===".bright_cyan().bold());

    let before = api_client.status().await?.last_sequence;
    let status = api_client.publish_raw("null").await?;
    let after = api_client.status().await?.last_sequence;

    if status != StatusCode::UNPROCESSABLE_ENTITY {
        return Ok(TestResult::fail(
            "invalid_payload",
            format!("Expected 422, got {}", status),
            start.elapsed(),
        ));
    }

    if before != after {
        return Ok(TestResult::fail(
            "invalid_payload",
            format!("Sequence moved from {:?} to {:?}", before, after),
            start.elapsed(),
        ));
    }

    println!("{} Null fact rejected with {}", "✓".green(), status);
    Ok(TestResult::pass("invalid_payload", start.elapsed()))
}
