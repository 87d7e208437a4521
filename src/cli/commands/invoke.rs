//! `invoke`: one event through one function

use anyhow::{Context, Result};
use serde_json::{json, Value};
use std::io::Read;
use std::path::Path;
use tracing::debug;

use crate::api::{Function, GatewayEvent, GatewayResponse};
use crate::app::Services;

/// Read the event JSON from `path`, or stdin for "-"
pub fn read_event(path: &Path) -> Result<Value> {
    let text = if path == Path::new("-") {
        let mut buffer = String::new();
        std::io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read event from stdin")?;
        buffer
    } else {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read event file {}", path.display()))?
    };
    serde_json::from_str(&text).context("Event is not valid JSON")
}

/// The response as a function runtime would return it, body kept as a string
pub fn response_json(response: &GatewayResponse) -> Value {
    json!({
        "statusCode": response.status_code,
        "headers": response.headers,
        "body": response.body,
    })
}

pub async fn run_invoke(services: Services, function: Function, event_path: &Path) -> Result<()> {
    let event = GatewayEvent::from_value(read_event(event_path)?);
    debug!("Invoking {:?}", function);
    let response = services.handlers.dispatch(function, &event).await;
    println!("{}", serde_json::to_string_pretty(&response_json(&response))?);
    Ok(())
}
