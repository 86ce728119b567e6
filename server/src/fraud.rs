//! External fraud blacklist lookup, consulted after a successful relay.
//! Fail-open: any fetch problem resolves to "not suspicious" so a transient
//! outage never blocks legitimate traffic.

/// Check whether a visitor id appears in the external blacklist.
pub async fn is_suspicious(http: &reqwest::Client, list_url: &str, visitor_id: i64) -> bool {
    match fetch_list(http, list_url).await {
        Ok(body) => body.contains(&visitor_id.to_string()),
        Err(e) => {
            tracing::debug!("Fraud list fetch failed (fail-open): {}", e);
            false
        }
    }
}

async fn fetch_list(http: &reqwest::Client, list_url: &str) -> Result<String, reqwest::Error> {
    http.get(list_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await
}
