//! Realtime change feed subscription.
//!
//! The cloud service exposes the per-owner change stream as newline-delimited
//! JSON over a long-lived HTTP response. Each line is one event frame in the
//! [`ChangeEvent`] wire shape. Dropping the returned stream closes the
//! response and thereby unsubscribes; resubscription policy belongs to the
//! embedder.

use futures::stream::BoxStream;
use futures::{Stream, StreamExt};
use log::{debug, warn};

use moneta_core::records::{EntityKind, OwnerId};
use moneta_core::sync::ChangeEvent;

use crate::client::ConnectConfig;
use crate::error::{ConnectError, Result};
use crate::session::SessionHandle;

/// Subscribes to the server-pushed change stream.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    client: reqwest::Client,
    base_url: String,
    session: SessionHandle,
}

impl ChangeFeed {
    pub fn new(config: &ConnectConfig, session: SessionHandle) -> Self {
        // No request timeout: the subscription stays open indefinitely.
        let client = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    /// Open the change stream for `owner`, limited to `kinds`.
    pub async fn subscribe(
        &self,
        owner: &OwnerId,
        kinds: &[EntityKind],
    ) -> Result<BoxStream<'static, ChangeEvent>> {
        let token = self
            .session
            .access_token()
            .ok_or_else(|| ConnectError::auth("No active session"))?;
        let kinds_param = kinds
            .iter()
            .map(|kind| kind.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let response = self
            .client
            .get(format!("{}/v1/changes/stream", self.base_url))
            .bearer_auth(token)
            .query(&[("ownerId", owner.as_str()), ("kinds", kinds_param.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ConnectError::api(
                status.as_u16(),
                format!("Change feed subscription failed: {}", body),
            ));
        }

        debug!("[Connect] change feed open for owner {}", owner);
        Ok(ndjson_events(Box::pin(response.bytes_stream())))
    }
}

fn parse_frame(line: &str) -> Option<ChangeEvent> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str(line) {
        Ok(event) => Some(event),
        Err(err) => {
            warn!("[Connect] skipping malformed change frame: {}", err);
            None
        }
    }
}

/// Turn a byte-chunk stream into a stream of change events, one per line.
/// Malformed lines are skipped; a transport error ends the stream.
fn ndjson_events<S, B, E>(source: S) -> BoxStream<'static, ChangeEvent>
where
    S: Stream<Item = std::result::Result<B, E>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    futures::stream::unfold((source, Vec::new()), |(mut source, mut buf)| async move {
        loop {
            if let Some(pos) = buf.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buf.drain(..=pos).collect();
                if let Some(event) = parse_frame(&String::from_utf8_lossy(&line)) {
                    return Some((event, (source, buf)));
                }
                continue;
            }
            match source.next().await {
                Some(Ok(chunk)) => buf.extend_from_slice(chunk.as_ref()),
                Some(Err(err)) => {
                    warn!("[Connect] change feed transport error: {}", err);
                    return None;
                }
                None => {
                    if buf.is_empty() {
                        return None;
                    }
                    let rest = std::mem::take(&mut buf);
                    match parse_frame(&String::from_utf8_lossy(&rest)) {
                        Some(event) => return Some((event, (source, buf))),
                        None => return None,
                    }
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use moneta_core::sync::ChangeOp;
    use std::convert::Infallible;

    fn chunks(parts: &[&str]) -> Vec<std::result::Result<Vec<u8>, Infallible>> {
        parts
            .iter()
            .map(|part| Ok(part.as_bytes().to_vec()))
            .collect()
    }

    fn frame(id: &str) -> String {
        format!(
            "{{\"kind\":\"transaction\",\"op\":\"delete\",\"row\":{{\"id\":\"{}\",\"ownerId\":\"user_1\"}}}}\n",
            id
        )
    }

    #[tokio::test]
    async fn events_split_on_lines_across_chunks() {
        let whole = frame("tx_001");
        let (head, tail) = whole.split_at(20);
        let second = frame("tx_002");
        let source = futures::stream::iter(chunks(&[head, tail, second.as_str()]));

        let events: Vec<ChangeEvent> = ndjson_events(Box::pin(source)).collect().await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].op, ChangeOp::Delete);
        assert_eq!(events[0].row["id"], "tx_001");
        assert_eq!(events[1].row["id"], "tx_002");
    }

    #[tokio::test]
    async fn malformed_and_blank_lines_are_skipped() {
        let valid = frame("tx_001");
        let source = futures::stream::iter(chunks(&["not json\n", "\n", valid.as_str()]));

        let events: Vec<ChangeEvent> = ndjson_events(Box::pin(source)).collect().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].row["id"], "tx_001");
    }

    #[tokio::test]
    async fn trailing_frame_without_newline_is_delivered() {
        let trailing = frame("tx_003");
        let trailing = trailing.trim_end();
        let source = futures::stream::iter(chunks(&[trailing]));

        let events: Vec<ChangeEvent> = ndjson_events(Box::pin(source)).collect().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].row["id"], "tx_003");
    }
}
