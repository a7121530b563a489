//! HTTP transport for both call paths.
//!
//! Owns connection setup, auth/identification headers, and the line-oriented
//! view of a streaming body. Line reassembly across chunk boundaries lives
//! here; frame semantics live in [`crate::pipeline`].

use crate::backend::{BackendConfig, BackendKind};
use crate::error::Error;
use crate::{BoxStream, Result};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

/// Stable anonymous identifier sent to the builtin backend for quota
/// attribution (not authentication). Process-lifetime scoped.
static CLIENT_ID: Lazy<String> = Lazy::new(|| Uuid::new_v4().to_string());

/// Per-call transport over one [`BackendConfig`] snapshot.
///
/// Constructed fresh for every call; construction performs the request-time
/// configuration check but no network I/O.
pub struct HttpTransport {
    client: reqwest::Client,
    config: BackendConfig,
}

impl HttpTransport {
    pub fn new(config: BackendConfig) -> Result<Self> {
        config.ensure_usable()?;

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(Error::from_transport)?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Backend-appropriate headers: bearer credential for Custom, anonymous
    /// client/plan identification for Builtin.
    fn prepare(&self, req: reqwest::RequestBuilder, request_id: &str) -> reqwest::RequestBuilder {
        let req = req.header("x-promptcraft-request-id", request_id);
        match self.config.kind {
            BackendKind::Custom => {
                req.bearer_auth(self.config.api_key.as_deref().unwrap_or_default())
            }
            BackendKind::Builtin => req
                .header("x-client-id", CLIENT_ID.as_str())
                .header("x-client-plan", self.config.plan.as_str()),
        }
    }

    /// `POST` a JSON body and return the raw response with the connection
    /// held open for streaming. Connect failures surface before any line.
    pub async fn post_stream<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        request_id: &str,
    ) -> Result<reqwest::Response> {
        let url = self.config.endpoint(path);
        let req = self
            .client
            .post(&url)
            .json(body)
            .header("accept", "text/event-stream");
        self.prepare(req, request_id)
            .send()
            .await
            .map_err(Error::from_transport)
    }

    /// `POST` a JSON body and return the buffered response.
    pub async fn post_json<B: Serialize>(
        &self,
        path: &str,
        body: &B,
        request_id: &str,
    ) -> Result<reqwest::Response> {
        let url = self.config.endpoint(path);
        let req = self
            .client
            .post(&url)
            .json(body)
            .header("accept", "application/json");
        self.prepare(req, request_id)
            .send()
            .await
            .map_err(Error::from_transport)
    }

    pub async fn get(&self, path: &str, request_id: &str) -> Result<reqwest::Response> {
        let url = self.config.endpoint(path);
        let req = self.client.get(&url).header("accept", "application/json");
        self.prepare(req, request_id)
            .send()
            .await
            .map_err(Error::from_transport)
    }
}

/// View a streaming response body as an ordered, lazy, single-pass sequence
/// of text lines. Dropping the stream drops the connection.
pub fn response_lines(response: reqwest::Response) -> BoxStream<'static, String> {
    line_stream(response.bytes_stream())
}

/// Reassemble a chunked byte stream into text lines.
///
/// Network chunks are aligned to neither line nor character boundaries, so
/// raw bytes are buffered until a `\n` is seen and only complete lines are
/// decoded; a multi-byte character whose bytes straddle a chunk boundary
/// stays intact in the buffer. A trailing CR is stripped. Whatever remains
/// at EOF is yielded as a final line.
pub fn line_stream<S, E>(bytes: S) -> BoxStream<'static, String>
where
    S: Stream<Item = std::result::Result<Bytes, E>> + Send + 'static,
    E: Into<Error>,
{
    let stream = futures::stream::unfold(
        (Box::pin(bytes), Vec::new(), false),
        |(mut input, mut buf, mut eof): (_, Vec<u8>, bool)| async move {
            loop {
                if let Some(idx) = buf.iter().position(|&b| b == b'\n') {
                    let mut line: Vec<u8> = buf.drain(..=idx).collect();
                    line.pop();
                    if line.last() == Some(&b'\r') {
                        line.pop();
                    }
                    let line = String::from_utf8_lossy(&line).into_owned();
                    return Some((Ok(line), (input, buf, eof)));
                }

                if eof {
                    if buf.is_empty() {
                        return None;
                    }
                    let tail = std::mem::take(&mut buf);
                    let line = String::from_utf8_lossy(&tail).into_owned();
                    return Some((Ok(line), (input, buf, eof)));
                }

                match input.next().await {
                    Some(Ok(chunk)) => {
                        buf.extend_from_slice(&chunk);
                    }
                    Some(Err(e)) => {
                        let err = e.into();
                        debug!(error = %err, "stream body read failed");
                        return Some((Err(err), (input, buf, true)));
                    }
                    None => {
                        eof = true;
                    }
                }
            }
        },
    );

    Box::pin(stream)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::AiSettings;
    use futures::StreamExt;

    fn chunks(parts: Vec<&'static str>) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
        futures::stream::iter(parts.into_iter().map(|p| Ok(Bytes::from(p))))
    }

    #[tokio::test]
    async fn transport_construction_rejects_unusable_config() {
        let config = BackendConfig::select(&AiSettings::default());
        assert!(matches!(
            HttpTransport::new(config).err(),
            Some(Error::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn lines_are_reassembled_across_chunk_boundaries() {
        let input = chunks(vec!["data: a", "bc\ndata:", " xy\n"]);
        let lines: Vec<String> = line_stream(input).map(|l| l.unwrap()).collect().await;
        assert_eq!(lines, vec!["data: abc", "data: xy"]);
    }

    #[tokio::test]
    async fn multibyte_characters_split_mid_sequence_stay_intact() {
        // "你" is E4 BD A0; the cut falls between its second and third byte.
        let body = "data: 你好\n".as_bytes();
        let input = futures::stream::iter(
            vec![&body[..8], &body[8..]]
                .into_iter()
                .map(|p| Ok::<_, Error>(Bytes::copy_from_slice(p))),
        );
        let lines: Vec<String> = line_stream(input).map(|l| l.unwrap()).collect().await;
        assert_eq!(lines, vec!["data: 你好"]);
    }

    #[tokio::test]
    async fn crlf_is_stripped_and_eof_tail_is_yielded() {
        let input = chunks(vec!["one\r\ntwo"]);
        let lines: Vec<String> = line_stream(input).map(|l| l.unwrap()).collect().await;
        assert_eq!(lines, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn empty_body_yields_no_lines() {
        let input = chunks(vec![]);
        assert_eq!(line_stream(input).count().await, 0);
    }
}
