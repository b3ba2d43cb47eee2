//! Line-oriented response streaming shared by both provider families.

use futures_util::StreamExt;
use reqwest::Response;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::provider::LlmError;
use super::types::StreamChunk;

/// Channel depth between the HTTP reader and the consumer.
pub(crate) const STREAM_BUFFER: usize = 64;

/// What a single response line means.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LineOutcome {
    /// Keep-alives, comments, empty deltas.
    Skip,
    /// Answer text, possibly on the final line.
    Delta { text: String, done: bool },
    /// End-of-stream signal.
    Done,
    /// Unparseable line; skipped.
    Malformed(String),
    /// The provider reported an error inside the stream.
    Failed(LlmError),
}

/// Splits a byte stream into lines without breaking multi-byte characters.
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    buf: Vec<u8>,
    /// Bytes of `buf` already searched for a newline.
    scanned: usize,
}

impl LineBuffer {
    /// Append bytes and return every line completed by them.
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(bytes);
        let mut lines = Vec::new();
        let mut line_start = 0;
        for pos in self.scanned..self.buf.len() {
            if self.buf[pos] == b'\n' {
                let text = String::from_utf8_lossy(&self.buf[line_start..pos]);
                lines.push(text.trim_end_matches('\r').to_string());
                line_start = pos + 1;
            }
        }
        self.buf.drain(..line_start);
        self.scanned = self.buf.len();
        lines
    }

    /// The unterminated tail, if it holds anything.
    pub(crate) fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buf);
        self.scanned = 0;
        let text = String::from_utf8_lossy(&rest).trim().to_string();
        (!text.is_empty()).then_some(text)
    }
}

/// Turn a non-success response into the matching error.
pub(crate) async fn check_status(response: Response) -> Result<Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let code = status.as_u16();
    if code == 429 {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok())
            .unwrap_or(60);
        return Err(LlmError::RateLimited {
            retry_after_secs: retry_after,
        });
    }

    let body = response.text().await.unwrap_or_default();
    match code {
        401 | 403 => Err(LlmError::Auth(body)),
        _ => Err(LlmError::ProviderError {
            status: code,
            message: body,
        }),
    }
}

enum Flow {
    Continue,
    Finished,
    Closed,
}

async fn forward(
    tx: &mpsc::Sender<Result<StreamChunk, LlmError>>,
    provider: &str,
    outcome: LineOutcome,
    received: &mut bool,
) -> Flow {
    let (item, finished) = match outcome {
        LineOutcome::Skip => return Flow::Continue,
        LineOutcome::Malformed(reason) => {
            warn!(provider, %reason, "skipping malformed stream line");
            return Flow::Continue;
        }
        LineOutcome::Delta { text, done } => {
            if text.is_empty() {
                (None, done)
            } else {
                *received = true;
                (Some(Ok(StreamChunk::Text(text))), done)
            }
        }
        LineOutcome::Done => (None, true),
        LineOutcome::Failed(err) => (Some(Err(err)), true),
    };

    if let Some(item) = item {
        let failed = item.is_err();
        if tx.send(item).await.is_err() {
            return Flow::Closed;
        }
        if failed {
            return Flow::Finished;
        }
    }
    if finished {
        if tx.send(Ok(StreamChunk::Done)).await.is_err() {
            return Flow::Closed;
        }
        return Flow::Finished;
    }
    Flow::Continue
}

/// Read `response` line by line, decode each line and forward the result.
///
/// Stops at the end-of-stream signal, at the first in-stream error, or when
/// the receiver is dropped (which also drops the connection). A body that
/// closes without a signal still completes if it produced any text.
pub(crate) async fn pump<F>(
    response: Response,
    tx: mpsc::Sender<Result<StreamChunk, LlmError>>,
    provider: &str,
    mut decode: F,
) where
    F: FnMut(&str) -> LineOutcome,
{
    let mut bytes = std::pin::pin!(response.bytes_stream());
    let mut lines = LineBuffer::default();
    let mut received = false;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!(provider, "stream consumer gone, closing connection");
                return;
            }
            next = bytes.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                for line in lines.push(&chunk) {
                    match forward(&tx, provider, decode(&line), &mut received).await {
                        Flow::Continue => {}
                        Flow::Finished | Flow::Closed => return,
                    }
                }
            }
            Some(Err(err)) => {
                let _ = tx.send(Err(LlmError::from_reqwest(err))).await;
                return;
            }
            None => break,
        }
    }

    if let Some(line) = lines.finish() {
        match forward(&tx, provider, decode(&line), &mut received).await {
            Flow::Continue => {}
            Flow::Finished | Flow::Closed => return,
        }
    }

    if received {
        debug!(provider, "stream closed without end marker");
        let _ = tx.send(Ok(StreamChunk::Done)).await;
    } else {
        let _ = tx
            .send(Err(LlmError::Protocol(
                "stream closed before any content arrived".to_string(),
            )))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_buffer_splits_lines() {
        let mut buf = LineBuffer::default();
        assert_eq!(buf.push(b"data: a\r\ndata: "), vec!["data: a"]);
        assert_eq!(buf.push(b"b\n\n"), vec!["data: b", ""]);
        assert_eq!(buf.finish(), None);
    }

    #[test]
    fn test_line_buffer_keeps_split_utf8() {
        let text = "答案\n".as_bytes();
        let mut buf = LineBuffer::default();
        assert!(buf.push(&text[..2]).is_empty());
        assert_eq!(buf.push(&text[2..]), vec!["答案"]);
    }

    #[test]
    fn test_line_buffer_tail() {
        let mut buf = LineBuffer::default();
        assert!(buf.push(b"{\"done\":true}").is_empty());
        assert_eq!(buf.finish().as_deref(), Some("{\"done\":true}"));
    }

    #[test]
    fn test_line_buffer_long_line_in_small_pieces() {
        let mut buf = LineBuffer::default();
        for _ in 0..10_000 {
            assert!(buf.push(b"x").is_empty());
            // Only the newly pushed byte is searched on the next call.
            assert_eq!(buf.scanned, buf.buf.len());
        }
        let lines = buf.push(b"\nnext");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), 10_000);
        assert_eq!(buf.scanned, 4);
        assert_eq!(buf.finish().as_deref(), Some("next"));
    }

    #[tokio::test]
    async fn test_forward_delta_then_done() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut received = false;
        let flow = forward(
            &tx,
            "test",
            LineOutcome::Delta {
                text: "hi".to_string(),
                done: true,
            },
            &mut received,
        )
        .await;
        assert!(matches!(flow, Flow::Finished));
        assert!(received);
        assert_eq!(rx.recv().await, Some(Ok(StreamChunk::Text("hi".to_string()))));
        assert_eq!(rx.recv().await, Some(Ok(StreamChunk::Done)));
    }

    #[tokio::test]
    async fn test_forward_skips_malformed() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut received = false;
        let flow = forward(
            &tx,
            "test",
            LineOutcome::Malformed("bad json".to_string()),
            &mut received,
        )
        .await;
        assert!(matches!(flow, Flow::Continue));
        drop(tx);
        assert_eq!(rx.recv().await, None);
    }
}
