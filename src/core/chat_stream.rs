//! Streaming ingestion of assistant replies
//!
//! One request per submission: `GET {server}/chat?input=...&session_id=...`.
//! The body is raw UTF-8 text with no framing; concatenating the chunks in
//! arrival order reconstructs the full reply. Each spawned fetch is bound to
//! the chat id captured at request start, so replies keep landing in the
//! thread they were requested from even when the user switches chats while
//! the stream is in flight.

use futures_util::StreamExt;
use tokio::sync::mpsc;

use crate::utils::url::chat_endpoint_url;

/// Events emitted by an in-flight fetch, applied to the store by the event
/// loop. `End` is sent on every exit path so the loading flag is always
/// released.
#[derive(Clone, Debug)]
pub enum StreamMessage {
    /// The response started; the placeholder bot message should be created.
    Open,
    /// The full accumulated reply so far (not a delta). Last writer wins.
    Content(String),
    /// Transport or decode failure; the fixed error message should be shown.
    Error,
    /// The stream finished, successfully or not.
    End,
}

pub struct FetchParams {
    pub client: reqwest::Client,
    pub server_url: String,
    pub input: String,
    pub session_id: String,
    pub chat_id: u64,
}

/// Hands stream events to the UI loop over an unbounded channel, tagged with
/// the target chat id. There is no cancellation: a started stream runs to
/// completion or failure.
#[derive(Clone)]
pub struct ChatStreamService {
    tx: mpsc::UnboundedSender<(StreamMessage, u64)>,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_fetch(&self, params: FetchParams) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let FetchParams {
                client,
                server_url,
                input,
                session_id,
                chat_id,
            } = params;

            let url = chat_endpoint_url(&server_url);
            tracing::debug!(%url, chat_id, "starting chat request");

            let request = client
                .get(url)
                .query(&[("input", input.as_str()), ("session_id", session_id.as_str())]);

            match request.send().await {
                Ok(response) => {
                    let _ = tx.send((StreamMessage::Open, chat_id));

                    let mut stream = response.bytes_stream();
                    let mut decoder = Utf8ChunkDecoder::new();
                    let mut accumulated = String::new();

                    while let Some(chunk) = stream.next().await {
                        match chunk {
                            Ok(bytes) => match decoder.feed(&bytes) {
                                Ok(text) => {
                                    if text.is_empty() {
                                        continue;
                                    }
                                    accumulated.push_str(&text);
                                    let _ =
                                        tx.send((StreamMessage::Content(accumulated.clone()), chat_id));
                                }
                                Err(e) => {
                                    tracing::warn!(chat_id, error = %e, "stream decode failed");
                                    let _ = tx.send((StreamMessage::Error, chat_id));
                                    let _ = tx.send((StreamMessage::End, chat_id));
                                    return;
                                }
                            },
                            Err(e) => {
                                tracing::warn!(chat_id, error = %e, "stream read failed");
                                let _ = tx.send((StreamMessage::Error, chat_id));
                                let _ = tx.send((StreamMessage::End, chat_id));
                                return;
                            }
                        }
                    }

                    if !decoder.is_drained() {
                        // The body ended mid-code-point; treat the truncation
                        // like any other decode failure.
                        tracing::warn!(chat_id, "stream ended inside a UTF-8 sequence");
                        let _ = tx.send((StreamMessage::Error, chat_id));
                        let _ = tx.send((StreamMessage::End, chat_id));
                        return;
                    }

                    tracing::debug!(chat_id, bytes = accumulated.len(), "stream completed");
                    let _ = tx.send((StreamMessage::End, chat_id));
                }
                Err(e) => {
                    tracing::warn!(chat_id, error = %e, "chat request failed");
                    let _ = tx.send((StreamMessage::Error, chat_id));
                    let _ = tx.send((StreamMessage::End, chat_id));
                }
            }
        });
    }

    #[cfg(test)]
    pub fn send_for_test(&self, message: StreamMessage, chat_id: u64) {
        let _ = self.tx.send((message, chat_id));
    }
}

/// Strict incremental UTF-8 decoding. HTTP chunk boundaries fall anywhere,
/// so a multi-byte code point may be split across chunks; up to three bytes
/// of an incomplete trailing sequence are carried into the next feed. An
/// invalid sequence is a hard error and takes the generic failure path.
struct Utf8ChunkDecoder {
    pending: Vec<u8>,
}

impl Utf8ChunkDecoder {
    fn new() -> Self {
        Self {
            pending: Vec::new(),
        }
    }

    /// True when no partial code point is waiting for more bytes.
    fn is_drained(&self) -> bool {
        self.pending.is_empty()
    }

    fn feed(&mut self, bytes: &[u8]) -> Result<String, std::str::Utf8Error> {
        self.pending.extend_from_slice(bytes);
        match std::str::from_utf8(&self.pending) {
            Ok(text) => {
                let text = text.to_string();
                self.pending.clear();
                Ok(text)
            }
            Err(e) => {
                if e.error_len().is_some() {
                    // Malformed sequence, not a chunk-boundary artifact.
                    return Err(e);
                }
                let valid_up_to = e.valid_up_to();
                let text =
                    std::str::from_utf8(&self.pending[..valid_up_to])?.to_string();
                self.pending.drain(..valid_up_to);
                Ok(text)
            }
        }
    }
}
