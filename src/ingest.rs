//! Streaming JSONL import.
//!
//! An [`ImportWorker`] owns a background task that takes [`ImportRequest`]s
//! from an inbound queue, streams the URL, upserts every valid line into a
//! [`RecordStore`] and pushes [`WorkerMessage`]s onto an outbound queue.
//! Nothing is shared with the caller except the two queues.

use std::sync::Arc;

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Error;
use crate::record::parse_line;
use crate::store::RecordStore;

/// Maximum characters of an offending line echoed into the log.
const LOG_LINE_PREVIEW: usize = 120;

/// Tunables for an import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Emit a progress message every this many stored records. 0 disables
    /// intermediate progress.
    pub progress_interval: u64,
    /// `k` in the `processed / (processed + k)` estimate used when the
    /// server declares no content length.
    pub heuristic_offset: f64,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            progress_interval: 100,
            heuristic_offset: 100.0,
        }
    }
}

impl IngestConfig {
    /// `heuristic_offset` if it is a positive finite number, otherwise the
    /// default.
    pub fn effective_heuristic_offset(&self) -> f64 {
        if self.heuristic_offset.is_finite() && self.heuristic_offset > 0.0 {
            self.heuristic_offset
        } else {
            Self::default().heuristic_offset
        }
    }
}

/// Inbound message: import everything at `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub url: String,
}

impl ImportRequest {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportProgress {
    /// Always within `[0, 1]`.
    pub progress: f64,
    pub completed: bool,
    pub processed_items: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_items: Option<u64>,
}

impl ImportProgress {
    pub fn new(progress: f64, completed: bool, processed_items: u64) -> Self {
        Self {
            progress: progress.clamp(0.0, 1.0),
            completed,
            processed_items,
            total_items: None,
        }
    }
}

/// Terminal message of a run that could not be carried out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportFailure {
    pub error: String,
    pub completed: bool,
    pub progress: f64,
}

/// Outbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WorkerMessage {
    Failure(ImportFailure),
    Progress(ImportProgress),
}

impl WorkerMessage {
    pub fn failure(error: impl Into<String>) -> Self {
        WorkerMessage::Failure(ImportFailure {
            error: error.into(),
            completed: false,
            progress: 0.0,
        })
    }

    pub fn completed(processed_items: u64) -> Self {
        WorkerMessage::Progress(ImportProgress {
            total_items: Some(processed_items),
            ..ImportProgress::new(1.0, true, processed_items)
        })
    }

    /// Whether this is the last message of its run.
    pub fn is_terminal(&self) -> bool {
        match self {
            WorkerMessage::Failure(_) => true,
            WorkerMessage::Progress(p) => p.completed,
        }
    }

    pub fn progress(&self) -> f64 {
        match self {
            WorkerMessage::Failure(f) => f.progress,
            WorkerMessage::Progress(p) => p.progress,
        }
    }
}

/// Incremental UTF-8 decoder and newline splitter.
///
/// Partial multi-byte sequences at the end of a chunk are held back until the
/// next chunk completes them. Invalid sequences decode to U+FFFD.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
    text: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds a chunk and returns every completed, trimmed, non-blank line.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.decode(chunk);

        let Some(last_newline) = self.text.rfind('\n') else {
            return Vec::new();
        };
        let tail = self.text.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.text, tail);
        complete
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }

    /// Flushes the trailing fragment at end of stream.
    pub fn finish(&mut self) -> Option<String> {
        if !self.pending.is_empty() {
            self.pending.clear();
            self.text.push(char::REPLACEMENT_CHARACTER);
        }
        let rest = std::mem::take(&mut self.text);
        let line = rest.trim();
        (!line.is_empty()).then(|| line.to_string())
    }

    fn decode(&mut self, chunk: &[u8]) {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    rest = &[];
                    break;
                }
                Err(err) => {
                    let (valid, after) = rest.split_at(err.valid_up_to());
                    self.text.push_str(&String::from_utf8_lossy(valid));
                    match err.error_len() {
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        // Incomplete sequence at the end; wait for more bytes.
                        None => {
                            rest = after;
                            break;
                        }
                    }
                }
            }
        }
        self.pending = rest.to_vec();
    }
}

fn preview(line: &str) -> &str {
    match line.char_indices().nth(LOG_LINE_PREVIEW) {
        Some((idx, _)) => &line[..idx],
        None => line,
    }
}

/// Parses and stores one line. Failures are logged and reported as `false`.
async fn process_line<R>(line: &str, store: &R) -> bool
where
    R: RecordStore + ?Sized,
{
    let record = match parse_line(line) {
        Ok(record) => record,
        Err(err) => {
            warn!("skipping record: {} in line: {}", err, preview(line));
            return false;
        }
    };
    let key = record.fiction_id.clone();
    match store.put(record).await {
        Ok(()) => true,
        Err(err) => {
            warn!("skipping record '{}': {}", key, err);
            false
        }
    }
}

fn running_fraction(received: u64, content_length: u64, processed: u64, offset: f64) -> f64 {
    if content_length > 0 {
        received as f64 / content_length as f64
    } else {
        processed as f64 / (processed as f64 + offset)
    }
}

/// Drives one import over an already-open byte stream.
///
/// Emits intermediate progress every `config.progress_interval` stored
/// records and, when the stream ends cleanly, one terminal message. A
/// transport error mid-stream is returned without a terminal message.
pub async fn ingest_stream<S, E, R, F>(
    stream: S,
    content_length: u64,
    store: &R,
    config: &IngestConfig,
    mut emit: F,
) -> Result<u64, Error>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<Error>,
    R: RecordStore + ?Sized,
    F: FnMut(WorkerMessage),
{
    let mut stream = std::pin::pin!(stream);
    let mut assembler = LineAssembler::new();
    let mut received: u64 = 0;
    let mut processed: u64 = 0;
    let offset = config.effective_heuristic_offset();
    if offset != config.heuristic_offset {
        warn!(
            "heuristic_offset {} is not positive; using {}",
            config.heuristic_offset, offset
        );
    }

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(Into::into)?;
        received += chunk.len() as u64;
        debug!("chunk of {} bytes ({} / {})", chunk.len(), received, content_length);

        for line in assembler.push(&chunk) {
            if !process_line(&line, store).await {
                continue;
            }
            processed += 1;
            if config.progress_interval > 0 && processed % config.progress_interval == 0 {
                let fraction = running_fraction(received, content_length, processed, offset);
                emit(WorkerMessage::Progress(ImportProgress::new(fraction, false, processed)));
            }
        }
    }

    if let Some(line) = assembler.finish() {
        if process_line(&line, store).await {
            processed += 1;
        }
    }

    emit(WorkerMessage::completed(processed));
    Ok(processed)
}

async fn open(client: &reqwest::Client, url: &str) -> Result<reqwest::Response, Error> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(Error::HttpStatus {
            status,
            url: url.to_string(),
        });
    }
    Ok(response)
}

/// Runs one import end to end. Every outcome is reported through `emit`;
/// the returned count is only for the caller's convenience.
pub async fn run_import<R, F>(
    request: &ImportRequest,
    client: &reqwest::Client,
    store: &R,
    config: &IngestConfig,
    mut emit: F,
) -> Option<u64>
where
    R: RecordStore + ?Sized,
    F: FnMut(WorkerMessage),
{
    info!("importing records from {}", request.url);

    let response = match open(client, &request.url).await {
        Ok(response) => response,
        Err(err) => {
            error!("import of {} failed: {}", request.url, err);
            emit(WorkerMessage::failure(err.to_string()));
            return None;
        }
    };
    let content_length = response.content_length().unwrap_or(0);

    match ingest_stream(response.bytes_stream(), content_length, store, config, &mut emit).await {
        Ok(processed) => {
            info!("imported {} records from {}", processed, request.url);
            Some(processed)
        }
        Err(err) => {
            error!("import of {} failed: {}", request.url, err);
            emit(WorkerMessage::failure(err.to_string()));
            None
        }
    }
}

/// Spawns import workers.
pub struct ImportWorker;

impl ImportWorker {
    /// Starts a worker on the current tokio runtime.
    pub fn spawn<R>(store: Arc<R>, config: IngestConfig) -> ImportWorkerHandle
    where
        R: RecordStore + ?Sized + 'static,
    {
        Self::spawn_with_client(store, config, reqwest::Client::new())
    }

    pub fn spawn_with_client<R>(
        store: Arc<R>,
        config: IngestConfig,
        client: reqwest::Client,
    ) -> ImportWorkerHandle
    where
        R: RecordStore + ?Sized + 'static,
    {
        let (request_tx, mut request_rx) = mpsc::unbounded_channel::<ImportRequest>();
        let (message_tx, message_rx) = mpsc::unbounded_channel::<WorkerMessage>();

        let task = tokio::spawn(async move {
            // One import at a time, in arrival order.
            while let Some(request) = request_rx.recv().await {
                run_import(&request, &client, store.as_ref(), &config, |message| {
                    if message_tx.send(message).is_err() {
                        debug!("import message dropped: receiver closed");
                    }
                })
                .await;
            }
        });

        ImportWorkerHandle {
            requests: request_tx,
            messages: message_rx,
            task,
        }
    }
}

/// Caller side of an [`ImportWorker`].
///
/// Dropping the handle lets the worker finish its current import and exit.
pub struct ImportWorkerHandle {
    requests: mpsc::UnboundedSender<ImportRequest>,
    messages: mpsc::UnboundedReceiver<WorkerMessage>,
    task: JoinHandle<()>,
}

impl ImportWorkerHandle {
    /// Queues an import. Fire-and-forget: there is no acknowledgement.
    pub fn send(&self, request: ImportRequest) {
        if self.requests.send(request).is_err() {
            warn!("import worker has stopped; request dropped");
        }
    }

    /// Next outbound message, or `None` once the worker has exited.
    pub async fn recv(&mut self) -> Option<WorkerMessage> {
        self.messages.recv().await
    }

    /// Receives until the current run's terminal message.
    pub async fn recv_until_terminal(&mut self) -> Vec<WorkerMessage> {
        let mut out = Vec::new();
        while let Some(message) = self.recv().await {
            let terminal = message.is_terminal();
            out.push(message);
            if terminal {
                break;
            }
        }
        out
    }

    /// Stops the worker immediately. Records already written stay written.
    pub fn terminate(self) {
        self.task.abort();
    }
}
