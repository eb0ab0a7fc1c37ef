//! Destinations for lineage events.
//!
//! [`LineageSink`] receives events one at a time in emission order: for each
//! run, its START event then its terminal event.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use runlineage_types::lineage::RunEvent;
use runlineage_types::{LineageError, Result};
use tokio::io::AsyncWriteExt;

/// Environment variable holding the lineage endpoint's bearer token.
pub const API_KEY_ENV: &str = "MARQUEZ_API_KEY";

/// Default lineage collector endpoint.
pub const DEFAULT_LINEAGE_URL: &str = "http://localhost:5000/api/v1/lineage";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Consumer of lineage events.
#[allow(async_fn_in_trait)]
pub trait LineageSink {
    /// Deliver one event.
    ///
    /// # Errors
    ///
    /// Any error aborts the remaining deliveries.
    async fn emit(&mut self, event: &RunEvent) -> Result<()>;

    /// Flush anything buffered once all events are delivered.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error.
    async fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Deliver every `(start, terminal)` pair to `sink` in order, then finish it.
/// Returns the number of events delivered.
///
/// # Errors
///
/// Stops at the first delivery failure.
pub async fn publish_pairs<S: LineageSink>(sink: &mut S, pairs: &[(RunEvent, RunEvent)]) -> Result<usize> {
    let mut delivered = 0;
    for (start, terminal) in pairs {
        sink.emit(start).await?;
        sink.emit(terminal).await?;
        delivered += 2;
    }
    sink.finish().await?;
    Ok(delivered)
}

/// Writes one compact JSON object per line to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: tokio::io::BufWriter<tokio::fs::File>,
}

impl JsonLinesSink {
    /// Create (or truncate) `path`.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the file cannot be created.
    pub async fn create(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::create(path).await?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: tokio::io::BufWriter::new(file),
        })
    }
}

impl LineageSink for JsonLinesSink {
    async fn emit(&mut self, event: &RunEvent) -> Result<()> {
        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');
        self.writer.write_all(&line).await?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.writer.flush().await?;
        tracing::info!(path = %self.path.display(), "Wrote lineage events");
        Ok(())
    }
}

/// Prints one compact JSON object per line to a writer, stdout by default.
pub struct ConsoleSink<W> {
    out: W,
}

impl ConsoleSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> LineageSink for ConsoleSink<W> {
    async fn emit(&mut self, event: &RunEvent) -> Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

fn transport(err: reqwest::Error) -> LineageError {
    LineageError::Transport(Box::new(err))
}

/// POSTs each event as JSON to a lineage collector endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    url: String,
    token: Option<String>,
}

impl HttpSink {
    /// # Errors
    ///
    /// Returns [`LineageError::Transport`] if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            url: url.into(),
            token,
        })
    }

    /// Sink whose bearer token, if any, comes from [`API_KEY_ENV`].
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::Transport`] if the HTTP client cannot be built.
    pub fn from_env(url: impl Into<String>) -> Result<Self> {
        let token = std::env::var(API_KEY_ENV).ok().filter(|t| !t.is_empty());
        Self::new(url, token)
    }

    /// Request that [`emit`](LineageSink::emit) would send for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`LineageError::Transport`] if the request cannot be built.
    pub fn build_request(&self, event: &RunEvent) -> Result<reqwest::Request> {
        let mut request = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .json(event);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }
        request.build().map_err(transport)
    }
}

impl LineageSink for HttpSink {
    async fn emit(&mut self, event: &RunEvent) -> Result<()> {
        let request = self.build_request(event)?;
        let response = self.client.execute(request).await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LineageError::Publish {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            url = self.url,
            event_type = ?event.event_type,
            run_id = event.run.run_id,
            "Posted lineage event"
        );
        Ok(())
    }
}
