//! Scripted fetcher and sink writers for driving pipelines without a network
//! or a disk.

use std::collections::HashMap;
use std::io::{self, Write};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::http::{FetchFailure, FetchResult, Fetcher};
use crate::sink::SinkWriter;

/// Returns canned results per URL and records the order of calls.
#[derive(Default)]
pub struct ScriptedFetcher {
    responses: HashMap<String, FetchResult>,
    delays: HashMap<String, Duration>,
    trace: Mutex<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn body(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn failure(mut self, url: &str, failure: FetchFailure) -> Self {
        self.responses.insert(url.to_string(), Err(failure));
        self
    }

    pub fn delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_string(), delay);
        self
    }

    /// `start:{url}` / `end:{url}` events in the order they happened.
    pub fn trace(&self) -> Vec<String> {
        self.trace.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _timeout: Option<Duration>) -> FetchResult {
        self.trace.lock().unwrap().push(format!("start:{}", url));
        if let Some(delay) = self.delays.get(url) {
            tokio::time::sleep(*delay).await;
        }
        self.trace.lock().unwrap().push(format!("end:{}", url));

        self.responses
            .get(url)
            .cloned()
            .unwrap_or(Err(FetchFailure::NonOkStatus(404)))
    }
}

/// Discards bytes; the sync after the first `syncs` successful ones fails.
pub struct FailingWriter {
    syncs_left: usize,
}

impl FailingWriter {
    pub fn after_syncs(syncs: usize) -> Self {
        Self { syncs_left: syncs }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SinkWriter for FailingWriter {
    fn sync(&mut self) -> io::Result<()> {
        match self.syncs_left.checked_sub(1) {
            Some(left) => {
                self.syncs_left = left;
                Ok(())
            }
            None => Err(io::Error::other("no space left on device")),
        }
    }
}
