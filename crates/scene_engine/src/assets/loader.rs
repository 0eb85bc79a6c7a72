//! Asynchronous model loading
//!
//! Each request is parsed on its own worker thread. Workers only read files and
//! parse bytes; the parsed [`ImportedModel`] is sent back over a channel and the
//! session thread instantiates it into the scene. Every request carries the
//! generation of the submission that issued it so the session can discard
//! completions that arrive after a newer submission.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use crate::assets::{parse_model, AssetError, ImportedModel, MeshFormat};
use crate::config::AssetConfig;

/// Identifies one load request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LoadTicket(pub u64);

/// Where the model bytes come from
#[derive(Debug, Clone, PartialEq)]
pub enum LoadSource {
    /// Bytes already in memory (file submissions)
    Bytes(Vec<u8>),
    /// Path resolved against the asset search paths (script loads)
    Path(String),
}

/// A model to load under a caller-chosen name
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Registry name the model is attached under
    pub name: String,
    /// Declared format
    pub format: MeshFormat,
    /// Byte source
    pub source: LoadSource,
    /// Submission generation that issued the request
    pub generation: u64,
}

/// Result of a finished load
#[derive(Debug)]
pub struct LoadCompletion {
    /// Ticket returned by [`AssetLoader::submit`]
    pub ticket: LoadTicket,
    /// Registry name
    pub name: String,
    /// Declared format
    pub format: MeshFormat,
    /// Submission generation that issued the request
    pub generation: u64,
    /// Parsed model or the failure
    pub result: Result<ImportedModel, AssetError>,
}

/// Dispatches load requests to worker threads
#[derive(Debug)]
pub struct AssetLoader {
    search_paths: Arc<Vec<PathBuf>>,
    sender: Sender<LoadCompletion>,
    receiver: Receiver<LoadCompletion>,
    next_ticket: u64,
    in_flight: usize,
}

impl AssetLoader {
    /// Create a loader with the configured search paths
    pub fn new(config: &AssetConfig) -> Self {
        let (sender, receiver) = unbounded();
        Self {
            search_paths: Arc::new(config.search_paths.iter().map(PathBuf::from).collect()),
            sender,
            receiver,
            next_ticket: 0,
            in_flight: 0,
        }
    }

    /// Find `path` under the search paths, falling back to the path itself
    pub fn resolve_path(search_paths: &[PathBuf], path: &str) -> Result<PathBuf, AssetError> {
        let candidate = Path::new(path);
        if candidate.is_absolute() && candidate.is_file() {
            return Ok(candidate.to_path_buf());
        }
        search_paths
            .iter()
            .map(|base| base.join(path))
            .chain(std::iter::once(candidate.to_path_buf()))
            .find(|full| full.is_file())
            .ok_or_else(|| AssetError::NotFound(path.to_string()))
    }

    /// Start a load on a worker thread
    pub fn submit(&mut self, request: LoadRequest) -> LoadTicket {
        let ticket = LoadTicket(self.next_ticket);
        self.next_ticket += 1;
        self.in_flight += 1;

        log::info!("Loading '{}' ({}), ticket {}", request.name, request.format, ticket.0);
        let sender = self.sender.clone();
        let search_paths = Arc::clone(&self.search_paths);
        thread::spawn(move || {
            let LoadRequest { name, format, source, generation } = request;
            let result = match source {
                LoadSource::Bytes(bytes) => parse_model(&bytes, format),
                LoadSource::Path(path) => Self::resolve_path(&search_paths, &path)
                    .and_then(|full| std::fs::read(full).map_err(AssetError::from))
                    .and_then(|bytes| parse_model(&bytes, format)),
            };
            // The receiver lives as long as the loader; a closed channel means teardown.
            let _ = sender.send(LoadCompletion { ticket, name, format, generation, result });
        });
        ticket
    }

    /// Completions that arrived since the last poll, without blocking
    pub fn poll(&mut self) -> Vec<LoadCompletion> {
        let completions: Vec<LoadCompletion> = self.receiver.try_iter().collect();
        self.in_flight = self.in_flight.saturating_sub(completions.len());
        completions
    }

    /// Block for the next completion up to `timeout`
    pub fn wait(&mut self, timeout: Duration) -> Option<LoadCompletion> {
        if self.in_flight == 0 {
            return None;
        }
        match self.receiver.recv_timeout(timeout) {
            Ok(completion) => {
                self.in_flight -= 1;
                Some(completion)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Requests submitted but not yet collected
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIANGLE: &[u8] = b"v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";

    fn request(name: &str, source: LoadSource) -> LoadRequest {
        LoadRequest {
            name: name.to_string(),
            format: MeshFormat::Obj,
            source,
            generation: 7,
        }
    }

    #[test]
    fn test_bytes_load_completes_with_generation() {
        let mut loader = AssetLoader::new(&AssetConfig::default());
        let ticket = loader.submit(request("tri", LoadSource::Bytes(TRIANGLE.to_vec())));

        let completion = loader.wait(Duration::from_secs(10)).unwrap();

        assert_eq!(completion.ticket, ticket);
        assert_eq!(completion.generation, 7);
        assert_eq!(completion.result.unwrap().triangle_count(), 1);
        assert_eq!(loader.in_flight(), 0);
    }

    #[test]
    fn test_path_load_uses_search_paths() {
        let dir = std::env::temp_dir().join("scene_engine_loader_test");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("tri.obj"), TRIANGLE).unwrap();
        let config = AssetConfig {
            search_paths: vec![dir.to_string_lossy().to_string()],
        };
        let mut loader = AssetLoader::new(&config);

        loader.submit(request("tri", LoadSource::Path("tri.obj".to_string())));
        let completion = loader.wait(Duration::from_secs(10)).unwrap();
        let _ = std::fs::remove_dir_all(&dir);

        assert!(completion.result.is_ok());
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let mut loader = AssetLoader::new(&AssetConfig { search_paths: Vec::new() });
        loader.submit(request("ghost", LoadSource::Path("does/not/exist.obj".to_string())));

        let completion = loader.wait(Duration::from_secs(10)).unwrap();
        assert!(matches!(completion.result, Err(AssetError::NotFound(_))));
    }

    #[test]
    fn test_wait_without_requests_returns_immediately() {
        let mut loader = AssetLoader::new(&AssetConfig::default());
        assert!(loader.wait(Duration::from_secs(60)).is_none());
        assert!(loader.poll().is_empty());
    }
}
