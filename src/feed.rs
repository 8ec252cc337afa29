//! Snapshot feeds
//!
//! Retrieval runs on a background thread and never blocks the render loop.
//! Results arrive over a channel that the loop drains once per tick, keeping
//! only the newest. Dropping the `Feed` clears its liveness flag; a fetch that
//! completes afterwards is discarded instead of delivered.

use crate::config::FeedConfig;
use crate::error::FeedError;
use crate::observation::Snapshot;
use rumqttc::{Client, Connection, Event, MqttOptions, Packet, QoS};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

pub type FetchResult = Result<Snapshot, FeedError>;

const DEFAULT_PORT: u16 = 1883;
const CLIENT_ID: &str = "weatherfield";
/// Granularity at which a sleeping poller notices it was dropped
const SLEEP_SLICE: Duration = Duration::from_millis(50);
const MQTT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Anything that can produce the latest observation snapshot
pub trait SnapshotSource: Send {
    fn fetch_latest(&mut self) -> FetchResult;
}

/// Reads a JSON snapshot file on every fetch
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl SnapshotSource for FileSource {
    fn fetch_latest(&mut self) -> FetchResult {
        Snapshot::load(&self.path)
    }
}

/// Sending half of a manual feed
#[derive(Clone)]
pub struct FeedHandle {
    sender: Sender<FetchResult>,
    alive: Arc<AtomicBool>,
}

impl FeedHandle {
    /// Deliver a result. Returns false, dropping it, once the feed is gone.
    pub fn push(&self, result: FetchResult) -> bool {
        if !self.alive.load(Ordering::Acquire) {
            return false;
        }
        self.sender.send(result).is_ok()
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }
}

/// Receiving end of a snapshot source
pub struct Feed {
    receiver: Receiver<FetchResult>,
    alive: Arc<AtomicBool>,
    client: Option<Client>,
    disconnect_reported: Cell<bool>,
    _thread: Option<thread::JoinHandle<()>>,
}

impl Feed {
    fn with_parts(
        receiver: Receiver<FetchResult>,
        alive: Arc<AtomicBool>,
        client: Option<Client>,
        thread: Option<thread::JoinHandle<()>>,
    ) -> Self {
        Self {
            receiver,
            alive,
            client,
            disconnect_reported: Cell::new(false),
            _thread: thread,
        }
    }

    /// Feed driven by hand through the returned handle
    pub fn manual() -> (Self, FeedHandle) {
        let (sender, receiver) = mpsc::channel();
        let alive = Arc::new(AtomicBool::new(true));
        let handle = FeedHandle {
            sender,
            alive: Arc::clone(&alive),
        };
        (Self::with_parts(receiver, alive, None, None), handle)
    }

    /// Fetch from `source` now and then every `interval` on a background thread
    pub fn spawn_polling(mut source: impl SnapshotSource + 'static, interval: Duration) -> Self {
        let (sender, receiver) = mpsc::channel();
        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);

        let handle = thread::spawn(move || {
            while flag.load(Ordering::Acquire) {
                let result = source.fetch_latest();
                if !flag.load(Ordering::Acquire) || sender.send(result).is_err() {
                    break;
                }
                sleep_while_alive(&flag, interval);
            }
            debug!("snapshot poller stopped");
        });

        Self::with_parts(receiver, alive, None, Some(handle))
    }

    /// Subscribe to `topic`; every publish carries one snapshot as JSON.
    /// Fails immediately if the broker cannot be reached.
    pub fn mqtt(host: &str, port: u16, topic: &str) -> Result<Self, FeedError> {
        let port = if port == 0 { DEFAULT_PORT } else { port };
        let mut options = MqttOptions::new(CLIENT_ID, host, port);
        options.set_keep_alive(Duration::from_secs(30));
        // The default 10 KiB packet limit is too small for a snapshot
        options.set_max_packet_size(16 * 1024 * 1024, 16 * 1024 * 1024);

        let (client, mut connection) = Client::new(options, 10);
        client
            .subscribe(topic, QoS::AtMostOnce)
            .map_err(|e| FeedError::Mqtt(format!("failed to subscribe to '{}': {}", topic, e)))?;

        // Poll once so an unreachable broker fails fast
        match connection.iter().next() {
            Some(Ok(_)) => {},
            Some(Err(e)) => {
                return Err(FeedError::Mqtt(format!(
                    "failed to connect to {}:{}: {}",
                    host, port, e
                )));
            },
            None => {
                return Err(FeedError::Mqtt(format!(
                    "failed to connect to {}:{}: connection closed",
                    host, port
                )));
            },
        }

        let (sender, receiver) = mpsc::channel();
        let alive = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&alive);
        let topic_owned = topic.to_string();

        let handle = thread::spawn(move || {
            message_loop(connection, &sender, &flag, &topic_owned);
        });

        info!(host, port, topic, "subscribed to snapshot topic");
        Ok(Self::with_parts(receiver, alive, Some(client), Some(handle)))
    }

    /// Start whatever `config` describes; None when no feed is configured
    pub fn from_config(config: &FeedConfig) -> Result<Option<Self>, FeedError> {
        match config {
            FeedConfig::File {
                path,
                interval_secs,
            } => {
                let interval = Duration::from_secs_f32((*interval_secs).max(0.1));
                info!(path = %path.display(), ?interval, "polling snapshot file");
                Ok(Some(Self::spawn_polling(FileSource::new(path), interval)))
            },
            FeedConfig::Mqtt { host, port, topic } => Self::mqtt(host, *port, topic).map(Some),
            FeedConfig::None => Ok(None),
        }
    }

    /// Newest result since the last poll (non-blocking), discarding older ones.
    /// A closed channel is reported once as `Disconnected`.
    pub fn poll(&self) -> Option<FetchResult> {
        let mut latest = None;
        loop {
            match self.receiver.try_recv() {
                Ok(result) => latest = Some(result),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    if latest.is_none() && !self.disconnect_reported.replace(true) {
                        latest = Some(Err(FeedError::Disconnected));
                    }
                    break;
                },
            }
        }
        latest
    }
}

impl Drop for Feed {
    fn drop(&mut self) {
        self.alive.store(false, Ordering::Release);
        if let Some(client) = &self.client {
            // Wakes the message loop so its thread can exit
            let _ = client.disconnect();
        }
    }
}

fn sleep_while_alive(flag: &AtomicBool, total: Duration) {
    let mut left = total;
    while !left.is_zero() && flag.load(Ordering::Acquire) {
        let slice = left.min(SLEEP_SLICE);
        thread::sleep(slice);
        left -= slice;
    }
}

fn message_loop(
    mut connection: Connection,
    sender: &Sender<FetchResult>,
    alive: &AtomicBool,
    topic: &str,
) {
    for event in connection.iter() {
        if !alive.load(Ordering::Acquire) {
            break;
        }
        match event {
            Ok(Event::Incoming(Packet::Publish(publish))) if publish.topic == topic => {
                let result = std::str::from_utf8(&publish.payload)
                    .map_err(|e| FeedError::Mqtt(format!("payload is not UTF-8: {}", e)))
                    .and_then(|text| Snapshot::from_json(text.trim()));
                if sender.send(result).is_err() {
                    break;
                }
            },
            Ok(_) => {},
            Err(e) => {
                warn!(error = %e, "MQTT connection error");
                if sender.send(Err(FeedError::Mqtt(e.to_string()))).is_err() {
                    break;
                }
                // The connection retries on the next iteration
                thread::sleep(MQTT_RETRY_DELAY);
            },
        }
    }
    debug!("MQTT message loop stopped");
}
