use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Result of probing an ambient host capability
pub enum Capability<T> {
    /// Capability present, handle ready to use
    Available(T),
    /// Capability absent, with a human-readable reason
    Unavailable(String),
}

/// Errors acquiring a capture device
#[derive(Debug, Error)]
pub enum CaptureError {
    /// User or platform denied access
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No usable device present
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),
}

/// One block of captured audio
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Monotonic chunk counter within a capture
    pub seq: u64,
    /// Raw sample bytes
    pub bytes: Vec<u8>,
}

/// Speech recognition listener output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptEvent {
    /// Partial hypothesis, replaced by later events
    Interim(String),
    /// Finalized segment, appended to the transcript
    Final(String),
    /// Runtime recognition error; the session continues
    Error(String),
}

/// Controls a live capture producer
///
/// Stopping must be idempotent; producers emit nothing after `stop`.
pub trait CaptureControl: Send {
    fn stop(&mut self);
}

/// Live microphone stream: audio chunks plus the control that releases it
pub struct AudioStream {
    pub chunks: mpsc::Receiver<AudioChunk>,
    pub control: Box<dyn CaptureControl>,
}

/// Live recognition stream: transcript events plus the releasing control
pub struct RecognitionStream {
    pub events: mpsc::Receiver<TranscriptEvent>,
    pub control: Box<dyn CaptureControl>,
}

/// Microphone access, abstracted so the pipeline runs without a real device
#[async_trait]
pub trait Microphone: Send + Sync {
    /// Request access and start a capture stream
    ///
    /// # Errors
    /// Returns error if permission is denied or no device exists
    async fn open(&self) -> Result<AudioStream, CaptureError>;
}

/// Platform speech-to-text service; optional, sessions degrade without it
pub trait SpeechRecognizer: Send + Sync {
    /// Probe for support and start a continuous listener
    fn start(&self) -> Capability<RecognitionStream>;
}

/// Task-backed control: clears the live flag and aborts the producer task
struct TaskControl {
    live: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl CaptureControl for TaskControl {
    fn stop(&mut self) {
        self.live.store(false, Ordering::Relaxed);
        if let Some(task) = self.task.take() {
            task.abort();
            debug!("capture producer stopped");
        }
    }
}

impl Drop for TaskControl {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Simulated microphone emitting fixed-size silent chunks on a timer
pub struct SimulatedMicrophone {
    permission_granted: bool,
    chunk_interval: Duration,
}

impl SimulatedMicrophone {
    #[must_use]
    pub const fn new(chunk_interval: Duration) -> Self {
        Self {
            permission_granted: true,
            chunk_interval,
        }
    }

    /// Microphone whose permission prompt was declined
    #[must_use]
    pub const fn denied() -> Self {
        Self {
            permission_granted: false,
            chunk_interval: Duration::from_millis(100),
        }
    }
}

#[async_trait]
impl Microphone for SimulatedMicrophone {
    async fn open(&self) -> Result<AudioStream, CaptureError> {
        if !self.permission_granted {
            return Err(CaptureError::PermissionDenied(
                "microphone access denied by user".to_owned(),
            ));
        }

        let (tx, rx) = mpsc::channel(64);
        let live = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&live);
        let interval = self.chunk_interval;

        let task = tokio::spawn(async move {
            let mut seq = 0_u64;
            loop {
                tokio::time::sleep(interval).await;
                // Flag gates emission so nothing fires after stop
                if !flag.load(Ordering::Relaxed) {
                    break;
                }
                let chunk = AudioChunk {
                    seq,
                    bytes: vec![0_u8; 320],
                };
                if tx.send(chunk).await.is_err() {
                    break;
                }
                seq += 1;
            }
        });

        debug!("simulated microphone opened");
        Ok(AudioStream {
            chunks: rx,
            control: Box::new(TaskControl {
                live,
                task: Some(task),
            }),
        })
    }
}

/// Simulated recognizer replaying a scripted event sequence
pub struct SimulatedRecognizer {
    supported: bool,
    script: Vec<TranscriptEvent>,
    event_interval: Duration,
}

impl SimulatedRecognizer {
    #[must_use]
    pub const fn new(script: Vec<TranscriptEvent>, event_interval: Duration) -> Self {
        Self {
            supported: true,
            script,
            event_interval,
        }
    }

    /// Recognizer on a platform without speech-to-text support
    #[must_use]
    pub const fn unsupported() -> Self {
        Self {
            supported: false,
            script: Vec::new(),
            event_interval: Duration::from_millis(0),
        }
    }
}

impl SpeechRecognizer for SimulatedRecognizer {
    fn start(&self) -> Capability<RecognitionStream> {
        if !self.supported {
            return Capability::Unavailable(
                "speech recognition not supported on this platform".to_owned(),
            );
        }

        let (tx, rx) = mpsc::channel(64);
        let live = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&live);
        let script = self.script.clone();
        let interval = self.event_interval;

        let task = tokio::spawn(async move {
            for event in script {
                tokio::time::sleep(interval).await;
                if !flag.load(Ordering::Relaxed) {
                    break;
                }
                if tx.send(event).await.is_err() {
                    break;
                }
            }
        });

        debug!("simulated recognizer started");
        Capability::Available(RecognitionStream {
            events: rx,
            control: Box::new(TaskControl {
                live,
                task: Some(task),
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_denied_microphone_errors() {
        let mic = SimulatedMicrophone::denied();
        let result = mic.open().await;
        assert!(matches!(result, Err(CaptureError::PermissionDenied(_))));
    }

    #[tokio::test]
    async fn test_microphone_emits_sequential_chunks() {
        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let mut stream = mic.open().await.unwrap();

        let first = stream.chunks.recv().await.unwrap();
        let second = stream.chunks.recv().await.unwrap();
        assert_eq!(first.seq, 0);
        assert_eq!(second.seq, 1);
        assert!(!first.bytes.is_empty());

        stream.control.stop();
    }

    #[tokio::test]
    async fn test_stop_halts_chunk_emission() {
        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let mut stream = mic.open().await.unwrap();

        let _ = stream.chunks.recv().await.unwrap();
        stream.control.stop();

        // Drain whatever was already buffered; the channel must then close
        while stream.chunks.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(stream.chunks.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsupported_recognizer_degrades() {
        let recognizer = SimulatedRecognizer::unsupported();
        match recognizer.start() {
            Capability::Unavailable(reason) => {
                assert!(reason.contains("not supported"));
            }
            Capability::Available(_) => panic!("expected unavailable"),
        }
    }

    #[tokio::test]
    async fn test_recognizer_replays_script_in_order() {
        let script = vec![
            TranscriptEvent::Interim("my na".to_owned()),
            TranscriptEvent::Final("my name is Ravi".to_owned()),
        ];
        let recognizer = SimulatedRecognizer::new(script.clone(), Duration::from_millis(1));

        let Capability::Available(mut stream) = recognizer.start() else {
            panic!("expected available");
        };

        assert_eq!(stream.events.recv().await.unwrap(), script[0]);
        assert_eq!(stream.events.recv().await.unwrap(), script[1]);
        stream.control.stop();
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let mut stream = mic.open().await.unwrap();
        stream.control.stop();
        stream.control.stop();
    }
}
