use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::call::capability::{
    AudioStream, Capability, CaptureError, Microphone, RecognitionStream, SpeechRecognizer,
    TranscriptEvent,
};
use crate::config::CallConfig;
use crate::extract::{ExtractError, ExtractionRules};
use crate::store::{CallLedger, CallRecord, LedgerReceipt, StoreError};

/// Call session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Idle,
    Dialing,
    Connected,
    Ended,
}

/// Errors from call session operations
#[derive(Debug, Error)]
pub enum CallError {
    /// Operation requires an open dial pad
    #[error("dial pad is not open")]
    NotDialing,

    /// Call-start invoked with no digits dialed
    #[error("no number dialed")]
    EmptyNumber,

    /// Operation requires an active call
    #[error("no active call")]
    NotConnected,

    /// Device acquisition failed during call-start
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// Ledger rejected or could not accept the call record
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One simulated emergency call: dial pad, live captures, transcript,
/// extraction and the terminal ledger write
///
/// The session exclusively owns the microphone stream, the recognizer
/// stream and the duration ticker; all three are released on normal end,
/// on call-start failure and on drop.
pub struct CallSession {
    phase: CallPhase,
    phone_number: String,
    status: String,
    final_transcript: String,
    interim: String,
    duration_secs: Arc<AtomicU64>,
    chunk_count: u64,
    config: CallConfig,
    rules: ExtractionRules,
    audio: Option<AudioStream>,
    recognition: Option<RecognitionStream>,
    ticker: Option<JoinHandle<()>>,
}

impl CallSession {
    /// Creates an idle session with the standard extraction rules
    ///
    /// # Errors
    /// Returns error if the built-in extraction patterns fail to compile
    pub fn new(config: CallConfig) -> Result<Self, ExtractError> {
        Ok(Self {
            phase: CallPhase::Idle,
            phone_number: String::new(),
            status: String::new(),
            final_transcript: String::new(),
            interim: String::new(),
            duration_secs: Arc::new(AtomicU64::new(0)),
            chunk_count: 0,
            config,
            rules: ExtractionRules::standard()?,
            audio: None,
            recognition: None,
            ticker: None,
        })
    }

    #[must_use]
    pub const fn phase(&self) -> CallPhase {
        self.phase
    }

    #[must_use]
    pub fn phone_number(&self) -> &str {
        &self.phone_number
    }

    #[must_use]
    pub fn status(&self) -> &str {
        &self.status
    }

    #[must_use]
    pub fn duration_secs(&self) -> u64 {
        self.duration_secs.load(Ordering::Relaxed)
    }

    /// Chunks received from the microphone so far
    #[must_use]
    pub const fn chunk_count(&self) -> u64 {
        self.chunk_count
    }

    /// Finalized transcript plus the current interim hypothesis
    #[must_use]
    pub fn live_transcript(&self) -> String {
        if self.interim.is_empty() {
            self.final_transcript.clone()
        } else if self.final_transcript.is_empty() {
            self.interim.clone()
        } else {
            format!("{} {}", self.final_transcript, self.interim)
        }
    }

    /// Opens the dial pad overlay; no-op unless idle
    pub fn open_dial_pad(&mut self) -> bool {
        if self.phase != CallPhase::Idle {
            debug!(phase = ?self.phase, "dial pad open ignored");
            return false;
        }
        self.phase = CallPhase::Dialing;
        self.status = "Dialing".to_owned();
        true
    }

    /// Appends one digit; rejects non-digits and appends past the cap
    pub fn press_digit(&mut self, digit: char) -> bool {
        if self.phase != CallPhase::Dialing {
            return false;
        }
        if !digit.is_ascii_digit() {
            debug!(%digit, "non-digit input rejected");
            return false;
        }
        if self.phone_number.len() >= self.config.max_digits {
            debug!(max = self.config.max_digits, "digit cap reached");
            return false;
        }
        self.phone_number.push(digit);
        true
    }

    /// Starts the call: acquires the microphone, starts the recognizer
    /// (degrading to recording-only if unsupported) and the duration ticker
    ///
    /// # Errors
    /// Returns error if no digits were dialed or the microphone is denied;
    /// on capture failure the session transitions to `Ended` with a
    /// descriptive status and everything acquired so far is released
    pub async fn start_call(
        &mut self,
        microphone: &dyn Microphone,
        recognizer: &dyn SpeechRecognizer,
    ) -> Result<(), CallError> {
        if self.phase != CallPhase::Dialing {
            return Err(CallError::NotDialing);
        }
        if self.phone_number.is_empty() {
            return Err(CallError::EmptyNumber);
        }

        match microphone.open().await {
            Ok(stream) => self.audio = Some(stream),
            Err(err) => {
                warn!(error = %err, "call-start failed");
                self.status = format!("Call failed: {err}");
                self.phase = CallPhase::Ended;
                self.release_resources();
                return Err(err.into());
            }
        }

        match recognizer.start() {
            Capability::Available(stream) => {
                self.recognition = Some(stream);
                self.status = "Connected - listening".to_owned();
            }
            Capability::Unavailable(reason) => {
                warn!(%reason, "speech recognition unavailable, recording only");
                self.status = format!("Connected - recording only ({reason})");
            }
        }

        self.duration_secs.store(0, Ordering::Relaxed);
        let duration = Arc::clone(&self.duration_secs);
        self.ticker = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));
            interval.tick().await;
            loop {
                interval.tick().await;
                duration.fetch_add(1, Ordering::Relaxed);
            }
        }));

        self.phase = CallPhase::Connected;
        info!(number = %self.phone_number, "call connected");
        Ok(())
    }

    /// Drains pending capture events in arrival order
    ///
    /// Interim results replace the current hypothesis; final results append
    /// to the transcript; recognition errors become status text and the
    /// session continues.
    pub fn pump_events(&mut self) {
        if let Some(audio) = self.audio.as_mut() {
            while let Ok(chunk) = audio.chunks.try_recv() {
                self.chunk_count += 1;
                debug!(seq = chunk.seq, bytes = chunk.bytes.len(), "audio chunk");
            }
        }

        if let Some(recognition) = self.recognition.as_mut() {
            while let Ok(event) = recognition.events.try_recv() {
                match event {
                    TranscriptEvent::Interim(text) => self.interim = text,
                    TranscriptEvent::Final(text) => {
                        if !self.final_transcript.is_empty() {
                            self.final_transcript.push(' ');
                        }
                        self.final_transcript.push_str(&text);
                        self.interim.clear();
                    }
                    TranscriptEvent::Error(message) => {
                        warn!(%message, "recognition error");
                        self.status = format!("Recognition error: {message}");
                    }
                }
            }
        }
    }

    /// Ends the call: releases all captures, stops the ticker, extracts
    /// fields from the final transcript and stores the record
    ///
    /// When extraction yields no usable name the record is flagged
    /// `from_recording` and carries the raw transcript, so the audio stays
    /// the authoritative source. An in-flight store call is not cancelled
    /// by a later teardown.
    ///
    /// # Errors
    /// Returns error if no call is active or the ledger write fails;
    /// resources are released either way
    pub async fn end_call(&mut self, ledger: &dyn CallLedger) -> Result<LedgerReceipt, CallError> {
        if self.phase != CallPhase::Connected {
            return Err(CallError::NotConnected);
        }

        // Latest snapshot before the producers go away
        self.pump_events();
        self.release_resources();

        self.phase = CallPhase::Ended;
        let duration = self.duration_secs();
        self.status = format!("Call ended ({duration}s)");

        let fields = self.rules.extract(&self.final_transcript);
        let from_recording = !fields.has_name();
        if from_recording {
            info!("no caller name extracted, full recording available");
        }

        let record = CallRecord {
            fields,
            phone_number: self.phone_number.clone(),
            duration_secs: duration,
            from_recording,
        };

        let receipt = ledger.store_call_record(&record).await?;
        info!(
            transaction_id = %receipt.transaction_id,
            duration_secs = duration,
            "call record stored"
        );
        Ok(receipt)
    }

    /// Returns an ended (or failed) session to idle, clearing all call state
    pub fn reset(&mut self) {
        self.release_resources();
        self.phase = CallPhase::Idle;
        self.phone_number.clear();
        self.status.clear();
        self.final_transcript.clear();
        self.interim.clear();
        self.duration_secs.store(0, Ordering::Relaxed);
        self.chunk_count = 0;
    }

    fn release_resources(&mut self) {
        if let Some(mut audio) = self.audio.take() {
            audio.control.stop();
        }
        if let Some(mut recognition) = self.recognition.take() {
            recognition.control.stop();
        }
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl Drop for CallSession {
    fn drop(&mut self) {
        self.release_resources();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::capability::{SimulatedMicrophone, SimulatedRecognizer};
    use crate::store::SimulatedLedger;

    fn session() -> CallSession {
        CallSession::new(CallConfig::default()).unwrap()
    }

    fn scripted_recognizer(lines: &[&str]) -> SimulatedRecognizer {
        let script = lines
            .iter()
            .map(|line| TranscriptEvent::Final((*line).to_owned()))
            .collect();
        SimulatedRecognizer::new(script, Duration::from_millis(1))
    }

    #[test]
    fn test_open_dial_pad_only_from_idle() {
        let mut session = session();
        assert_eq!(session.phase(), CallPhase::Idle);
        assert!(session.open_dial_pad());
        assert_eq!(session.phase(), CallPhase::Dialing);
        assert!(!session.open_dial_pad());
    }

    #[test]
    fn test_digits_capped_at_max() {
        let mut session = session();
        session.open_dial_pad();

        for _ in 0..20 {
            session.press_digit('9');
        }
        assert_eq!(session.phone_number().len(), 15);

        // Appending beyond the cap is a no-op
        assert!(!session.press_digit('1'));
        assert_eq!(session.phone_number().len(), 15);
    }

    #[test]
    fn test_non_digit_rejected() {
        let mut session = session();
        session.open_dial_pad();
        assert!(!session.press_digit('x'));
        assert!(!session.press_digit('#'));
        assert!(session.press_digit('0'));
        assert_eq!(session.phone_number(), "0");
    }

    #[test]
    fn test_digits_ignored_when_idle() {
        let mut session = session();
        assert!(!session.press_digit('1'));
        assert_eq!(session.phone_number(), "");
    }

    #[tokio::test]
    async fn test_start_call_requires_digits() {
        let mut session = session();
        session.open_dial_pad();

        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let recognizer = scripted_recognizer(&[]);
        let result = session.start_call(&mic, &recognizer).await;
        assert!(matches!(result, Err(CallError::EmptyNumber)));
        assert_eq!(session.phase(), CallPhase::Dialing);
    }

    #[tokio::test]
    async fn test_mic_denied_ends_call_with_status() {
        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');

        let mic = SimulatedMicrophone::denied();
        let recognizer = scripted_recognizer(&[]);
        let result = session.start_call(&mic, &recognizer).await;

        assert!(matches!(
            result,
            Err(CallError::Capture(CaptureError::PermissionDenied(_)))
        ));
        assert_eq!(session.phase(), CallPhase::Ended);
        assert!(session.status().contains("Call failed"));

        session.reset();
        assert_eq!(session.phase(), CallPhase::Idle);
        assert_eq!(session.phone_number(), "");
    }

    #[tokio::test]
    async fn test_unsupported_recognizer_degrades_to_recording() {
        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');
        session.press_digit('1');
        session.press_digit('1');

        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let recognizer = SimulatedRecognizer::unsupported();
        session.start_call(&mic, &recognizer).await.unwrap();

        assert_eq!(session.phase(), CallPhase::Connected);
        assert!(session.status().contains("recording only"));

        // Audio still flows without the recognizer
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.pump_events();
        assert!(session.chunk_count() > 0);
    }

    #[tokio::test]
    async fn test_transcript_applied_in_arrival_order() {
        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');

        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let script = vec![
            TranscriptEvent::Interim("my na".to_owned()),
            TranscriptEvent::Final("my name is Ravi".to_owned()),
            TranscriptEvent::Interim("there is".to_owned()),
            TranscriptEvent::Final("there is a fire".to_owned()),
        ];
        let recognizer = SimulatedRecognizer::new(script, Duration::from_millis(1));
        session.start_call(&mic, &recognizer).await.unwrap();

        tokio::time::sleep(Duration::from_millis(20)).await;
        session.pump_events();

        assert_eq!(session.live_transcript(), "my name is Ravi there is a fire");
    }

    #[tokio::test]
    async fn test_interim_shown_until_finalized() {
        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');

        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let script = vec![TranscriptEvent::Interim("hel".to_owned())];
        let recognizer = SimulatedRecognizer::new(script, Duration::from_millis(1));
        session.start_call(&mic, &recognizer).await.unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        session.pump_events();
        assert_eq!(session.live_transcript(), "hel");
    }

    #[tokio::test]
    async fn test_recognition_error_surfaces_and_continues() {
        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');

        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let script = vec![
            TranscriptEvent::Error("network hiccup".to_owned()),
            TranscriptEvent::Final("still here".to_owned()),
        ];
        let recognizer = SimulatedRecognizer::new(script, Duration::from_millis(1));
        session.start_call(&mic, &recognizer).await.unwrap();

        tokio::time::sleep(Duration::from_millis(15)).await;
        session.pump_events();

        assert!(session.status().contains("network hiccup"));
        assert_eq!(session.phase(), CallPhase::Connected);
        assert_eq!(session.live_transcript(), "still here");
    }

    #[tokio::test(start_paused = true)]
    async fn test_duration_ticks_while_connected() {
        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');

        let mic = SimulatedMicrophone::new(Duration::from_millis(100));
        let recognizer = scripted_recognizer(&[]);
        session.start_call(&mic, &recognizer).await.unwrap();

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(session.duration_secs() >= 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_call_stops_ticker_and_captures() {
        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');
        session.press_digit('1');

        let mic = SimulatedMicrophone::new(Duration::from_millis(100));
        let recognizer = scripted_recognizer(&["my name is John Smith"]);
        session.start_call(&mic, &recognizer).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;

        let ledger = SimulatedLedger::new(Duration::from_millis(0));
        session.end_call(&ledger).await.unwrap();
        assert_eq!(session.phase(), CallPhase::Ended);

        // Duration frozen and no further data-available events after end
        let frozen_duration = session.duration_secs();
        let frozen_chunks = session.chunk_count();
        tokio::time::sleep(Duration::from_secs(5)).await;
        session.pump_events();
        assert_eq!(session.duration_secs(), frozen_duration);
        assert_eq!(session.chunk_count(), frozen_chunks);
    }

    #[tokio::test]
    async fn test_end_call_without_active_call() {
        let mut session = session();
        let ledger = SimulatedLedger::new(Duration::from_millis(0));
        let result = session.end_call(&ledger).await;
        assert!(matches!(result, Err(CallError::NotConnected)));
    }

    #[tokio::test]
    async fn test_end_call_extracts_and_stores() {
        let mut session = session();
        session.open_dial_pad();
        for digit in "5551234".chars() {
            session.press_digit(digit);
        }

        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let recognizer = scripted_recognizer(&[
            "my name is John Smith at Park Street, report a theft, my number is 555-123-4567",
        ]);
        session.start_call(&mic, &recognizer).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ledger = SimulatedLedger::new(Duration::from_millis(0));
        let receipt = session.end_call(&ledger).await.unwrap();
        assert!(receipt.transaction_id.starts_with("0x"));
        assert!(session.status().contains("Call ended"));
    }

    #[tokio::test]
    async fn test_fallback_record_when_no_name() {
        use std::sync::Mutex;

        struct RecordingLedger {
            last: Mutex<Option<CallRecord>>,
        }

        #[async_trait::async_trait]
        impl CallLedger for RecordingLedger {
            async fn store_call_record(
                &self,
                record: &CallRecord,
            ) -> Result<LedgerReceipt, StoreError> {
                *self.last.lock().unwrap() = Some(record.clone());
                Ok(LedgerReceipt {
                    transaction_id: "0xtest".to_owned(),
                })
            }
        }

        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');

        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let recognizer = scripted_recognizer(&["please come quickly something is wrong"]);
        session.start_call(&mic, &recognizer).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ledger = RecordingLedger {
            last: Mutex::new(None),
        };
        session.end_call(&ledger).await.unwrap();

        let record = ledger.last.lock().unwrap().clone().unwrap();
        assert!(record.from_recording);
        assert_eq!(record.fields.name, crate::extract::UNKNOWN);
        assert_eq!(
            record.fields.raw_description,
            "please come quickly something is wrong"
        );
    }

    #[tokio::test]
    async fn test_reset_returns_fresh_session() {
        let mut session = session();
        session.open_dial_pad();
        session.press_digit('9');

        let mic = SimulatedMicrophone::new(Duration::from_millis(1));
        let recognizer = scripted_recognizer(&["hello"]);
        session.start_call(&mic, &recognizer).await.unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let ledger = SimulatedLedger::new(Duration::from_millis(0));
        session.end_call(&ledger).await.unwrap();

        session.reset();
        assert_eq!(session.phase(), CallPhase::Idle);
        assert_eq!(session.phone_number(), "");
        assert_eq!(session.duration_secs(), 0);
        assert_eq!(session.live_transcript(), "");
        assert_eq!(session.chunk_count(), 0);
    }
}
