/// Capture capability traits and simulated devices
pub mod capability;
/// Call session state machine
pub mod session;

pub use capability::{Capability, Microphone, SpeechRecognizer, TranscriptEvent};
pub use session::{CallError, CallPhase, CallSession};
