//! Dictation into the quick-add text.
//!
//! The platform recognizer is reached through [`SpeechRecognizer`] and
//! reports back through [`RecognitionListener`]. [`DictationSession`] is the
//! listener: it owns the text being composed and the transcript of the
//! utterance in progress.

use log::{debug, info};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Recognizer error codes surfaced by the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechError {
    Network,
    NetworkTimeout,
    Audio,
    Server,
    Client,
    SpeechTimeout,
    NoMatch,
    RecognizerBusy,
    InsufficientPermissions,
    Other(i32),
}

impl Display for SpeechError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network => write!(f, "network error"),
            Self::NetworkTimeout => write!(f, "network timeout"),
            Self::Audio => write!(f, "audio recording error"),
            Self::Server => write!(f, "server error"),
            Self::Client => write!(f, "client error"),
            Self::SpeechTimeout => write!(f, "no speech input"),
            Self::NoMatch => write!(f, "no recognition match"),
            Self::RecognizerBusy => write!(f, "recognizer busy"),
            Self::InsufficientPermissions => write!(f, "insufficient permissions"),
            Self::Other(code) => write!(f, "speech error code {code}"),
        }
    }
}

impl Error for SpeechError {}

/// Parameters for one listening run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognitionRequest {
    /// BCP 47 tag; `None` uses the device language.
    pub language: Option<String>,
    pub partial_results: bool,
    pub max_results: u32,
}

impl Default for RecognitionRequest {
    fn default() -> Self {
        Self {
            language: None,
            partial_results: true,
            max_results: 1,
        }
    }
}

/// Platform speech-to-text service.
pub trait SpeechRecognizer {
    fn is_available(&self) -> bool;
    fn start_listening(&mut self, request: &RecognitionRequest) -> Result<(), SpeechError>;
    fn stop_listening(&mut self);
}

/// Callbacks delivered by a [`SpeechRecognizer`].
///
/// Candidates are ordered best first.
pub trait RecognitionListener {
    fn on_ready_for_speech(&mut self) {}
    fn on_beginning_of_speech(&mut self);
    fn on_end_of_speech(&mut self);
    fn on_partial_results(&mut self, candidates: &[String]);
    fn on_results(&mut self, candidates: &[String]);
    fn on_error(&mut self, error: SpeechError);
}

/// Result of trying to start dictation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictationStart {
    Started,
    /// The record-audio permission must be requested first.
    PermissionRequired,
    Unavailable,
    Failed(SpeechError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DictationSession {
    text: String,
    transcript: String,
    listening: bool,
    permission_requested: bool,
}

impl DictationSession {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn clear_text(&mut self) {
        self.text.clear();
    }

    /// Words heard so far in the current utterance.
    pub fn transcript(&self) -> &str {
        &self.transcript
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    /// Whether the host should ask for the record-audio permission.
    pub fn permission_requested(&self) -> bool {
        self.permission_requested
    }

    /// The host has shown the permission prompt.
    pub fn permission_request_handled(&mut self) {
        self.permission_requested = false;
    }

    pub fn start<R: SpeechRecognizer + ?Sized>(
        &mut self,
        recognizer: &mut R,
        permission_granted: bool,
        request: &RecognitionRequest,
    ) -> DictationStart {
        if !permission_granted {
            self.permission_requested = true;
            return DictationStart::PermissionRequired;
        }
        if !recognizer.is_available() {
            return DictationStart::Unavailable;
        }
        match recognizer.start_listening(request) {
            Ok(()) => {
                self.transcript.clear();
                info!("event=dictation_start module=viewmodel status=ok");
                DictationStart::Started
            }
            Err(err) => {
                info!("event=dictation_start module=viewmodel status=error error={err}");
                DictationStart::Failed(err)
            }
        }
    }

    pub fn stop<R: SpeechRecognizer + ?Sized>(&mut self, recognizer: &mut R) {
        recognizer.stop_listening();
        self.listening = false;
    }
}

impl RecognitionListener for DictationSession {
    fn on_beginning_of_speech(&mut self) {
        self.listening = true;
    }

    fn on_end_of_speech(&mut self) {
        self.listening = false;
    }

    fn on_partial_results(&mut self, candidates: &[String]) {
        if let Some(best) = candidates.first() {
            self.transcript = best.clone();
        }
    }

    fn on_results(&mut self, candidates: &[String]) {
        self.transcript.clear();
        self.listening = false;
        let Some(best) = candidates.first().map(|best| best.trim()) else {
            return;
        };
        if best.is_empty() {
            return;
        }
        if !self.text.trim().is_empty() {
            self.text.push('\n');
        }
        self.text.push_str(best);
    }

    fn on_error(&mut self, error: SpeechError) {
        self.listening = false;
        debug!("event=dictation_error module=viewmodel status=ignored error={error}");
    }
}
