//! In-app review prompt time gate.
//!
//! # Responsibility
//! - Persist the earliest time the next review prompt may appear.
//! - Ask the platform for a review flow only when that time has passed.
//!
//! # Invariants
//! - The first evaluation only schedules; it never prompts.
//! - A failed platform request leaves the schedule untouched.
//! - A successful request pushes the schedule out by the cooldown.

use crate::config::ReviewPolicy;
use crate::repo::ical_repo::RepoError;
use crate::repo::settings_repo::SettingsRepository;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Settings key holding the next eligible timestamp in epoch ms.
pub const NEXT_REVIEW_REQUEST_KEY: &str = "next_review_request_on";

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

#[derive(Debug)]
pub enum ReviewError {
    Platform(String),
    Repo(RepoError),
}

impl Display for ReviewError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Platform(message) => write!(f, "review platform error: {message}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReviewError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Platform(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<RepoError> for ReviewError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Opaque handle returned by a successful review-flow request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewInfo {
    pub token: String,
}

/// Platform in-app review service.
pub trait ReviewPlatform {
    fn request_review_flow(&mut self) -> Result<ReviewInfo, ReviewError>;
    fn launch_review_flow(&mut self, info: &ReviewInfo) -> Result<(), ReviewError>;
}

/// Outcome of checking the gate without talking to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewGate {
    /// No schedule existed; the first one was stored.
    FirstScheduled { next_request_on: i64 },
    /// Still cooling down.
    NotYet { next_request_on: i64 },
    /// The platform may be asked now.
    Due,
}

/// Outcome of [`ReviewScheduler::launch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewOutcome {
    FirstScheduled { next_request_on: i64 },
    NotYet { next_request_on: i64 },
    Launched { next_request_on: i64 },
    RequestFailed,
}

pub struct ReviewScheduler<S: SettingsRepository> {
    settings: S,
    policy: ReviewPolicy,
}

impl<S: SettingsRepository> ReviewScheduler<S> {
    pub fn new(settings: S, policy: ReviewPolicy) -> Self {
        Self { settings, policy }
    }

    /// Stored next eligible timestamp, `None` when unset.
    pub fn next_request_on(&self) -> Result<Option<i64>, ReviewError> {
        let value = self.settings.get_i64(NEXT_REVIEW_REQUEST_KEY)?;
        Ok(value.filter(|value| *value != 0))
    }

    /// Checks the gate, scheduling the first prompt when none exists.
    pub fn evaluate(&self, now_ms: i64) -> Result<ReviewGate, ReviewError> {
        match self.next_request_on()? {
            None => {
                let next_request_on =
                    now_ms.saturating_add(days(self.policy.days_to_first_request));
                self.settings
                    .set_i64(NEXT_REVIEW_REQUEST_KEY, next_request_on)?;
                info!("event=review_gate module=review status=first_scheduled");
                Ok(ReviewGate::FirstScheduled { next_request_on })
            }
            Some(next_request_on) if next_request_on > now_ms => {
                Ok(ReviewGate::NotYet { next_request_on })
            }
            Some(_) => Ok(ReviewGate::Due),
        }
    }

    /// Pushes the schedule out after the platform flow was shown.
    pub fn record_review_requested(&self, now_ms: i64) -> Result<i64, ReviewError> {
        let next_request_on = now_ms.saturating_add(days(self.policy.days_to_next_request));
        self.settings
            .set_i64(NEXT_REVIEW_REQUEST_KEY, next_request_on)?;
        Ok(next_request_on)
    }

    /// Runs the whole gate against a platform review service.
    pub fn launch<P: ReviewPlatform>(
        &self,
        platform: &mut P,
        now_ms: i64,
    ) -> Result<ReviewOutcome, ReviewError> {
        match self.evaluate(now_ms)? {
            ReviewGate::FirstScheduled { next_request_on } => {
                return Ok(ReviewOutcome::FirstScheduled { next_request_on })
            }
            ReviewGate::NotYet { next_request_on } => {
                return Ok(ReviewOutcome::NotYet { next_request_on })
            }
            ReviewGate::Due => {}
        }

        let info = match platform.request_review_flow() {
            Ok(info) => info,
            Err(err) => {
                warn!("event=review_request module=review status=error error={err}");
                return Ok(ReviewOutcome::RequestFailed);
            }
        };
        if let Err(err) = platform.launch_review_flow(&info) {
            warn!("event=review_launch module=review status=error error={err}");
        }
        let next_request_on = self.record_review_requested(now_ms)?;
        info!("event=review_launch module=review status=ok");
        Ok(ReviewOutcome::Launched { next_request_on })
    }
}

fn days(count: u32) -> i64 {
    i64::from(count) * DAY_MS
}
