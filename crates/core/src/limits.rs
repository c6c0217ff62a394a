//! Limits and defaults for billing sessions.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so request field limits are duplicated in the api crate. Keep both in
//! sync when modifying.

// === Lock Ceiling ===

/// Default lock ceiling for live teaching sessions (minutes).
pub const DEFAULT_TEACHING_CEILING_MINUTES: u32 = 30;

/// Default lock ceiling for video sessions when no content duration is given (minutes).
pub const DEFAULT_VIDEO_CEILING_MINUTES: u32 = 60;

/// Longest session anyone can lock funds for (8 hours).
pub const MAX_LOCK_CEILING_MINUTES: u32 = 480;

// === Side Data ===

/// Feedback stars range.
pub const MIN_FEEDBACK_STARS: u8 = 1;
pub const MAX_FEEDBACK_STARS: u8 = 5;

/// Feedback comment max length (chars).
pub const MAX_FEEDBACK_COMMENT_LEN: usize = 2000;

/// Quiz scores kept per session.
pub const MAX_QUIZ_SCORES: usize = 100;

// === Identifiers ===

/// Resource and payer id max length (chars).
pub const MAX_ID_LEN: usize = 128;

/// Cancellation reason max length (chars).
pub const MAX_REASON_LEN: usize = 256;
