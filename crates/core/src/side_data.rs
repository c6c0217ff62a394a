//! Quiz scores and feedback attached to a session.
//!
//! Neither has any monetary effect.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::limits::{MAX_FEEDBACK_COMMENT_LEN, MAX_FEEDBACK_STARS, MIN_FEEDBACK_STARS};

/// One quiz result, in the order it was submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizScore {
    pub score: u32,
    pub total: u32,
    /// Content position (seconds into the session or video) when the quiz was taken
    pub position_secs: u32,
    pub recorded_at: DateTime<Utc>,
}

impl QuizScore {
    pub fn new(score: u32, total: u32, position_secs: u32, recorded_at: DateTime<Utc>) -> Result<Self> {
        if total == 0 {
            return Err(Error::validation("quiz total must be at least 1"));
        }
        if score > total {
            return Err(Error::validation(format!(
                "quiz score {} exceeds total {}",
                score, total
            )));
        }
        Ok(Self {
            score,
            total,
            position_secs,
            recorded_at,
        })
    }
}

/// Student feedback for a session. Last write wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub stars: u8,
    pub comment: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Feedback {
    pub fn new(stars: u8, comment: Option<String>, submitted_at: DateTime<Utc>) -> Result<Self> {
        if !(MIN_FEEDBACK_STARS..=MAX_FEEDBACK_STARS).contains(&stars) {
            return Err(Error::validation(format!(
                "stars must be between {} and {}",
                MIN_FEEDBACK_STARS, MAX_FEEDBACK_STARS
            )));
        }

        let comment = comment
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        if let Some(ref c) = comment {
            if c.chars().count() > MAX_FEEDBACK_COMMENT_LEN {
                return Err(Error::validation(format!(
                    "comment exceeds {} characters",
                    MAX_FEEDBACK_COMMENT_LEN
                )));
            }
        }

        Ok(Self {
            stars,
            comment,
            submitted_at,
        })
    }
}
