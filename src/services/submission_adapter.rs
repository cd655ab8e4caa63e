//! Turns the two inbound message shapes into a claimed number and a media reference.

use std::sync::OnceLock;

use regex::Regex;

use crate::state::game::MediaRef;

static CAPTION_REGEX: OnceLock<Regex> = OnceLock::new();
static COMMAND_REGEX: OnceLock<Regex> = OnceLock::new();

fn caption_regex() -> &'static Regex {
    CAPTION_REGEX.get_or_init(|| Regex::new(r"^\s*(-?\d+)!").expect("Invalid Regex"))
}

fn command_regex() -> &'static Regex {
    COMMAND_REGEX.get_or_init(|| {
        Regex::new(r"^\s*/(?:submit|found)(?:@\w+)?\s+(-?\d+)\s*$").expect("Invalid Regex")
    })
}

/// Inbound event that may carry a find.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionEvent {
    /// Photo or video whose caption starts with `<digits>!`.
    Caption {
        /// Caption text.
        caption: String,
        /// The captioned message.
        media: MediaRef,
    },
    /// `/submit <n>` or `/found <n>` sent as a reply to the proof.
    Command {
        /// Command text.
        text: String,
        /// Message the command replies to, if any.
        reply_to: Option<MediaRef>,
    },
}

/// What an event claims; `None` fields fail the submission as malformed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    /// Announced number. Negative values parse so they can be refused as out of sequence.
    pub number: Option<i64>,
    /// Message holding the proof.
    pub media: Option<MediaRef>,
}

impl SubmissionEvent {
    /// Extract the claimed number and proof media.
    pub fn claim(&self) -> Claim {
        match self {
            SubmissionEvent::Caption { caption, media } => Claim {
                number: parse_caption(caption),
                media: Some(*media),
            },
            SubmissionEvent::Command { text, reply_to } => Claim {
                number: parse_command(text),
                media: *reply_to,
            },
        }
    }
}

/// Number announced by a caption such as `42! found it`.
pub fn parse_caption(caption: &str) -> Option<i64> {
    capture_number(caption_regex(), caption)
}

/// Number carried by `/submit 42`, `/found 42` or `/submit@bot 42`.
pub fn parse_command(text: &str) -> Option<i64> {
    capture_number(command_regex(), text)
}

fn capture_number(pattern: &Regex, input: &str) -> Option<i64> {
    // Too many digits for i64 counts as unparsable.
    pattern.captures(input)?.get(1)?.as_str().parse().ok()
}
