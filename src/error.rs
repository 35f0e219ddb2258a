//! Error and warning types for voice construction.
//!
//! `VoiceError` covers caller contract violations: the event sequence is inconsistent
//! with the builder's state machine, and construction stops. `VoiceWarning` covers
//! malformed but recoverable input; it is recorded and construction continues.

use crate::ir::{RepeatBuildPhase, RepeatId, RepeatPhaseEvent};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VoiceError {
    #[error("cannot pop {requested} in {context}: it is not at the top of the repeat stack (top: {top})")]
    RepeatNotAtTopOfStack {
        requested: RepeatId,
        top: String,
        context: &'static str,
    },

    #[error("repeat in phase {phase:?} cannot accept {event:?}")]
    InvalidRepeatTransition {
        phase: RepeatBuildPhase,
        event: RepeatPhaseEvent,
    },

    #[error("measure {number} has already been finalized")]
    MeasureAlreadyFinalized { number: String },

    #[error("voice {voice} has already been finalized")]
    VoiceAlreadyFinalized { voice: u32 },

    #[error("voice {voice} is finalized, {operation} is not allowed")]
    VoiceIsFinalized { voice: u32, operation: &'static str },

    #[error("cannot create {requested}: a {pending} is already pending")]
    CompressionAlreadyPending {
        requested: &'static str,
        pending: &'static str,
    },

    #[error("there is no pending {expected} to append")]
    NoPendingCompression { expected: &'static str },

    #[error("there is no current measure for {operation}")]
    NoCurrentMeasure { operation: &'static str },

    #[error("cannot append to the common part of {repeat} while one of its endings is open")]
    MisplacedScopeAppend { repeat: RepeatId },

    #[error("voice {voice} is still under construction")]
    NotFinalized { voice: u32 },

    #[error("voice construction was aborted by an earlier error")]
    Aborted,
}

/// Data-quality problems that do not stop construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoiceWarning {
    EmptyVoice {
        voice: u32,
    },
    UnterminatedRepeat {
        start_input_line: usize,
    },
    UnterminatedEnding {
        start_input_line: usize,
    },
    EndingWithoutRepeat {
        input_line: usize,
    },
    EndingEndWithoutStart {
        input_line: usize,
    },
    RepeatEndWithoutContent {
        input_line: usize,
    },
    UnsupportedInsideEnding {
        what: &'static str,
        input_line: usize,
    },
    MeasuresRepeatPatternTooShort {
        needed: usize,
        available: usize,
        input_line: usize,
    },
    UnterminatedCompression {
        what: &'static str,
    },
}

impl fmt::Display for VoiceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceWarning::EmptyVoice { voice } => {
                write!(f, "voice {} has no content", voice)
            }
            VoiceWarning::UnterminatedRepeat { start_input_line } => write!(
                f,
                "repeat started at line {} is never closed, its content becomes the common part",
                start_input_line
            ),
            VoiceWarning::UnterminatedEnding { start_input_line } => write!(
                f,
                "repeat ending started at line {} is never closed, treating it as hookless",
                start_input_line
            ),
            VoiceWarning::EndingWithoutRepeat { input_line } => write!(
                f,
                "line {}: repeat ending end outside of any repeat, ignored",
                input_line
            ),
            VoiceWarning::EndingEndWithoutStart { input_line } => write!(
                f,
                "line {}: repeat ending end without a start, using the open segment",
                input_line
            ),
            VoiceWarning::RepeatEndWithoutContent { input_line } => write!(
                f,
                "line {}: repeat end with nothing to repeat since the last repeat, ignored",
                input_line
            ),
            VoiceWarning::UnsupportedInsideEnding { what, input_line } => write!(
                f,
                "line {}: {} inside a repeat ending is not supported, ignored",
                input_line, what
            ),
            VoiceWarning::MeasuresRepeatPatternTooShort {
                needed,
                available,
                input_line,
            } => write!(
                f,
                "line {}: measures repeat needs {} measures but only {} are available, ignored",
                input_line, needed, available
            ),
            VoiceWarning::UnterminatedCompression { what } => {
                write!(f, "{} is still expecting measures at the end of the voice", what)
            }
        }
    }
}
