//! Voice IR - structural core of a notation translation pipeline
//!
//! This library builds the intermediate representation of one voice (measures grouped
//! into segments, repeats with their endings, rest measures and measures repeats) from
//! a linear stream of notation events, then hands the finished tree out read-only.
//! Events can also be written as a line-oriented script and replayed.

pub mod error;
pub mod event_parser;
pub mod file;
pub mod ir;
pub mod options;
pub mod parser;
pub mod process;
pub mod types;
pub mod voice;

#[cfg(test)]
mod util;

// Re-export commonly used types
pub use error::VoiceError;
pub use error::VoiceWarning;
pub use file::EventFile;
pub use options::VoiceOptions;
pub use parser::parse_events;
pub use process::replay_events;
pub use types::event::EventLine;
pub use types::event::RepeatEndingKind;
pub use types::event::VoiceEvent;
pub use types::whole_notes::WholeNotes;
pub use voice::Voice;
pub use voice::VoiceState;
pub use voice::VoiceTree;
