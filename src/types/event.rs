use crate::WholeNotes;
use crate::types::element::{
    Barline, BarlineLocation, BarlineStyle, Chord, Key, KeyMode, MeasureElement, Note, Pitch,
    TimeSignature, Tuplet,
};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatEndingKind {
    Hooked,
    Hookless,
}

impl fmt::Display for RepeatEndingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RepeatEndingKind::Hooked => write!(f, "hooked"),
            RepeatEndingKind::Hookless => write!(f, "hookless"),
        }
    }
}

/// One upstream notation event, in document order.
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    Measure {
        number: String,
        implicit: bool,
    },
    NextMeasureNumber {
        number: String,
    },

    Element(MeasureElement),
    Forward {
        duration: WholeNotes,
    },
    EndMeasure,

    RepeatStart,
    RepeatEnd {
        measure_number: String,
        times: u32,
    },
    EndingStart,
    EndingEnd {
        label: String,
        kind: RepeatEndingKind,
    },

    RestMeasuresStart {
        count: u32,
    },
    RestMeasuresStop,
    MeasuresRepeatStart {
        pattern_length: u32,
        slashes: u32,
    },
    MeasuresRepeatStop,

    // Formatting-only records for passthrough
    EmptyLine,
}

fn write_pitches(f: &mut fmt::Formatter<'_>, pitches: &[Pitch]) -> fmt::Result {
    for pitch in pitches {
        write!(f, " {}", pitch)?;
    }
    Ok(())
}

fn write_element(f: &mut fmt::Formatter<'_>, element: &MeasureElement) -> fmt::Result {
    match element {
        MeasureElement::Note(Note {
            pitch: Some(pitch),
            duration,
        }) => write!(f, "note {} {}", duration, pitch),
        MeasureElement::Note(Note {
            pitch: None,
            duration,
        }) => write!(f, "rest {}", duration),
        MeasureElement::Chord(Chord { pitches, duration }) => {
            write!(f, "chord {}", duration)?;
            write_pitches(f, pitches)
        }
        MeasureElement::Tuplet(Tuplet {
            actual,
            normal,
            notes,
        }) => {
            let duration = notes.first().map(|n| n.duration).unwrap_or_default();
            write!(f, "tuplet {}:{} {}", actual, normal, duration)?;
            for note in notes {
                match &note.pitch {
                    Some(pitch) => write!(f, " {}", pitch)?,
                    None => write!(f, " r")?,
                }
            }
            Ok(())
        }
        MeasureElement::Clef(clef) => write!(f, "clef {}", clef),
        MeasureElement::Key(Key { fifths, mode }) => match mode {
            KeyMode::Major => write!(f, "key {}", fifths),
            KeyMode::Minor => write!(f, "key {} minor", fifths),
        },
        MeasureElement::Time(TimeSignature { beats, beat_type }) => {
            write!(f, "time {}/{}", beats, beat_type)
        }
        MeasureElement::Barline(Barline { location, style }) => {
            write!(f, "barline")?;
            if *location != BarlineLocation::Right {
                write!(f, " {}", location)?;
            }
            if *style != BarlineStyle::Regular {
                write!(f, " {}", style)?;
            }
            Ok(())
        }
    }
}

impl fmt::Display for VoiceEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VoiceEvent::Measure { number, implicit } => {
                write!(f, "measure {}", number)?;
                if *implicit {
                    write!(f, " implicit")?;
                }
                Ok(())
            }
            VoiceEvent::NextMeasureNumber { number } => write!(f, "next {}", number),
            VoiceEvent::Element(element) => write_element(f, element),
            VoiceEvent::Forward { duration } => write!(f, "forward {}", duration),
            VoiceEvent::EndMeasure => write!(f, "end-measure"),
            VoiceEvent::RepeatStart => write!(f, "repeat-start"),
            VoiceEvent::RepeatEnd {
                measure_number,
                times,
            } => write!(f, "repeat-end {} x{}", measure_number, times),
            VoiceEvent::EndingStart => write!(f, "ending-start"),
            VoiceEvent::EndingEnd { label, kind } => write!(f, "ending-end {} {}", label, kind),
            VoiceEvent::RestMeasuresStart { count } => write!(f, "rest-measures {}", count),
            VoiceEvent::RestMeasuresStop => write!(f, "rest-measures-stop"),
            VoiceEvent::MeasuresRepeatStart {
                pattern_length,
                slashes,
            } => {
                write!(f, "measures-repeat {}", pattern_length)?;
                if *slashes != 1 {
                    write!(f, " slashes={}", slashes)?;
                }
                Ok(())
            }
            VoiceEvent::MeasuresRepeatStop => write!(f, "measures-repeat-stop"),
            VoiceEvent::EmptyLine => write!(f, ""),
        }
    }
}

/// An event together with where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct EventLine {
    pub event: VoiceEvent,
    /// 1-based line number in the script, 0 when built programmatically.
    pub input_line: usize,
    pub comment: Option<String>,
}

impl EventLine {
    pub fn new(event: VoiceEvent) -> Self {
        Self {
            event,
            input_line: 0,
            comment: None,
        }
    }

    pub fn with_comment(event: VoiceEvent, comment: String) -> Self {
        Self {
            event,
            input_line: 0,
            comment: Some(comment),
        }
    }
}
