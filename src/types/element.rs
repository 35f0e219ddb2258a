//! Leaf notation elements that can occupy a measure.
//!
//! These are plain value records. The builder only needs their durations, plus the
//! time signature's effect on measure capacity.

use crate::WholeNotes;
use anyhow::{Result, anyhow, bail};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pitch {
    pub step: char,
    pub alter: i8,
    pub octave: u8,
}

impl fmt::Display for Pitch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.step)?;
        if self.alter > 0 {
            write!(f, "{}", "#".repeat(self.alter as usize))?;
        } else if self.alter < 0 {
            write!(f, "{}", "b".repeat(self.alter.unsigned_abs() as usize))?;
        }
        write!(f, "{}", self.octave)
    }
}

impl FromStr for Pitch {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut chars = s.chars().peekable();
        let step = chars
            .next()
            .map(|c| c.to_ascii_uppercase())
            .filter(|c| ('A'..='G').contains(c))
            .ok_or_else(|| anyhow!("Invalid pitch: {}", s))?;

        let mut alter: i8 = 0;
        while let Some(&c) = chars.peek() {
            match c {
                '#' => alter += 1,
                'b' => alter -= 1,
                _ => break,
            }
            chars.next();
        }
        if !(-2..=2).contains(&alter) {
            bail!("Invalid pitch alteration: {}", s);
        }

        let octave_str: String = chars.collect();
        let octave: u8 = octave_str
            .parse()
            .map_err(|_| anyhow!("Invalid pitch octave: {}", s))?;
        if octave > 9 {
            bail!("Invalid pitch octave: {}", s);
        }

        Ok(Pitch {
            step,
            alter,
            octave,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    /// `None` for a rest.
    pub pitch: Option<Pitch>,
    pub duration: WholeNotes,
}

impl Note {
    pub fn pitched(pitch: Pitch, duration: WholeNotes) -> Self {
        Self {
            pitch: Some(pitch),
            duration,
        }
    }

    pub fn rest(duration: WholeNotes) -> Self {
        Self {
            pitch: None,
            duration,
        }
    }

    pub fn is_rest(&self) -> bool {
        self.pitch.is_none()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Chord {
    pub pitches: Vec<Pitch>,
    pub duration: WholeNotes,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tuplet {
    pub actual: u32,
    pub normal: u32,
    pub notes: Vec<Note>,
}

impl Tuplet {
    pub fn duration(&self) -> WholeNotes {
        let written = self
            .notes
            .iter()
            .fold(WholeNotes::zero(), |sum, note| sum + note.duration);
        if self.actual == 0 {
            return written;
        }
        written.scaled(self.normal as u64, self.actual as u64)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clef {
    Treble,
    Bass,
    Alto,
    Tenor,
    Percussion,
}

impl fmt::Display for Clef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Clef::Treble => "treble",
            Clef::Bass => "bass",
            Clef::Alto => "alto",
            Clef::Tenor => "tenor",
            Clef::Percussion => "percussion",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Clef {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "treble" => Ok(Clef::Treble),
            "bass" => Ok(Clef::Bass),
            "alto" => Ok(Clef::Alto),
            "tenor" => Ok(Clef::Tenor),
            "percussion" => Ok(Clef::Percussion),
            _ => bail!("Invalid clef: {}", s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyMode {
    Major,
    Minor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Key {
    pub fifths: i8,
    pub mode: KeyMode,
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.mode {
            KeyMode::Major => write!(f, "{} major", self.fifths),
            KeyMode::Minor => write!(f, "{} minor", self.fifths),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSignature {
    pub beats: u32,
    pub beat_type: u32,
}

impl TimeSignature {
    pub fn new(beats: u32, beat_type: u32) -> Self {
        Self { beats, beat_type }
    }

    /// Capacity of a full measure under this signature.
    pub fn measure_whole_notes(&self) -> WholeNotes {
        if self.beat_type == 0 {
            return WholeNotes::zero();
        }
        WholeNotes::new(self.beats as u64, self.beat_type as u64)
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.beats, self.beat_type)
    }
}

impl FromStr for TimeSignature {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (beats, beat_type) = s
            .split_once('/')
            .ok_or_else(|| anyhow!("Invalid time signature: {}", s))?;
        let beats: u32 = beats
            .parse()
            .map_err(|_| anyhow!("Invalid time signature: {}", s))?;
        let beat_type: u32 = beat_type
            .parse()
            .map_err(|_| anyhow!("Invalid time signature: {}", s))?;
        if beats == 0 || beat_type == 0 {
            bail!("Invalid time signature: {}", s);
        }
        Ok(Self::new(beats, beat_type))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarlineLocation {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarlineStyle {
    Regular,
    Dotted,
    Dashed,
    Heavy,
    LightLight,
    LightHeavy,
    HeavyLight,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Barline {
    pub location: BarlineLocation,
    pub style: BarlineStyle,
}

impl fmt::Display for BarlineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BarlineLocation::Left => "left",
            BarlineLocation::Middle => "middle",
            BarlineLocation::Right => "right",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BarlineLocation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "left" => Ok(BarlineLocation::Left),
            "middle" => Ok(BarlineLocation::Middle),
            "right" => Ok(BarlineLocation::Right),
            _ => bail!("Invalid barline location: {}", s),
        }
    }
}

impl fmt::Display for BarlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BarlineStyle::Regular => "regular",
            BarlineStyle::Dotted => "dotted",
            BarlineStyle::Dashed => "dashed",
            BarlineStyle::Heavy => "heavy",
            BarlineStyle::LightLight => "light-light",
            BarlineStyle::LightHeavy => "light-heavy",
            BarlineStyle::HeavyLight => "heavy-light",
            BarlineStyle::None => "none",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for BarlineStyle {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "regular" => Ok(BarlineStyle::Regular),
            "dotted" => Ok(BarlineStyle::Dotted),
            "dashed" => Ok(BarlineStyle::Dashed),
            "heavy" => Ok(BarlineStyle::Heavy),
            "light-light" => Ok(BarlineStyle::LightLight),
            "light-heavy" => Ok(BarlineStyle::LightHeavy),
            "heavy-light" => Ok(BarlineStyle::HeavyLight),
            "none" => Ok(BarlineStyle::None),
            _ => bail!("Invalid barline style: {}", s),
        }
    }
}

/// Everything that can legally be appended to a measure.
#[derive(Debug, Clone, PartialEq)]
pub enum MeasureElement {
    Note(Note),
    Chord(Chord),
    Tuplet(Tuplet),
    Clef(Clef),
    Key(Key),
    Time(TimeSignature),
    Barline(Barline),
}

impl MeasureElement {
    /// How far this element moves the position-in-measure cursor.
    pub fn duration(&self) -> WholeNotes {
        match self {
            MeasureElement::Note(note) => note.duration,
            MeasureElement::Chord(chord) => chord.duration,
            MeasureElement::Tuplet(tuplet) => tuplet.duration(),
            MeasureElement::Clef(_)
            | MeasureElement::Key(_)
            | MeasureElement::Time(_)
            | MeasureElement::Barline(_) => WholeNotes::zero(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            MeasureElement::Note(note) if note.is_rest() => "rest",
            MeasureElement::Note(_) => "note",
            MeasureElement::Chord(_) => "chord",
            MeasureElement::Tuplet(_) => "tuplet",
            MeasureElement::Clef(_) => "clef",
            MeasureElement::Key(_) => "key",
            MeasureElement::Time(_) => "time",
            MeasureElement::Barline(_) => "barline",
        }
    }
}
