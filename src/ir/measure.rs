use crate::WholeNotes;
use crate::error::VoiceError;
use crate::types::element::MeasureElement;

/// How a finalized measure's content relates to its declared capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureFill {
    /// Nothing with a duration was appended.
    Empty,
    /// Under-filled first measure of the voice (pickup).
    Anacrusis,
    UnderFull,
    Full,
    OverFull,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeasureOrigin {
    /// Created by a `newMeasure` event.
    Announced,
    /// Synthesized by the builder, e.g. the second half of a measure split by a repeat start.
    Continuation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeasureItem {
    pub element: MeasureElement,
    pub position: WholeNotes,
    pub input_line: usize,
}

#[derive(Debug, Clone)]
pub struct Measure {
    number: String,
    purist_number: usize,
    voice_number: u32,
    implicit: bool,
    first_in_voice: bool,
    origin: MeasureOrigin,
    full_measure_whole_notes: WholeNotes,
    start_position: WholeNotes,
    position: WholeNotes,
    items: Vec<MeasureItem>,
    fill: Option<MeasureFill>,
    next_measure_number: Option<String>,
    input_line: usize,
}

impl Measure {
    pub fn new(
        number: String,
        purist_number: usize,
        voice_number: u32,
        implicit: bool,
        full_measure_whole_notes: WholeNotes,
        input_line: usize,
    ) -> Self {
        Self {
            number,
            purist_number,
            voice_number,
            implicit,
            first_in_voice: false,
            origin: MeasureOrigin::Announced,
            full_measure_whole_notes,
            start_position: WholeNotes::zero(),
            position: WholeNotes::zero(),
            items: Vec::new(),
            fill: None,
            next_measure_number: None,
            input_line,
        }
    }

    /// A builder-made measure for content that arrives with no measure open.
    pub fn synthesized(
        number: String,
        purist_number: usize,
        voice_number: u32,
        full_measure_whole_notes: WholeNotes,
        input_line: usize,
    ) -> Self {
        Self {
            origin: MeasureOrigin::Continuation,
            ..Self::new(
                number,
                purist_number,
                voice_number,
                false,
                full_measure_whole_notes,
                input_line,
            )
        }
    }

    /// An empty measure carrying on `self` from its current position.
    pub fn continuation(&self, input_line: usize) -> Self {
        Self {
            number: self.number.clone(),
            purist_number: self.purist_number,
            voice_number: self.voice_number,
            implicit: self.implicit,
            first_in_voice: false,
            origin: MeasureOrigin::Continuation,
            full_measure_whole_notes: self.full_measure_whole_notes,
            start_position: self.position,
            position: self.position,
            items: Vec::new(),
            fill: None,
            next_measure_number: None,
            input_line,
        }
    }

    pub fn set_first_in_voice(&mut self) {
        self.first_in_voice = true;
    }

    pub fn number(&self) -> &str {
        &self.number
    }

    pub fn purist_number(&self) -> usize {
        self.purist_number
    }

    pub fn voice_number(&self) -> u32 {
        self.voice_number
    }

    pub fn is_implicit(&self) -> bool {
        self.implicit
    }

    pub fn is_first_in_voice(&self) -> bool {
        self.first_in_voice
    }

    pub fn origin(&self) -> MeasureOrigin {
        self.origin
    }

    pub fn is_continuation(&self) -> bool {
        self.origin == MeasureOrigin::Continuation
    }

    pub fn full_measure_whole_notes(&self) -> WholeNotes {
        self.full_measure_whole_notes
    }

    pub fn set_full_measure_whole_notes(&mut self, capacity: WholeNotes) {
        self.full_measure_whole_notes = capacity;
    }

    pub fn position(&self) -> WholeNotes {
        self.position
    }

    pub fn advance_position(&mut self, delta: WholeNotes) {
        self.position = self.position + delta;
    }

    pub fn items(&self) -> &[MeasureItem] {
        &self.items
    }

    pub fn elements(&self) -> impl Iterator<Item = &MeasureElement> {
        self.items.iter().map(|item| &item.element)
    }

    pub fn input_line(&self) -> usize {
        self.input_line
    }

    pub fn next_measure_number(&self) -> Option<&str> {
        self.next_measure_number.as_deref()
    }

    pub fn set_next_measure_number(&mut self, number: &str) {
        self.next_measure_number = Some(number.to_string());
    }

    pub fn fill(&self) -> Option<MeasureFill> {
        self.fill
    }

    pub fn is_finalized(&self) -> bool {
        self.fill.is_some()
    }

    /// True when nothing with a duration has been appended yet.
    /// Clef, key and time changes alone leave a measure musically empty.
    pub fn is_musically_empty(&self) -> bool {
        self.items
            .iter()
            .all(|item| item.element.duration().is_zero())
            && self.position == self.start_position
    }

    /// True for a builder-made continuation that never received anything.
    pub fn is_placeholder(&self) -> bool {
        self.is_continuation() && self.items.is_empty()
    }

    pub fn append_element(&mut self, element: MeasureElement, input_line: usize) {
        if let MeasureElement::Time(time) = &element {
            self.full_measure_whole_notes = time.measure_whole_notes();
        }
        let duration = element.duration();
        self.items.push(MeasureItem {
            element,
            position: self.position,
            input_line,
        });
        self.position = self.position + duration;
    }

    /// Classifies the measure; may be called only once.
    pub fn finalize(&mut self) -> Result<MeasureFill, VoiceError> {
        if self.fill.is_some() {
            return Err(VoiceError::MeasureAlreadyFinalized {
                number: self.number.clone(),
            });
        }

        let fill = if self.position == self.start_position {
            MeasureFill::Empty
        } else if self.position < self.full_measure_whole_notes {
            if self.first_in_voice {
                MeasureFill::Anacrusis
            } else {
                MeasureFill::UnderFull
            }
        } else if self.position == self.full_measure_whole_notes {
            MeasureFill::Full
        } else {
            MeasureFill::OverFull
        };

        self.fill = Some(fill);
        Ok(fill)
    }
}
