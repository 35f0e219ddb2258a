//! Incremental construction of one voice.
//!
//! The upstream reader calls one mutator per notation event, in document order. The
//! voice keeps a single open segment, a stack of open repeats and at most one pending
//! compression, and moves finished pieces into the innermost enclosing scope: the voice's
//! initial elements, or the common part of the innermost open repeat.

mod compressions;
mod repeats;
mod tree;

pub use tree::VoiceTree;

use crate::WholeNotes;
use crate::error::{VoiceError, VoiceWarning};
use crate::ir::{
    Measure, MeasureFill, MeasureId, MeasuresRepeatId, Nodes, RepeatDescr, RepeatId,
    RestMeasuresId, Segment, SegmentId, VoiceElement,
};
use crate::options::VoiceOptions;
use crate::types::element::{Barline, Chord, MeasureElement, Note, TimeSignature, Tuplet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceState {
    Building,
    Finalized,
    /// An internal error stopped construction; nothing can be read or changed.
    Aborted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingCompression {
    RestMeasures {
        id: RestMeasuresId,
        remaining: u32,
        absorbing: bool,
    },
    MeasuresRepeat {
        id: MeasuresRepeatId,
    },
}

impl PendingCompression {
    fn name(&self) -> &'static str {
        match self {
            PendingCompression::RestMeasures { .. } => "rest measures",
            PendingCompression::MeasuresRepeat { .. } => "measures repeat",
        }
    }
}

/// A closed compression whose next measure number is not known yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NextNumberTarget {
    RestMeasures(RestMeasuresId),
    MeasuresRepeat(MeasuresRepeatId),
}

#[derive(Debug)]
pub struct Voice {
    number: u32,
    staff_number: u32,
    options: VoiceOptions,
    state: VoiceState,

    nodes: Nodes,
    initial_elements: Vec<VoiceElement>,
    last_segment: Option<SegmentId>,
    repeat_stack: Vec<RepeatDescr>,
    pending_compression: Option<PendingCompression>,
    skipped_compression: Option<&'static str>,
    awaiting_next_number: Option<NextNumberTarget>,

    current_measure: Option<MeasureId>,
    current_measure_number: String,
    purist_measure_number: usize,
    segment_counter: usize,
    current_time: TimeSignature,

    measure_events_count: usize,
    absorbed_measure_count: usize,
    warnings: Vec<VoiceWarning>,
}

impl Voice {
    pub fn new(number: u32, staff_number: u32, options: VoiceOptions) -> Self {
        let current_time = options.default_time;
        Self {
            number,
            staff_number,
            options,
            state: VoiceState::Building,
            nodes: Nodes::new(),
            initial_elements: Vec::new(),
            last_segment: None,
            repeat_stack: Vec::new(),
            pending_compression: None,
            skipped_compression: None,
            awaiting_next_number: None,
            current_measure: None,
            current_measure_number: String::new(),
            purist_measure_number: 0,
            segment_counter: 0,
            current_time,
            measure_events_count: 0,
            absorbed_measure_count: 0,
            warnings: Vec::new(),
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn staff_number(&self) -> u32 {
        self.staff_number
    }

    pub fn options(&self) -> &VoiceOptions {
        &self.options
    }

    pub fn state(&self) -> VoiceState {
        self.state
    }

    pub fn warnings(&self) -> &[VoiceWarning] {
        &self.warnings
    }

    pub fn repeat_depth(&self) -> usize {
        self.repeat_stack.len()
    }

    /// Open repeats, outermost first.
    pub fn open_repeats(&self) -> Vec<RepeatId> {
        self.repeat_stack.iter().map(|descr| descr.repeat).collect()
    }

    /// Number of `newMeasure` events received, absorbed ones included.
    pub fn measure_events_count(&self) -> usize {
        self.measure_events_count
    }

    /// Number of `newMeasure` events folded into rest measures.
    pub fn absorbed_measure_count(&self) -> usize {
        self.absorbed_measure_count
    }

    pub fn current_measure(&self) -> Option<&Measure> {
        self.current_measure.map(|id| &self.nodes[id])
    }

    /// Read-only view of the finished voice.
    pub fn tree(&self) -> Result<VoiceTree<'_>, VoiceError> {
        match self.state {
            VoiceState::Finalized => Ok(VoiceTree::new(self)),
            VoiceState::Building => Err(VoiceError::NotFinalized { voice: self.number }),
            VoiceState::Aborted => Err(VoiceError::Aborted),
        }
    }

    /// Runs a mutation, refusing it outside of construction and aborting on failure.
    fn guarded<T>(
        &mut self,
        operation: &'static str,
        action: impl FnOnce(&mut Self) -> Result<T, VoiceError>,
    ) -> Result<T, VoiceError> {
        match self.state {
            VoiceState::Building => {}
            VoiceState::Finalized => {
                return Err(VoiceError::VoiceIsFinalized {
                    voice: self.number,
                    operation,
                });
            }
            VoiceState::Aborted => return Err(VoiceError::Aborted),
        }

        let result = action(self);
        if let Err(e) = &result {
            log::error!(
                "voice {}: {} failed, construction aborted: {}",
                self.number,
                operation,
                e
            );
            self.state = VoiceState::Aborted;
        }
        result
    }

    fn warn(&mut self, warning: VoiceWarning) {
        log::warn!("voice {}: {}", self.number, warning);
        self.warnings.push(warning);
    }

    // Elements

    pub fn append_element_to_voice(
        &mut self,
        element: MeasureElement,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("append element", |voice| {
            voice.append_element(element, input_line);
            Ok(())
        })
    }

    pub fn append_note_to_voice(&mut self, note: Note, input_line: usize) -> Result<(), VoiceError> {
        self.append_element_to_voice(MeasureElement::Note(note), input_line)
    }

    pub fn append_chord_to_voice(&mut self, chord: Chord, input_line: usize) -> Result<(), VoiceError> {
        self.append_element_to_voice(MeasureElement::Chord(chord), input_line)
    }

    pub fn append_tuplet_to_voice(
        &mut self,
        tuplet: Tuplet,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.append_element_to_voice(MeasureElement::Tuplet(tuplet), input_line)
    }

    pub fn append_barline_to_voice(
        &mut self,
        barline: Barline,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.append_element_to_voice(MeasureElement::Barline(barline), input_line)
    }

    /// Moves the position in the current measure without adding content.
    pub fn advance_position_in_voice(
        &mut self,
        delta: WholeNotes,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("advance position", |voice| {
            if voice.is_absorbing_measures() {
                return Ok(());
            }
            let measure = voice.measure_for_content(input_line);
            voice.nodes[measure].advance_position(delta);
            Ok(())
        })
    }

    fn append_element(&mut self, element: MeasureElement, input_line: usize) {
        if let MeasureElement::Time(time) = &element {
            self.current_time = *time;
        }
        if self.is_absorbing_measures() {
            if self.options.trace_compressions {
                log::debug!(
                    "voice {}: dropping {} of absorbed measure {}",
                    self.number,
                    element.kind_name(),
                    self.current_measure_number
                );
            }
            return;
        }

        let measure = self.measure_for_content(input_line);
        self.nodes[measure].append_element(element, input_line);
    }

    /// The measure receiving content: the current one while open, else a new
    /// continuation measure carrying the current measure number.
    fn measure_for_content(&mut self, input_line: usize) -> MeasureId {
        let measure = match self.current_measure {
            Some(id) if !self.nodes[id].is_finalized() => return id,
            Some(id) => self.nodes[id].continuation(input_line),
            None => Measure::synthesized(
                self.current_measure_number.clone(),
                self.purist_measure_number,
                self.number,
                self.current_time.measure_whole_notes(),
                input_line,
            ),
        };

        let segment = self.active_segment();
        let id = self.nodes.create_measure_in_segment(segment, measure);
        if self.options.trace_measures {
            log::debug!(
                "voice {}: line {}: continuation of measure {} created",
                self.number,
                input_line,
                self.current_measure_number
            );
        }
        self.current_measure = Some(id);
        id
    }

    // Measures

    /// Opens a new measure in the active segment. Returns `None` when the measure is
    /// absorbed by pending rest measures.
    pub fn create_measure_and_append_it_to_voice(
        &mut self,
        number: &str,
        implicit: bool,
        input_line: usize,
    ) -> Result<Option<MeasureId>, VoiceError> {
        self.guarded("create measure", |voice| {
            voice.create_measure(number, implicit, input_line)
        })
    }

    fn create_measure(
        &mut self,
        number: &str,
        implicit: bool,
        input_line: usize,
    ) -> Result<Option<MeasureId>, VoiceError> {
        self.measure_events_count += 1;
        if self.absorb_measure_in_rest_measures(number, input_line)? {
            return Ok(None);
        }

        self.set_next_measure_number(number);
        self.purist_measure_number += 1;
        self.current_measure_number = number.to_string();

        let segment = self.active_segment();
        self.remove_trailing_placeholder(segment);

        let mut measure = Measure::new(
            number.to_string(),
            self.purist_measure_number,
            self.number,
            implicit,
            self.current_time.measure_whole_notes(),
            input_line,
        );
        if self.purist_measure_number == 1 {
            measure.set_first_in_voice();
        }
        let id = self.nodes.create_measure_in_segment(segment, measure);
        self.current_measure = Some(id);

        if self.options.trace_measures {
            log::debug!(
                "voice {}: line {}: measure {} created in segment {}",
                self.number,
                input_line,
                number,
                self.nodes[segment].absolute_number()
            );
        }
        Ok(Some(id))
    }

    /// Back-fills the number of the measure that follows.
    pub fn set_next_measure_number_in_voice(&mut self, number: &str) -> Result<(), VoiceError> {
        self.guarded("set next measure number", |voice| {
            voice.set_next_measure_number(number);
            Ok(())
        })
    }

    fn set_next_measure_number(&mut self, number: &str) {
        if let Some(current) = self.current_measure {
            self.nodes[current].set_next_measure_number(number);
        }
        match self.awaiting_next_number.take() {
            Some(NextNumberTarget::RestMeasures(id)) => {
                self.nodes[id].set_next_measure_number(number)
            }
            Some(NextNumberTarget::MeasuresRepeat(id)) => {
                self.nodes[id].set_next_measure_number(number)
            }
            None => {}
        }
    }

    /// Drops an empty continuation left at the end of `segment` by a measure split.
    fn remove_trailing_placeholder(&mut self, segment: SegmentId) {
        let Some(last) = self.nodes[segment].last_measure() else {
            return;
        };
        if self.nodes[last].is_placeholder() {
            self.nodes[segment].remove_last_measure();
            if self.current_measure == Some(last) {
                self.current_measure = None;
            }
        }
    }

    /// Classifies the current measure without opening a new one.
    pub fn finalize_current_measure_in_voice(
        &mut self,
        input_line: usize,
    ) -> Result<Option<MeasureFill>, VoiceError> {
        self.guarded("finalize current measure", |voice| {
            if voice.is_absorbing_measures() {
                return Ok(None);
            }
            let Some(id) = voice.current_measure else {
                return Ok(None);
            };
            let fill = voice.nodes[id].finalize()?;
            if voice.options.trace_measures {
                log::debug!(
                    "voice {}: line {}: measure {} finalized as {:?}",
                    voice.number,
                    input_line,
                    voice.nodes[id].number(),
                    fill
                );
            }
            Ok(Some(fill))
        })
    }

    fn finalize_open_measure(&mut self) -> Result<(), VoiceError> {
        if let Some(id) = self.current_measure {
            if !self.nodes[id].is_finalized() {
                self.nodes[id].finalize()?;
            }
        }
        Ok(())
    }

    // Segments and scopes

    /// Segment receiving new measures.
    fn active_segment(&mut self) -> SegmentId {
        match self.pending_compression {
            Some(PendingCompression::MeasuresRepeat { id }) => self.nodes[id].replicas(),
            Some(PendingCompression::RestMeasures { id, .. }) => self.nodes[id].pattern(),
            None => self.open_segment(),
        }
    }

    fn open_segment(&mut self) -> SegmentId {
        match self.last_segment {
            Some(segment) => segment,
            None => {
                let segment = self.new_segment();
                self.last_segment = Some(segment);
                segment
            }
        }
    }

    fn new_segment(&mut self) -> SegmentId {
        self.segment_counter += 1;
        self.nodes.add_segment(Segment::new(self.segment_counter))
    }

    fn seed_open_segment(&mut self, measure: Option<MeasureId>) {
        if let Some(measure) = measure {
            let segment = self.open_segment();
            self.nodes[segment].append_measure(measure);
        }
    }

    /// Moves the open segment into the current scope; an empty one is dropped.
    fn close_last_segment_into_scope(&mut self) -> Result<(), VoiceError> {
        if let Some(segment) = self.last_segment.take() {
            if !self.nodes[segment].is_empty() {
                self.append_to_scope(VoiceElement::Segment(segment))?;
            }
        }
        Ok(())
    }

    fn append_to_scope(&mut self, element: VoiceElement) -> Result<(), VoiceError> {
        self.complete_repeats_past_their_endings()?;
        self.append_to_innermost_scope(element)
    }

    fn append_to_innermost_scope(&mut self, element: VoiceElement) -> Result<(), VoiceError> {
        match self.repeat_stack.last() {
            None => {
                self.initial_elements.push(element);
                Ok(())
            }
            Some(descr) if descr.has_open_ending() => Err(VoiceError::MisplacedScopeAppend {
                repeat: descr.repeat,
            }),
            Some(descr) => {
                let repeat = descr.repeat;
                self.nodes[repeat].append_to_common_part(element)
            }
        }
    }

    fn open_ending_input_line(&self) -> Option<usize> {
        self.repeat_stack
            .last()
            .and_then(|descr| descr.open_ending_input_line)
    }

    /// Removes `repeat` from the top of the stack of open repeats.
    pub fn pop_repeat_descr_from_stack(
        &mut self,
        repeat: RepeatId,
        context: &'static str,
    ) -> Result<RepeatDescr, VoiceError> {
        self.guarded("pop repeat", |voice| voice.pop_repeat_descr(repeat, context))
    }

    fn pop_repeat_descr(
        &mut self,
        repeat: RepeatId,
        context: &'static str,
    ) -> Result<RepeatDescr, VoiceError> {
        if let Some(descr) = self.repeat_stack.last().copied() {
            if descr.repeat == repeat {
                self.repeat_stack.pop();
                return Ok(descr);
            }
        }
        Err(VoiceError::RepeatNotAtTopOfStack {
            requested: repeat,
            top: self
                .repeat_stack
                .last()
                .map_or_else(|| "nothing".to_string(), |descr| descr.repeat.to_string()),
            context,
        })
    }

    // Lifecycle

    /// Closes every open structure and makes the voice read-only.
    pub fn finalize_voice(&mut self) -> Result<(), VoiceError> {
        match self.state {
            VoiceState::Finalized => {
                return Err(VoiceError::VoiceAlreadyFinalized { voice: self.number });
            }
            VoiceState::Aborted => return Err(VoiceError::Aborted),
            VoiceState::Building => {}
        }
        self.guarded("finalize voice", |voice| voice.finalize())
    }

    fn finalize(&mut self) -> Result<(), VoiceError> {
        if let Some(PendingCompression::RestMeasures { remaining, .. }) =
            self.close_pending_compression(0)?
        {
            if remaining > 0 {
                self.warn(VoiceWarning::UnterminatedCompression {
                    what: "rest measures",
                });
            }
        }
        self.finalize_open_measure()?;
        self.complete_open_repeats()?;

        if let Some(segment) = self.last_segment.take() {
            if !self.nodes[segment].is_empty() {
                self.initial_elements.push(VoiceElement::Segment(segment));
            }
        }
        if self
            .initial_elements
            .iter()
            .all(|element| self.nodes.is_element_empty(*element))
        {
            self.warn(VoiceWarning::EmptyVoice { voice: self.number });
        }

        self.state = VoiceState::Finalized;
        log::debug!(
            "voice {}: finalized with {} elements, {} warnings",
            self.number,
            self.initial_elements.len(),
            self.warnings.len()
        );
        Ok(())
    }
}
