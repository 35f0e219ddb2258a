use super::Voice;
use crate::error::VoiceWarning;
use crate::ir::{
    Measure, MeasureId, MeasuresRepeat, MeasuresRepeatId, Nodes, Repeat, RepeatId, RestMeasures,
    RestMeasuresId, Segment, SegmentId, VoiceElement,
};
use std::fmt;

/// Read-only view of a finalized voice, handed to downstream consumers.
///
/// `Display` renders a one-line outline naming measure numbers and constructs:
/// `[1] repeat(x2){[2]; ending 1 hooked [3]} rests(4)[5]`.
#[derive(Clone, Copy)]
pub struct VoiceTree<'a> {
    voice: &'a Voice,
}

impl<'a> VoiceTree<'a> {
    pub(super) fn new(voice: &'a Voice) -> Self {
        Self { voice }
    }

    pub fn voice_number(&self) -> u32 {
        self.voice.number
    }

    pub fn staff_number(&self) -> u32 {
        self.voice.staff_number
    }

    pub fn warnings(&self) -> &'a [VoiceWarning] {
        &self.voice.warnings
    }

    pub fn nodes(&self) -> &'a Nodes {
        &self.voice.nodes
    }

    /// Top-level elements: the initial elements, then the last segment if still set.
    pub fn elements(&self) -> impl Iterator<Item = VoiceElement> + use<'a> {
        self.voice
            .initial_elements
            .iter()
            .copied()
            .chain(self.voice.last_segment.map(VoiceElement::Segment))
    }

    pub fn measure(&self, id: MeasureId) -> &'a Measure {
        &self.voice.nodes[id]
    }

    pub fn segment(&self, id: SegmentId) -> &'a Segment {
        &self.voice.nodes[id]
    }

    pub fn repeat(&self, id: RepeatId) -> &'a Repeat {
        &self.voice.nodes[id]
    }

    pub fn rest_measures(&self, id: RestMeasuresId) -> &'a RestMeasures {
        &self.voice.nodes[id]
    }

    pub fn measures_repeat(&self, id: MeasuresRepeatId) -> &'a MeasuresRepeat {
        &self.voice.nodes[id]
    }

    pub fn measures_in_order(&self) -> Vec<MeasureId> {
        let mut measures = Vec::new();
        for element in self.elements() {
            self.voice.nodes.collect_measures(element, &mut measures);
        }
        measures
    }

    /// Measures created by `newMeasure` events, continuations excluded.
    pub fn announced_measure_count(&self) -> usize {
        self.measures_in_order()
            .into_iter()
            .filter(|id| !self.measure(*id).is_continuation())
            .count()
    }

    /// All repeats, outer ones before the repeats they contain.
    pub fn repeats_in_order(&self) -> Vec<RepeatId> {
        let mut repeats = Vec::new();
        let mut pending: Vec<VoiceElement> = self.elements().collect();
        pending.reverse();
        while let Some(element) = pending.pop() {
            if let VoiceElement::Repeat(id) = element {
                repeats.push(id);
                pending.extend(self.repeat(id).common_part().elements().iter().rev());
            }
        }
        repeats
    }

    fn write_element(&self, f: &mut fmt::Formatter<'_>, element: VoiceElement) -> fmt::Result {
        match element {
            VoiceElement::Segment(id) => self.write_segment(f, id),
            VoiceElement::Repeat(id) => {
                let repeat = self.repeat(id);
                match repeat.times() {
                    Some(times) => write!(f, "repeat(x{}", times)?,
                    None => write!(f, "repeat(x?")?,
                }
                if !repeat.is_explicit_start() {
                    write!(f, " implicit")?;
                }
                write!(f, "){{")?;
                self.write_elements(f, repeat.common_part().elements())?;
                for ending in repeat.endings() {
                    write!(f, "; ending {} {} ", ending.label(), ending.kind())?;
                    self.write_segment(f, ending.segment())?;
                }
                write!(f, "}}")
            }
            VoiceElement::RestMeasures(id) => {
                let rests = self.rest_measures(id);
                write!(f, "rests({})", rests.count())?;
                self.write_segment(f, rests.pattern())
            }
            VoiceElement::MeasuresRepeat(id) => {
                let measures_repeat = self.measures_repeat(id);
                write!(
                    f,
                    "measures-repeat({} x{})",
                    measures_repeat.pattern_length(),
                    measures_repeat.replica_count(self.nodes())
                )?;
                self.write_segment(f, measures_repeat.pattern())?;
                self.write_segment(f, measures_repeat.replicas())
            }
        }
    }

    fn write_elements(&self, f: &mut fmt::Formatter<'_>, elements: &[VoiceElement]) -> fmt::Result {
        for (i, element) in elements.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            self.write_element(f, *element)?;
        }
        Ok(())
    }

    fn write_segment(&self, f: &mut fmt::Formatter<'_>, id: SegmentId) -> fmt::Result {
        write!(f, "[")?;
        for (i, measure) in self.segment(id).measures().iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            let measure = self.measure(*measure);
            write!(f, "{}", measure.number())?;
            if measure.is_continuation() {
                write!(f, "+")?;
            }
        }
        write!(f, "]")
    }
}

impl fmt::Display for VoiceTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elements: Vec<VoiceElement> = self.elements().collect();
        self.write_elements(f, &elements)
    }
}

impl fmt::Debug for VoiceTree<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceTree")
            .field("voice", &self.voice.number)
            .field("outline", &self.to_string())
            .finish()
    }
}
