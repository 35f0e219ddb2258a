//! Intermediate representation nodes of one voice.
//!
//! All nodes live in a [`Nodes`] arena owned by the voice and are addressed through
//! small typed handles. Moving a segment into a repeat part moves its handle; nothing
//! is shared and there are no cycles.

pub mod compression;
pub mod measure;
pub mod repeat;
pub mod segment;

pub use compression::{CompressionPhase, MeasuresRepeat, RestMeasures};
pub use measure::{Measure, MeasureFill, MeasureItem, MeasureOrigin};
pub use repeat::{
    Repeat, RepeatBuildPhase, RepeatCommonPart, RepeatDescr, RepeatEnding, RepeatPhaseEvent,
};
pub use segment::Segment;

use std::fmt;
use std::ops::{Index, IndexMut};

macro_rules! node_handle {
    ($name:ident, $label:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($label, "#{}"), self.0)
            }
        }
    };
}

node_handle!(MeasureId, "measure");
node_handle!(SegmentId, "segment");
node_handle!(RepeatId, "repeat");
node_handle!(RestMeasuresId, "rest-measures");
node_handle!(MeasuresRepeatId, "measures-repeat");

/// One slot of the voice's element lists (initial elements, repeat common parts).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceElement {
    Segment(SegmentId),
    Repeat(RepeatId),
    RestMeasures(RestMeasuresId),
    MeasuresRepeat(MeasuresRepeatId),
}

#[derive(Debug, Default)]
pub struct Nodes {
    measures: Vec<Measure>,
    segments: Vec<Segment>,
    repeats: Vec<Repeat>,
    rest_measures: Vec<RestMeasures>,
    measures_repeats: Vec<MeasuresRepeat>,
}

impl Nodes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_measure(&mut self, measure: Measure) -> MeasureId {
        self.measures.push(measure);
        MeasureId(self.measures.len() - 1)
    }

    pub fn add_segment(&mut self, segment: Segment) -> SegmentId {
        self.segments.push(segment);
        SegmentId(self.segments.len() - 1)
    }

    pub fn add_repeat(&mut self, repeat: Repeat) -> RepeatId {
        self.repeats.push(repeat);
        RepeatId(self.repeats.len() - 1)
    }

    pub fn add_rest_measures(&mut self, rest_measures: RestMeasures) -> RestMeasuresId {
        self.rest_measures.push(rest_measures);
        RestMeasuresId(self.rest_measures.len() - 1)
    }

    pub fn add_measures_repeat(&mut self, measures_repeat: MeasuresRepeat) -> MeasuresRepeatId {
        self.measures_repeats.push(measures_repeat);
        MeasuresRepeatId(self.measures_repeats.len() - 1)
    }

    /// Creates `measure` and appends it to `segment`.
    pub fn create_measure_in_segment(&mut self, segment: SegmentId, measure: Measure) -> MeasureId {
        let id = self.add_measure(measure);
        self[segment].append_measure(id);
        id
    }

    /// Last measure of `segment`, if any.
    pub fn last_measure_of(&self, segment: SegmentId) -> Option<&Measure> {
        self[segment].last_measure().map(|id| &self[id])
    }

    /// Measures of `element` in document order: a repeat yields its common part, then
    /// its endings; compressions yield their pattern, then their replicas.
    pub fn collect_measures(&self, element: VoiceElement, into: &mut Vec<MeasureId>) {
        match element {
            VoiceElement::Segment(segment) => into.extend_from_slice(self[segment].measures()),
            VoiceElement::Repeat(repeat) => {
                let repeat = &self[repeat];
                for inner in repeat.common_part().elements() {
                    self.collect_measures(*inner, into);
                }
                for ending in repeat.endings() {
                    into.extend_from_slice(self[ending.segment()].measures());
                }
            }
            VoiceElement::RestMeasures(rest_measures) => {
                into.extend_from_slice(self[self[rest_measures].pattern()].measures());
            }
            VoiceElement::MeasuresRepeat(measures_repeat) => {
                let measures_repeat = &self[measures_repeat];
                into.extend_from_slice(self[measures_repeat.pattern()].measures());
                into.extend_from_slice(self[measures_repeat.replicas()].measures());
            }
        }
    }

    /// Whether `element` contains no measure at all.
    pub fn is_element_empty(&self, element: VoiceElement) -> bool {
        let mut measures = Vec::new();
        self.collect_measures(element, &mut measures);
        measures.is_empty()
    }
}

macro_rules! node_index {
    ($id:ty, $node:ty, $field:ident) => {
        impl Index<$id> for Nodes {
            type Output = $node;

            fn index(&self, id: $id) -> &Self::Output {
                &self.$field[id.0]
            }
        }

        impl IndexMut<$id> for Nodes {
            fn index_mut(&mut self, id: $id) -> &mut Self::Output {
                &mut self.$field[id.0]
            }
        }
    };
}

node_index!(MeasureId, Measure, measures);
node_index!(SegmentId, Segment, segments);
node_index!(RepeatId, Repeat, repeats);
node_index!(RestMeasuresId, RestMeasures, rest_measures);
node_index!(MeasuresRepeatId, MeasuresRepeat, measures_repeats);
