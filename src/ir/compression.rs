use crate::WholeNotes;
use crate::ir::{Nodes, SegmentId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionPhase {
    /// Still receiving measures.
    Collecting,
    Completed,
}

/// A run of identical silent measures folded into one marker.
#[derive(Debug, Clone)]
pub struct RestMeasures {
    count: u32,
    full_measure_whole_notes: WholeNotes,
    pattern: SegmentId,
    next_measure_number: Option<String>,
    phase: CompressionPhase,
}

impl RestMeasures {
    pub fn new(count: u32, full_measure_whole_notes: WholeNotes, pattern: SegmentId) -> Self {
        Self {
            count,
            full_measure_whole_notes,
            pattern,
            next_measure_number: None,
            phase: CompressionPhase::Collecting,
        }
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn full_measure_whole_notes(&self) -> WholeNotes {
        self.full_measure_whole_notes
    }

    /// Total duration covered by the run.
    pub fn duration(&self) -> WholeNotes {
        self.full_measure_whole_notes.scaled(self.count as u64, 1)
    }

    pub fn pattern(&self) -> SegmentId {
        self.pattern
    }

    pub fn next_measure_number(&self) -> Option<&str> {
        self.next_measure_number.as_deref()
    }

    pub fn set_next_measure_number(&mut self, number: &str) {
        self.next_measure_number = Some(number.to_string());
    }

    pub fn phase(&self) -> CompressionPhase {
        self.phase
    }

    pub fn complete(&mut self) {
        self.phase = CompressionPhase::Completed;
    }
}

/// A short pattern of measures followed by measures repeating it.
#[derive(Debug, Clone)]
pub struct MeasuresRepeat {
    pattern_length: usize,
    slashes: u32,
    pattern: SegmentId,
    replicas: SegmentId,
    next_measure_number: Option<String>,
    phase: CompressionPhase,
}

impl MeasuresRepeat {
    pub fn new(pattern_length: usize, slashes: u32, pattern: SegmentId, replicas: SegmentId) -> Self {
        Self {
            pattern_length,
            slashes,
            pattern,
            replicas,
            next_measure_number: None,
            phase: CompressionPhase::Collecting,
        }
    }

    pub fn pattern_length(&self) -> usize {
        self.pattern_length
    }

    pub fn slashes(&self) -> u32 {
        self.slashes
    }

    pub fn pattern(&self) -> SegmentId {
        self.pattern
    }

    pub fn replicas(&self) -> SegmentId {
        self.replicas
    }

    /// How many times the pattern is replayed by the replica measures.
    pub fn replica_count(&self, nodes: &Nodes) -> usize {
        let pattern_measures = nodes[self.pattern].measures_count();
        if pattern_measures == 0 {
            return 0;
        }
        nodes[self.replicas].measures_count() / pattern_measures
    }

    pub fn next_measure_number(&self) -> Option<&str> {
        self.next_measure_number.as_deref()
    }

    pub fn set_next_measure_number(&mut self, number: &str) {
        self.next_measure_number = Some(number.to_string());
    }

    pub fn phase(&self) -> CompressionPhase {
        self.phase
    }

    pub fn complete(&mut self) {
        self.phase = CompressionPhase::Completed;
    }
}
