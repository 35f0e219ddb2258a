use crate::error::VoiceError;
use crate::ir::{RepeatId, SegmentId, VoiceElement};
use crate::types::event::RepeatEndingKind;

/// Build phase of a [`Repeat`]. Phases only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatBuildPhase {
    JustCreated,
    InCommonPart,
    InEndings,
    Completed,
}

/// What happened to a repeat under construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatPhaseEvent {
    CommonPartContent,
    EndingStart,
    EndingEnd,
    RepeatEnd,
}

impl RepeatBuildPhase {
    /// Next phase after `event`, or an error if the repeat cannot accept it.
    pub fn on(self, event: RepeatPhaseEvent) -> Result<RepeatBuildPhase, VoiceError> {
        use RepeatBuildPhase::*;
        use RepeatPhaseEvent::*;

        match (self, event) {
            (JustCreated | InCommonPart, CommonPartContent) => Ok(InCommonPart),
            (JustCreated | InCommonPart | InEndings, EndingStart | EndingEnd) => Ok(InEndings),
            (JustCreated | InCommonPart | InEndings, RepeatEnd) => Ok(Completed),
            (InEndings, CommonPartContent) | (Completed, _) => {
                Err(VoiceError::InvalidRepeatTransition { phase: self, event })
            }
        }
    }
}

/// The part of a repeat played on every pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepeatCommonPart {
    elements: Vec<VoiceElement>,
}

impl RepeatCommonPart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn elements(&self) -> &[VoiceElement] {
        &self.elements
    }

    pub fn append_element(&mut self, element: VoiceElement) {
        self.elements.push(element);
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepeatEnding {
    label: String,
    ordinal: usize,
    kind: RepeatEndingKind,
    segment: SegmentId,
}

impl RepeatEnding {
    pub fn new(label: String, ordinal: usize, kind: RepeatEndingKind, segment: SegmentId) -> Self {
        Self {
            label,
            ordinal,
            kind,
            segment,
        }
    }

    /// Label as written on the ending bracket, e.g. `1` or `1,2`.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// 1-based position among the repeat's endings.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn kind(&self) -> RepeatEndingKind {
        self.kind
    }

    pub fn is_hooked(&self) -> bool {
        self.kind == RepeatEndingKind::Hooked
    }

    pub fn segment(&self) -> SegmentId {
        self.segment
    }
}

#[derive(Debug, Clone)]
pub struct Repeat {
    voice_number: u32,
    times: Option<u32>,
    explicit_start: bool,
    phase: RepeatBuildPhase,
    common_part: RepeatCommonPart,
    endings: Vec<RepeatEnding>,
    start_input_line: usize,
    end_input_line: Option<usize>,
    end_measure_number: Option<String>,
}

impl Repeat {
    pub fn new(voice_number: u32, explicit_start: bool, start_input_line: usize) -> Self {
        Self {
            voice_number,
            times: None,
            explicit_start,
            phase: RepeatBuildPhase::JustCreated,
            common_part: RepeatCommonPart::new(),
            endings: Vec::new(),
            start_input_line,
            end_input_line: None,
            end_measure_number: None,
        }
    }

    pub fn voice_number(&self) -> u32 {
        self.voice_number
    }

    /// Repeat count from the closing barline, `None` until one was seen.
    pub fn times(&self) -> Option<u32> {
        self.times
    }

    pub fn is_explicit_start(&self) -> bool {
        self.explicit_start
    }

    pub fn phase(&self) -> RepeatBuildPhase {
        self.phase
    }

    pub fn is_completed(&self) -> bool {
        self.phase == RepeatBuildPhase::Completed
    }

    pub fn common_part(&self) -> &RepeatCommonPart {
        &self.common_part
    }

    pub fn endings(&self) -> &[RepeatEnding] {
        &self.endings
    }

    pub fn start_input_line(&self) -> usize {
        self.start_input_line
    }

    pub fn end_input_line(&self) -> Option<usize> {
        self.end_input_line
    }

    pub fn end_measure_number(&self) -> Option<&str> {
        self.end_measure_number.as_deref()
    }

    pub fn apply(&mut self, event: RepeatPhaseEvent) -> Result<(), VoiceError> {
        self.phase = self.phase.on(event)?;
        Ok(())
    }

    pub fn append_to_common_part(&mut self, element: VoiceElement) -> Result<(), VoiceError> {
        self.apply(RepeatPhaseEvent::CommonPartContent)?;
        self.common_part.append_element(element);
        Ok(())
    }

    pub fn append_ending(&mut self, ending: RepeatEnding) -> Result<(), VoiceError> {
        self.apply(RepeatPhaseEvent::EndingEnd)?;
        self.endings.push(ending);
        Ok(())
    }

    /// Records the closing barline without completing the repeat.
    pub fn record_end(&mut self, measure_number: &str, times: u32, input_line: usize) {
        self.times = Some(times);
        self.end_measure_number = Some(measure_number.to_string());
        self.end_input_line = Some(input_line);
    }

    pub fn complete(&mut self) -> Result<(), VoiceError> {
        self.apply(RepeatPhaseEvent::RepeatEnd)
    }
}

/// Entry of the voice's stack of open repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatDescr {
    pub repeat: RepeatId,
    pub start_input_line: usize,
    pub open_ending_input_line: Option<usize>,
}

impl RepeatDescr {
    pub fn new(repeat: RepeatId, start_input_line: usize) -> Self {
        Self {
            repeat,
            start_input_line,
            open_ending_input_line: None,
        }
    }

    pub fn has_open_ending(&self) -> bool {
        self.open_ending_input_line.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use RepeatBuildPhase::*;
    use RepeatPhaseEvent::*;

    #[test]
    fn test_phase_transitions() {
        let table = [
            (JustCreated, CommonPartContent, Some(InCommonPart)),
            (JustCreated, EndingStart, Some(InEndings)),
            (JustCreated, EndingEnd, Some(InEndings)),
            (JustCreated, RepeatEnd, Some(Completed)),
            (InCommonPart, CommonPartContent, Some(InCommonPart)),
            (InCommonPart, EndingStart, Some(InEndings)),
            (InCommonPart, EndingEnd, Some(InEndings)),
            (InCommonPart, RepeatEnd, Some(Completed)),
            (InEndings, CommonPartContent, None),
            (InEndings, EndingStart, Some(InEndings)),
            (InEndings, EndingEnd, Some(InEndings)),
            (InEndings, RepeatEnd, Some(Completed)),
            (Completed, CommonPartContent, None),
            (Completed, EndingStart, None),
            (Completed, EndingEnd, None),
            (Completed, RepeatEnd, None),
        ];

        for (phase, event, expected) in table {
            let result = phase.on(event);
            match expected {
                Some(next) => assert_eq!(result, Ok(next), "{:?} + {:?}", phase, event),
                None => assert_eq!(
                    result,
                    Err(VoiceError::InvalidRepeatTransition { phase, event })
                ),
            }
        }
    }

    #[test]
    fn test_common_part_after_endings_is_rejected() {
        let mut repeat = Repeat::new(1, true, 3);
        repeat
            .append_to_common_part(VoiceElement::Segment(SegmentId(0)))
            .unwrap();
        assert_eq!(repeat.phase(), InCommonPart);

        repeat
            .append_ending(RepeatEnding::new(
                "1".to_string(),
                1,
                RepeatEndingKind::Hooked,
                SegmentId(1),
            ))
            .unwrap();
        assert_eq!(repeat.phase(), InEndings);
        assert!(
            repeat
                .append_to_common_part(VoiceElement::Segment(SegmentId(2)))
                .is_err()
        );
        assert_eq!(repeat.common_part().elements().len(), 1);
    }

    #[test]
    fn test_record_end_keeps_repeat_open() {
        let mut repeat = Repeat::new(1, true, 1);
        repeat.record_end("4", 3, 9);
        assert_eq!(repeat.times(), Some(3));
        assert_eq!(repeat.end_measure_number(), Some("4"));
        assert_eq!(repeat.end_input_line(), Some(9));
        assert!(!repeat.is_completed());

        repeat.complete().unwrap();
        assert!(repeat.is_completed());
        assert!(repeat.complete().is_err());
    }
}
