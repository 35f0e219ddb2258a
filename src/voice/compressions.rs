use super::{NextNumberTarget, PendingCompression, Voice};
use crate::error::{VoiceError, VoiceWarning};
use crate::ir::{MeasuresRepeat, MeasuresRepeatId, RestMeasures, RestMeasuresId, VoiceElement};

const REST_MEASURES: &str = "rest measures";
const MEASURES_REPEAT: &str = "measures repeat";

impl Voice {
    /// Multiple rest start: the current measure becomes the pattern of a rest measures
    /// construct, and the next `count - 1` measures are absorbed into it.
    pub fn create_rest_measures_in_voice(
        &mut self,
        count: u32,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("create rest measures", |voice| {
            voice.create_rest_measures(count, input_line)
        })
    }

    pub fn append_pending_rest_measures_to_voice(
        &mut self,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("append rest measures", |voice| {
            if !voice.options.compress_rest_measures || voice.take_skipped(REST_MEASURES) {
                return Ok(());
            }
            match voice.pending_compression {
                Some(PendingCompression::RestMeasures { id, .. }) => {
                    voice.finalize_open_measure()?;
                    voice.close_rest_measures(id, input_line)
                }
                _ => Err(VoiceError::NoPendingCompression {
                    expected: REST_MEASURES,
                }),
            }
        })
    }

    /// Measures repeat start, announced on the first replica: the `pattern_length`
    /// measures before it become the pattern.
    pub fn create_measures_repeat_from_its_first_measures_in_voice(
        &mut self,
        pattern_length: usize,
        slashes: u32,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("create measures repeat", |voice| {
            voice.create_measures_repeat(pattern_length, slashes, input_line)
        })
    }

    pub fn append_pending_measures_repeat_to_voice(
        &mut self,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("append measures repeat", |voice| {
            if !voice.options.compress_measures_repeats || voice.take_skipped(MEASURES_REPEAT) {
                return Ok(());
            }
            match voice.pending_compression {
                Some(PendingCompression::MeasuresRepeat { id }) => {
                    voice.finalize_open_measure()?;
                    voice.close_measures_repeat(id, input_line)
                }
                _ => Err(VoiceError::NoPendingCompression {
                    expected: MEASURES_REPEAT,
                }),
            }
        })
    }

    pub(super) fn is_absorbing_measures(&self) -> bool {
        matches!(
            self.pending_compression,
            Some(PendingCompression::RestMeasures {
                absorbing: true,
                ..
            })
        )
    }

    fn take_skipped(&mut self, what: &'static str) -> bool {
        if self.skipped_compression == Some(what) {
            self.skipped_compression = None;
            return true;
        }
        false
    }

    /// Checks shared by both compression starts. `false` means the start is ignored.
    fn can_start_compression(
        &mut self,
        what: &'static str,
        input_line: usize,
    ) -> Result<bool, VoiceError> {
        self.skipped_compression = None;
        if let Some(pending) = self.pending_compression {
            return Err(VoiceError::CompressionAlreadyPending {
                requested: what,
                pending: pending.name(),
            });
        }
        if self.open_ending_input_line().is_some() {
            self.warn(VoiceWarning::UnsupportedInsideEnding { what, input_line });
            self.skipped_compression = Some(what);
            return Ok(false);
        }
        Ok(true)
    }

    fn create_rest_measures(&mut self, count: u32, input_line: usize) -> Result<(), VoiceError> {
        if !self.options.compress_rest_measures
            || !self.can_start_compression(REST_MEASURES, input_line)?
        {
            return Ok(());
        }

        let measure = self
            .last_segment
            .and_then(|segment| self.nodes[segment].remove_last_measure())
            .ok_or(VoiceError::NoCurrentMeasure {
                operation: "create rest measures",
            })?;
        self.close_last_segment_into_scope()?;

        let pattern = self.new_segment();
        self.nodes[pattern].append_measure(measure);
        let full_measure_whole_notes = self.nodes[measure].full_measure_whole_notes();
        let id = self.nodes.add_rest_measures(RestMeasures::new(
            count,
            full_measure_whole_notes,
            pattern,
        ));
        self.pending_compression = Some(PendingCompression::RestMeasures {
            id,
            remaining: count.saturating_sub(1),
            absorbing: false,
        });

        if self.options.trace_compressions {
            log::debug!(
                "voice {}: line {}: rest measures of {} started on measure {}",
                self.number,
                input_line,
                count,
                self.nodes[measure].number()
            );
        }
        Ok(())
    }

    /// Consumes a `newMeasure` event into pending rest measures. Returns `true` when the
    /// measure was absorbed; closes the rest measures when all of them have been seen.
    pub(super) fn absorb_measure_in_rest_measures(
        &mut self,
        number: &str,
        input_line: usize,
    ) -> Result<bool, VoiceError> {
        let Some(PendingCompression::RestMeasures { id, remaining, .. }) =
            self.pending_compression
        else {
            return Ok(false);
        };

        if remaining == 0 {
            self.finalize_open_measure()?;
            self.close_rest_measures(id, input_line)?;
            return Ok(false);
        }

        self.finalize_open_measure()?;
        self.pending_compression = Some(PendingCompression::RestMeasures {
            id,
            remaining: remaining - 1,
            absorbing: true,
        });
        self.absorbed_measure_count += 1;
        self.current_measure = None;
        self.current_measure_number = number.to_string();

        if self.options.trace_compressions {
            log::debug!(
                "voice {}: line {}: measure {} absorbed, {} to go",
                self.number,
                input_line,
                number,
                remaining - 1
            );
        }
        Ok(true)
    }

    /// Leaves the open measure as it is.
    fn close_rest_measures(&mut self, id: RestMeasuresId, input_line: usize) -> Result<(), VoiceError> {
        self.pending_compression = None;
        self.nodes[id].complete();
        self.append_to_scope(VoiceElement::RestMeasures(id))?;
        self.awaiting_next_number = Some(NextNumberTarget::RestMeasures(id));

        if self.options.trace_compressions {
            log::debug!(
                "voice {}: line {}: rest measures of {} closed",
                self.number,
                input_line,
                self.nodes[id].count()
            );
        }
        Ok(())
    }

    fn create_measures_repeat(
        &mut self,
        pattern_length: usize,
        slashes: u32,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        if !self.options.compress_measures_repeats
            || !self.can_start_compression(MEASURES_REPEAT, input_line)?
        {
            return Ok(());
        }

        let needed = pattern_length + 1;
        let available = self
            .last_segment
            .map_or(0, |segment| self.nodes[segment].measures_count());
        let taken = self
            .last_segment
            .filter(|_| available >= needed)
            .and_then(|segment| self.nodes[segment].remove_last_measures(needed));
        let Some(mut measures) = taken else {
            self.warn(VoiceWarning::MeasuresRepeatPatternTooShort {
                needed,
                available,
                input_line,
            });
            self.skipped_compression = Some(MEASURES_REPEAT);
            return Ok(());
        };

        let replicas = self.new_segment();
        if let Some(first_replica) = measures.pop() {
            self.nodes[replicas].append_measure(first_replica);
        }
        let pattern = self.new_segment();
        for measure in measures {
            self.nodes[pattern].append_measure(measure);
        }
        self.close_last_segment_into_scope()?;

        let id = self.nodes.add_measures_repeat(MeasuresRepeat::new(
            pattern_length,
            slashes,
            pattern,
            replicas,
        ));
        self.pending_compression = Some(PendingCompression::MeasuresRepeat { id });

        if self.options.trace_compressions {
            log::debug!(
                "voice {}: line {}: measures repeat of {} measures started",
                self.number,
                input_line,
                pattern_length
            );
        }
        Ok(())
    }

    fn close_measures_repeat(
        &mut self,
        id: MeasuresRepeatId,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.pending_compression = None;
        self.nodes[id].complete();
        self.append_to_scope(VoiceElement::MeasuresRepeat(id))?;
        self.awaiting_next_number = Some(NextNumberTarget::MeasuresRepeat(id));

        if self.options.trace_compressions {
            log::debug!(
                "voice {}: line {}: measures repeat closed with {} replicas",
                self.number,
                input_line,
                self.nodes[id].replica_count(&self.nodes)
            );
        }
        Ok(())
    }

    /// Closes whichever compression is pending and returns it.
    pub(super) fn close_pending_compression(
        &mut self,
        input_line: usize,
    ) -> Result<Option<PendingCompression>, VoiceError> {
        let pending = self.pending_compression;
        match pending {
            Some(PendingCompression::RestMeasures { id, .. }) => {
                self.close_rest_measures(id, input_line)?
            }
            Some(PendingCompression::MeasuresRepeat { id }) => {
                self.close_measures_repeat(id, input_line)?
            }
            None => {}
        }
        Ok(pending)
    }

    /// A repeat or ending barline ends the pending compression. The measure it falls in
    /// stays open for the caller, and the stop event that follows is ignored.
    pub(super) fn cut_pending_compression_short(
        &mut self,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        let Some(pending) = self.close_pending_compression(input_line)? else {
            return Ok(());
        };
        self.skipped_compression = Some(pending.name());
        if self.options.trace_compressions {
            log::debug!(
                "voice {}: line {}: {} closed by a repeat barline",
                self.number,
                input_line,
                pending.name()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VoiceOptions;
    use crate::util::{assert_outline, build_voice};
    use crate::{Voice, WholeNotes};
    use crate::types::element::Note;

    #[test]
    fn test_rest_measures_compression() {
        let voice = assert_outline(
            r#"
measure 1
rest-measures 4
rest 1
measure 2
rest-measures-stop
measure next
"#,
            "rests(4)[1] [next]",
        );

        let tree = voice.tree().unwrap();
        let Some(VoiceElement::RestMeasures(id)) = tree.elements().next() else {
            panic!("expected rest measures first");
        };
        let rests = tree.rest_measures(id);
        assert_eq!(rests.count(), 4);
        assert_eq!(tree.segment(rests.pattern()).measures_count(), 1);
        assert_eq!(rests.next_measure_number(), Some("next"));
        assert_eq!(voice.absorbed_measure_count(), 1);
        assert!(voice.warnings().is_empty());
    }

    #[test]
    fn test_rest_measures_close_when_count_is_reached() {
        let voice = assert_outline(
            r#"
measure 1
rest-measures 3
rest 1
end-measure
measure 2
rest 1
end-measure
measure 3
rest 1
end-measure
measure 4
note 1 C4
"#,
            "rests(3)[1] [4]",
        );
        assert_eq!(voice.absorbed_measure_count(), 2);
        assert_eq!(voice.measure_events_count(), 4);
    }

    #[test]
    fn test_rest_measures_inside_repeat() {
        assert_outline(
            r#"
repeat-start
measure 1
rest-measures 2
rest 1
end-measure
measure 2
end-measure
measure 3
note 1 C4
repeat-end 3 x2
end-measure
"#,
            "repeat(x2){rests(2)[1] [3]}",
        );
    }

    #[test]
    fn test_measures_repeat_inside_repeat() {
        assert_outline(
            r#"
repeat-start
measure 1
note 1 C4
end-measure
measure 2
note 1 D4
end-measure
measure 3
measures-repeat 1
end-measure
measure 4
end-measure
measures-repeat-stop
measure 5
note 1 E4
repeat-end 5 x2
end-measure
"#,
            "repeat(x2){[1] measures-repeat(1 x2)[2][3 4] [5]}",
        );
    }

    #[test]
    fn test_repeat_end_closes_pending_rest_measures() {
        let voice = assert_outline(
            r#"
repeat-start
measure 1
rest-measures 2
rest 1
end-measure
measure 2
repeat-end 2 x2
rest-measures-stop
measure 3
"#,
            "repeat(x2){rests(2)[1]} [3]",
        );
        assert!(voice.warnings().is_empty());

        let tree = voice.tree().unwrap();
        let Some(VoiceElement::Repeat(repeat)) = tree.elements().next() else {
            panic!("expected a repeat first");
        };
        let [VoiceElement::RestMeasures(id)] = tree.repeat(repeat).common_part().elements()[..]
        else {
            panic!("expected rest measures in the common part");
        };
        assert_eq!(tree.rest_measures(id).next_measure_number(), Some("3"));
    }

    #[test]
    fn test_repeat_end_closes_pending_measures_repeat() {
        let voice = assert_outline(
            r#"
repeat-start
measure 1
note 1 C4
end-measure
measure 2
measures-repeat 1
end-measure
measure 3
repeat-end 3 x2
end-measure
measures-repeat-stop
"#,
            "repeat(x2){measures-repeat(1 x2)[1][2 3]}",
        );
        assert!(voice.warnings().is_empty());

        let tree = voice.tree().unwrap();
        let last = tree.measures_in_order()[2];
        assert_eq!(tree.measure(last).number(), "3");
        assert!(tree.measure(last).is_finalized());
    }

    #[test]
    fn test_compression_after_one_closed_by_repeat_end() {
        assert_outline(
            r#"
repeat-start
measure 1
rest-measures 2
rest 1
end-measure
measure 2
repeat-end 2 x2
measure 3
rest-measures 2
rest 1
end-measure
measure 4
rest-measures-stop
measure 5
"#,
            "repeat(x2){rests(2)[1]} rests(2)[3] [5]",
        );
    }

    #[test]
    fn test_rest_measures_follow_plain_measures() {
        assert_outline(
            r#"
measure 1
note 1 C4
end-measure
measure 2
rest-measures 2
rest 1
end-measure
measure 3
end-measure
measure 4
note 1 D4
"#,
            "[1] rests(2)[2] [4]",
        );
    }

    #[test]
    fn test_rest_measures_disabled() {
        let options = VoiceOptions {
            compress_rest_measures: false,
            ..VoiceOptions::default()
        };
        let voice = build_voice(
            r#"
measure 1
rest-measures 2
rest 1
measure 2
rest 1
rest-measures-stop
measure 3
"#,
            options,
        );
        assert_eq!(voice.tree().unwrap().to_string(), "[1 2 3]");
        assert_eq!(voice.absorbed_measure_count(), 0);
    }

    #[test]
    fn test_unterminated_rest_measures_warn() {
        let voice = assert_outline(
            r#"
measure 1
rest-measures 4
rest 1
measure 2
"#,
            "rests(4)[1]",
        );
        assert_eq!(
            voice.warnings(),
            &[VoiceWarning::UnterminatedCompression {
                what: "rest measures"
            }]
        );
    }

    #[test]
    fn test_rest_measures_inside_ending_are_ignored() {
        let voice = assert_outline(
            r#"
repeat-start
measure 1
note 1 C4
end-measure
measure 2
ending-start
rest-measures 2
rest 1
end-measure
rest-measures-stop
ending-end 1 hookless
repeat-end 2 x2
"#,
            "repeat(x2){[1]; ending 1 hookless [2]}",
        );
        assert_eq!(
            voice.warnings(),
            &[VoiceWarning::UnsupportedInsideEnding {
                what: "rest measures",
                input_line: 8
            }]
        );
    }

    #[test]
    fn test_second_pending_compression_is_an_error() {
        let mut voice = Voice::new(1, 1, VoiceOptions::default());
        voice
            .create_measure_and_append_it_to_voice("1", false, 1)
            .unwrap();
        voice.create_rest_measures_in_voice(2, 2).unwrap();
        assert_eq!(
            voice.create_measures_repeat_from_its_first_measures_in_voice(1, 1, 3),
            Err(VoiceError::CompressionAlreadyPending {
                requested: "measures repeat",
                pending: "rest measures",
            })
        );
        assert!(voice.tree().is_err());
    }

    #[test]
    fn test_stop_without_start_is_an_error() {
        let mut voice = Voice::new(1, 1, VoiceOptions::default());
        voice
            .create_measure_and_append_it_to_voice("1", false, 1)
            .unwrap();
        voice
            .append_note_to_voice(Note::rest(WholeNotes::whole(1)), 2)
            .unwrap();
        assert_eq!(
            voice.append_pending_rest_measures_to_voice(3),
            Err(VoiceError::NoPendingCompression {
                expected: "rest measures"
            })
        );
    }

    #[test]
    fn test_measures_repeat() {
        let voice = assert_outline(
            r#"
measure 1
note 1 C4
end-measure
measure 2
note 1 D4
end-measure
measure 3
measures-repeat 1
end-measure
measure 4
end-measure
measures-repeat-stop
measure 5
note 1 E4
"#,
            "[1] measures-repeat(1 x2)[2][3 4] [5]",
        );

        let tree = voice.tree().unwrap();
        let elements: Vec<VoiceElement> = tree.elements().collect();
        let VoiceElement::MeasuresRepeat(id) = elements[1] else {
            panic!("expected a measures repeat, got {:?}", elements);
        };
        let measures_repeat = tree.measures_repeat(id);
        assert_eq!(measures_repeat.pattern_length(), 1);
        assert_eq!(measures_repeat.replica_count(tree.nodes()), 2);
        assert_eq!(measures_repeat.next_measure_number(), Some("5"));
    }

    #[test]
    fn test_measures_repeat_with_two_measure_pattern() {
        assert_outline(
            r#"
measure 1
note 1 C4
end-measure
measure 2
note 1 D4
end-measure
measure 3
measures-repeat 2 slashes=2
end-measure
measure 4
end-measure
measures-repeat-stop
"#,
            "measures-repeat(2 x1)[1 2][3 4]",
        );
    }

    #[test]
    fn test_measures_repeat_pattern_too_short() {
        let voice = assert_outline(
            r#"
measure 1
note 1 C4
end-measure
measure 2
measures-repeat 2
end-measure
measures-repeat-stop
"#,
            "[1 2]",
        );
        assert_eq!(
            voice.warnings(),
            &[VoiceWarning::MeasuresRepeatPatternTooShort {
                needed: 3,
                available: 2,
                input_line: 6
            }]
        );
    }
}
