use super::Voice;
use crate::error::{VoiceError, VoiceWarning};
use crate::ir::{
    MeasureId, Repeat, RepeatBuildPhase, RepeatDescr, RepeatEnding, RepeatId, RepeatPhaseEvent,
    VoiceElement,
};
use crate::types::event::RepeatEndingKind;

impl Voice {
    /// Forward repeat barline.
    pub fn handle_repeat_start_in_voice(&mut self, input_line: usize) -> Result<(), VoiceError> {
        self.guarded("repeat start", |voice| voice.handle_repeat_start(input_line))
    }

    /// Backward repeat barline, closing the innermost repeat or creating one retroactively.
    pub fn handle_repeat_end_in_voice(
        &mut self,
        measure_number: &str,
        times: u32,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("repeat end", |voice| {
            voice.handle_repeat_end(measure_number, times, input_line)
        })
    }

    pub fn handle_repeat_ending_start_in_voice(
        &mut self,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("repeat ending start", |voice| {
            voice.handle_ending_start(input_line)
        })
    }

    pub fn handle_repeat_ending_end_in_voice(
        &mut self,
        label: &str,
        kind: RepeatEndingKind,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.guarded("repeat ending end", |voice| {
            voice.handle_ending_end(label, kind, input_line)
        })
    }

    fn handle_repeat_start(&mut self, input_line: usize) -> Result<(), VoiceError> {
        self.cut_pending_compression_short(input_line)?;
        self.complete_repeats_past_their_endings()?;
        if self.open_ending_input_line().is_some() {
            self.warn(VoiceWarning::UnsupportedInsideEnding {
                what: "repeat start",
                input_line,
            });
            return Ok(());
        }

        let carried = self.carry_last_measure_into_repeat(input_line)?;
        self.close_last_segment_into_scope()?;

        let repeat = self
            .nodes
            .add_repeat(Repeat::new(self.number, true, input_line));
        self.repeat_stack.push(RepeatDescr::new(repeat, input_line));
        self.seed_open_segment(carried);

        if self.options.trace_repeats {
            log::debug!(
                "voice {}: line {}: {} started, depth {}",
                self.number,
                input_line,
                repeat,
                self.repeat_stack.len()
            );
        }
        Ok(())
    }

    /// Takes the measure a repeat starting now begins with out of the open segment.
    /// A partially filled measure is split: it stays where it is and an empty
    /// continuation with the same number starts the repeat.
    fn carry_last_measure_into_repeat(
        &mut self,
        input_line: usize,
    ) -> Result<Option<MeasureId>, VoiceError> {
        let Some(segment) = self.last_segment else {
            return Ok(None);
        };
        let Some(last) = self.nodes[segment].last_measure() else {
            return Ok(None);
        };

        let measure = &self.nodes[last];
        if measure.is_finalized() {
            return Ok(None);
        }
        if measure.is_musically_empty() {
            return Ok(self.nodes[segment].remove_last_measure());
        }

        let continuation = measure.continuation(input_line);
        self.nodes[last].finalize()?;
        let id = self.nodes.add_measure(continuation);
        self.current_measure = Some(id);
        if self.options.trace_measures {
            log::debug!(
                "voice {}: line {}: measure {} split by a repeat start",
                self.number,
                input_line,
                self.nodes[id].number()
            );
        }
        Ok(Some(id))
    }

    fn handle_repeat_end(
        &mut self,
        measure_number: &str,
        times: u32,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.cut_pending_compression_short(input_line)?;

        loop {
            let Some(descr) = self.repeat_stack.last().copied() else {
                return self.create_implicit_repeat(measure_number, times, input_line);
            };
            let repeat = descr.repeat;

            if descr.has_open_ending() {
                self.nodes[repeat].record_end(measure_number, times, input_line);
                self.trace_deferred_end(repeat, input_line);
                return Ok(());
            }

            match self.nodes[repeat].phase() {
                RepeatBuildPhase::InEndings => {
                    let end_seen = self.nodes[repeat].times().is_some();
                    if end_seen || self.open_segment_has_announced_measures() {
                        // the endings are over, this end belongs to an enclosing repeat
                        self.complete_repeat(repeat, "repeat end after endings")?;
                        continue;
                    }
                    self.nodes[repeat].record_end(measure_number, times, input_line);
                    if self.last_ending_is_hooked(repeat) {
                        self.trace_deferred_end(repeat, input_line);
                        return Ok(());
                    }
                    return self.complete_repeat(repeat, "repeat end");
                }
                RepeatBuildPhase::JustCreated
                | RepeatBuildPhase::InCommonPart
                | RepeatBuildPhase::Completed => {
                    self.close_last_segment_into_scope()?;
                    self.nodes[repeat].record_end(measure_number, times, input_line);
                    return self.complete_repeat(repeat, "repeat end");
                }
            }
        }
    }

    fn trace_deferred_end(&self, repeat: RepeatId, input_line: usize) {
        if self.options.trace_repeats {
            log::debug!(
                "voice {}: line {}: end of {} deferred until its endings are over",
                self.number,
                input_line,
                repeat
            );
        }
    }

    fn last_ending_is_hooked(&self, repeat: RepeatId) -> bool {
        self.nodes[repeat]
            .endings()
            .last()
            .is_some_and(RepeatEnding::is_hooked)
    }

    fn open_segment_has_announced_measures(&self) -> bool {
        self.last_segment.is_some_and(|segment| {
            self.nodes[segment]
                .measures()
                .iter()
                .any(|measure| !self.nodes[*measure].is_continuation())
        })
    }

    /// A repeat-end with no open repeat: everything back to the latest explicitly
    /// started repeat becomes the common part of a repeat with no start barline.
    fn create_implicit_repeat(
        &mut self,
        measure_number: &str,
        times: u32,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.close_last_segment_into_scope()?;
        if self.implicit_repeat_start() == self.initial_elements.len() {
            self.warn(VoiceWarning::RepeatEndWithoutContent { input_line });
            return Ok(());
        }
        let repeat = self.drain_voice_into_implicit_repeat(input_line)?;
        self.nodes[repeat].record_end(measure_number, times, input_line);
        self.nodes[repeat].complete()?;
        self.initial_elements.push(VoiceElement::Repeat(repeat));

        if self.options.trace_repeats {
            log::debug!(
                "voice {}: line {}: implicit {} created with {} elements",
                self.number,
                input_line,
                repeat,
                self.nodes[repeat].common_part().elements().len()
            );
        }
        Ok(())
    }

    /// Index of the first initial element after the latest explicitly started repeat.
    fn implicit_repeat_start(&self) -> usize {
        self.initial_elements
            .iter()
            .rposition(|element| match element {
                VoiceElement::Repeat(repeat) => self.nodes[*repeat].is_explicit_start(),
                _ => false,
            })
            .map_or(0, |index| index + 1)
    }

    fn drain_voice_into_implicit_repeat(
        &mut self,
        input_line: usize,
    ) -> Result<RepeatId, VoiceError> {
        let kept = self.implicit_repeat_start();
        let mut repeat = Repeat::new(self.number, false, input_line);
        for element in self.initial_elements.drain(kept..) {
            repeat.append_to_common_part(element)?;
        }
        Ok(self.nodes.add_repeat(repeat))
    }

    fn handle_ending_start(&mut self, input_line: usize) -> Result<(), VoiceError> {
        self.cut_pending_compression_short(input_line)?;

        loop {
            let Some(descr) = self.repeat_stack.last().copied() else {
                let carried = self.carry_empty_measure_into_ending();
                self.close_last_segment_into_scope()?;
                let repeat = self.drain_voice_into_implicit_repeat(input_line)?;
                self.repeat_stack.push(RepeatDescr::new(repeat, input_line));
                self.seed_open_segment(carried);
                return self.open_ending(repeat, input_line);
            };
            let repeat = descr.repeat;

            if let Some(start_input_line) = descr.open_ending_input_line {
                self.warn(VoiceWarning::UnterminatedEnding { start_input_line });
                let label = (self.nodes[repeat].endings().len() + 1).to_string();
                self.close_ending(repeat, &label, RepeatEndingKind::Hookless, input_line)?;
            }

            if self.nodes[repeat].phase() == RepeatBuildPhase::InEndings {
                if !self.open_segment_can_start_ending() {
                    self.complete_repeat(repeat, "ending start after endings")?;
                    continue;
                }
            } else {
                let carried = self.carry_empty_measure_into_ending();
                self.close_last_segment_into_scope()?;
                self.seed_open_segment(carried);
            }
            return self.open_ending(repeat, input_line);
        }
    }

    /// The empty last measure of a multi-measure open segment belongs to the ending
    /// about to start rather than to the common part.
    fn carry_empty_measure_into_ending(&mut self) -> Option<MeasureId> {
        let segment = self.last_segment?;
        if self.nodes[segment].measures_count() < 2 {
            return None;
        }
        let last = self.nodes[segment].last_measure()?;
        let measure = &self.nodes[last];
        if measure.is_finalized() || !measure.is_musically_empty() {
            return None;
        }
        self.nodes[segment].remove_last_measure()
    }

    fn open_segment_can_start_ending(&self) -> bool {
        let Some(segment) = self.last_segment else {
            return true;
        };
        match self.nodes[segment].measures() {
            [] => true,
            [only] => self.nodes[*only].is_musically_empty(),
            _ => false,
        }
    }

    fn open_ending(&mut self, repeat: RepeatId, input_line: usize) -> Result<(), VoiceError> {
        self.nodes[repeat].apply(RepeatPhaseEvent::EndingStart)?;
        if let Some(descr) = self.repeat_stack.last_mut() {
            descr.open_ending_input_line = Some(input_line);
        }
        if self.options.trace_repeats {
            log::debug!(
                "voice {}: line {}: ending {} of {} started",
                self.number,
                input_line,
                self.nodes[repeat].endings().len() + 1,
                repeat
            );
        }
        Ok(())
    }

    fn handle_ending_end(
        &mut self,
        label: &str,
        kind: RepeatEndingKind,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        self.cut_pending_compression_short(input_line)?;

        let Some(descr) = self.repeat_stack.last().copied() else {
            self.warn(VoiceWarning::EndingWithoutRepeat { input_line });
            return Ok(());
        };
        if !descr.has_open_ending() {
            self.warn(VoiceWarning::EndingEndWithoutStart { input_line });
        }
        self.close_ending(descr.repeat, label, kind, input_line)
    }

    /// Turns the open segment into the next ending of `repeat`.
    fn close_ending(
        &mut self,
        repeat: RepeatId,
        label: &str,
        kind: RepeatEndingKind,
        input_line: usize,
    ) -> Result<(), VoiceError> {
        let segment = match self.last_segment.take() {
            Some(segment) => segment,
            None => self.new_segment(),
        };
        let ordinal = self.nodes[repeat].endings().len() + 1;
        self.nodes[repeat].append_ending(RepeatEnding::new(
            label.to_string(),
            ordinal,
            kind,
            segment,
        ))?;
        if let Some(descr) = self.repeat_stack.last_mut() {
            descr.open_ending_input_line = None;
        }

        if self.options.trace_repeats {
            log::debug!(
                "voice {}: line {}: ending {} ({}) of {} closed with {} measures",
                self.number,
                input_line,
                label,
                kind,
                repeat,
                self.nodes[segment].measures_count()
            );
        }
        Ok(())
    }

    /// Marks `repeat` completed, pops it and appends it to the enclosing scope.
    pub(super) fn complete_repeat(
        &mut self,
        repeat: RepeatId,
        context: &'static str,
    ) -> Result<(), VoiceError> {
        self.nodes[repeat].complete()?;
        self.pop_repeat_descr(repeat, context)?;
        self.append_to_innermost_scope(VoiceElement::Repeat(repeat))?;

        if self.options.trace_repeats {
            log::debug!(
                "voice {}: {} completed ({}), depth {}",
                self.number,
                repeat,
                context,
                self.repeat_stack.len()
            );
        }
        Ok(())
    }

    /// Completes the innermost repeats whose endings are all closed.
    pub(super) fn complete_repeats_past_their_endings(&mut self) -> Result<(), VoiceError> {
        while let Some(descr) = self.repeat_stack.last().copied() {
            if descr.has_open_ending()
                || self.nodes[descr.repeat].phase() != RepeatBuildPhase::InEndings
            {
                break;
            }
            self.complete_repeat(descr.repeat, "content after endings")?;
        }
        Ok(())
    }

    /// Closes every repeat still open at the end of the voice.
    pub(super) fn complete_open_repeats(&mut self) -> Result<(), VoiceError> {
        while let Some(descr) = self.repeat_stack.last().copied() {
            let repeat = descr.repeat;
            if let Some(start_input_line) = descr.open_ending_input_line {
                self.warn(VoiceWarning::UnterminatedEnding { start_input_line });
                let label = (self.nodes[repeat].endings().len() + 1).to_string();
                self.close_ending(repeat, &label, RepeatEndingKind::Hookless, start_input_line)?;
            }
            if self.nodes[repeat].phase() != RepeatBuildPhase::InEndings {
                self.close_last_segment_into_scope()?;
            }
            if self.nodes[repeat].times().is_none() {
                self.warn(VoiceWarning::UnterminatedRepeat {
                    start_input_line: descr.start_input_line,
                });
            }
            self.complete_repeat(repeat, "end of voice")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::VoiceOptions;
    use crate::util::{assert_outline, build_voice};

    #[test]
    fn test_simple_repeat() {
        assert_outline(
            r#"
measure 1
note 1 C4
repeat-start
measure 2
note 1 D4
repeat-end 2 x2
"#,
            "[1] repeat(x2){[2]}",
        );
    }

    #[test]
    fn test_repeat_start_before_measure() {
        assert_outline(
            r#"
measure 1
note 1 C4
end-measure
repeat-start
measure 2
note 1 D4
end-measure
measure 3
note 1 E4
repeat-end 3 x3
end-measure
measure 4
note 1 F4
"#,
            "[1] repeat(x3){[2 3]} [4]",
        );
    }

    #[test]
    fn test_two_endings() {
        let voice = assert_outline(
            r#"
repeat-start
measure 1
ending-start
measure 2
ending-end 1 hooked
ending-start
measure 2
ending-end 2 hookless
repeat-end 2 x2
"#,
            "repeat(x2){[1]; ending 1 hooked [2]; ending 2 hookless [2]}",
        );

        let tree = voice.tree().unwrap();
        let Some(VoiceElement::Repeat(repeat)) = tree.elements().next() else {
            panic!("expected a repeat");
        };
        let endings = tree.repeat(repeat).endings();
        assert_eq!(endings.len(), 2);
        assert_eq!(endings[0].ordinal(), 1);
        assert!(endings[0].is_hooked());
        assert_eq!(endings[1].ordinal(), 2);
        assert_eq!(endings[1].kind(), RepeatEndingKind::Hookless);
        assert!(voice.warnings().is_empty());
    }

    #[test]
    fn test_implicit_start() {
        let voice = assert_outline(
            r#"
measure 1
note 1 C4
measure 2
note 1 D4
repeat-end 2 x2
"#,
            "repeat(x2 implicit){[1 2]}",
        );
        let tree = voice.tree().unwrap();
        let repeats = tree.repeats_in_order();
        assert_eq!(repeats.len(), 1);
        assert!(!tree.repeat(repeats[0]).is_explicit_start());
        assert_eq!(tree.repeat(repeats[0]).times(), Some(2));
    }

    #[test]
    fn test_repeat_end_inside_hooked_ending_is_deferred() {
        assert_outline(
            r#"
measure 1
repeat-start
note 1 C4
end-measure
measure 2
ending-start
note 1 D4
repeat-end 2 x2
ending-end 1 hooked
end-measure
measure 3
ending-start
note 1 E4
ending-end 2 hookless
end-measure
measure 4
note 1 F4
end-measure
"#,
            "repeat(x2){[1]; ending 1 hooked [2]; ending 2 hookless [3]} [4]",
        );
    }

    #[test]
    fn test_repeat_end_after_hooked_ending_waits_for_next_ending() {
        assert_outline(
            r#"
repeat-start
measure 1
note 1 C4
end-measure
measure 2
ending-start
note 1 D4
ending-end 1 hooked
repeat-end 2 x2
end-measure
measure 3
ending-start
note 1 E4
ending-end 2 hookless
end-measure
"#,
            "repeat(x2){[1]; ending 1 hooked [2]; ending 2 hookless [3]}",
        );
    }

    #[test]
    fn test_nested_explicit_repeats() {
        assert_outline(
            r#"
measure 1
repeat-start
note 1 C4
end-measure
measure 2
repeat-start
note 1 D4
end-measure
measure 3
note 1 E4
repeat-end 3 x2
end-measure
measure 4
note 1 F4
repeat-end 4 x3
end-measure
"#,
            "repeat(x3){[1] repeat(x2){[2 3]} [4]}",
        );
    }

    #[test]
    fn test_implicit_repeat_contains_earlier_implicit_one() {
        assert_outline(
            r#"
measure 1
note 1 C4
measure 2
note 1 D4
repeat-end 2 x2
end-measure
measure 3
note 1 E4
repeat-end 3 x2
end-measure
"#,
            "repeat(x2 implicit){repeat(x2 implicit){[1 2]} [3]}",
        );
    }

    #[test]
    fn test_explicit_repeat_stays_sibling_of_following_implicit_one() {
        assert_outline(
            r#"
measure 1
repeat-start
note 1 C4
repeat-end 1 x2
end-measure
measure 2
note 1 D4
repeat-end 2 x2
end-measure
"#,
            "repeat(x2){[1]} repeat(x2 implicit){[2]}",
        );
    }

    #[test]
    fn test_mid_measure_repeat_start_splits_the_measure() {
        let voice = assert_outline(
            r#"
measure 1
note 1/2 C4
repeat-start
note 1/2 D4
end-measure
measure 2
note 1 E4
repeat-end 2 x2
end-measure
"#,
            "[1] repeat(x2){[1+ 2]}",
        );
        let tree = voice.tree().unwrap();
        let measures = tree.measures_in_order();
        assert_eq!(measures.len(), 3);
        let continuation = tree.measure(measures[1]);
        assert_eq!(continuation.number(), "1");
        assert_eq!(continuation.items().len(), 1);
        assert_eq!(continuation.items()[0].position, crate::WholeNotes::new(1, 2));
        assert_eq!(tree.announced_measure_count(), 2);
    }

    #[test]
    fn test_clef_only_measure_moves_into_the_repeat() {
        let voice = assert_outline(
            r#"
measure 1
note 1 C4
end-measure
measure 2
clef bass
repeat-start
note 1 C3
end-measure
measure 3
note 1 D3
repeat-end 3 x2
end-measure
"#,
            "[1] repeat(x2){[2 3]}",
        );
        let tree = voice.tree().unwrap();
        let second = tree.measure(tree.measures_in_order()[1]);
        assert_eq!(second.number(), "2");
        assert_eq!(second.items().len(), 2);
    }

    #[test]
    fn test_ending_start_without_repeat_creates_implicit_repeat() {
        assert_outline(
            r#"
measure 1
note 1 C4
end-measure
measure 2
ending-start
note 1 D4
repeat-end 2 x2
ending-end 1 hooked
end-measure
measure 3
ending-start
note 1 E4
ending-end 2 hookless
end-measure
"#,
            "repeat(x2 implicit){[1]; ending 1 hooked [2]; ending 2 hookless [3]}",
        );
    }

    #[test]
    fn test_content_after_endings_closes_the_repeat() {
        assert_outline(
            r#"
repeat-start
measure 1
note 1 C4
end-measure
measure 2
ending-start
note 1 D4
ending-end 1 hooked
repeat-end 2 x2
end-measure
measure 3
note 1 E4
end-measure
measure 4
note 1 F4
repeat-end 4 x2
end-measure
"#,
            "repeat(x2){[1]; ending 1 hooked [2]} repeat(x2 implicit){[3 4]}",
        );
    }

    #[test]
    fn test_unterminated_repeat_warns() {
        let voice = assert_outline(
            r#"
measure 1
note 1 C4
end-measure
repeat-start
measure 2
note 1 D4
end-measure
"#,
            "[1] repeat(x?){[2]}",
        );
        assert_eq!(
            voice.warnings(),
            &[VoiceWarning::UnterminatedRepeat {
                start_input_line: 5
            }]
        );
    }

    #[test]
    fn test_unterminated_ending_is_closed_hookless() {
        let voice = assert_outline(
            r#"
repeat-start
measure 1
note 1 C4
end-measure
measure 2
ending-start
note 1 D4
repeat-end 2 x2
end-measure
"#,
            "repeat(x2){[1]; ending 1 hookless [2]}",
        );
        assert_eq!(
            voice.warnings(),
            &[VoiceWarning::UnterminatedEnding {
                start_input_line: 7
            }]
        );
    }

    #[test]
    fn test_ending_end_outside_of_repeat_is_ignored() {
        let voice = assert_outline(
            r#"
measure 1
note 1 C4
ending-end 1 hooked
"#,
            "[1]",
        );
        assert_eq!(
            voice.warnings(),
            &[VoiceWarning::EndingWithoutRepeat { input_line: 4 }]
        );
    }

    #[test]
    fn test_second_repeat_end_with_nothing_to_repeat_is_ignored() {
        let voice = assert_outline(
            r#"
repeat-start
measure 1
note 1 C4
repeat-end 1 x2
repeat-end 1 x2
"#,
            "repeat(x2){[1]}",
        );
        assert_eq!(
            voice.warnings(),
            &[VoiceWarning::RepeatEndWithoutContent { input_line: 6 }]
        );
        assert_eq!(voice.tree().unwrap().repeats_in_order().len(), 1);
    }

    #[test]
    fn test_repeat_start_inside_ending_is_ignored() {
        let voice = assert_outline(
            r#"
repeat-start
measure 1
note 1 C4
end-measure
measure 2
ending-start
repeat-start
note 1 D4
ending-end 1 hookless
repeat-end 2 x2
"#,
            "repeat(x2){[1]; ending 1 hookless [2]}",
        );
        assert_eq!(
            voice.warnings(),
            &[VoiceWarning::UnsupportedInsideEnding {
                what: "repeat start",
                input_line: 8
            }]
        );
    }

    #[test]
    fn test_stack_is_empty_after_finalize() {
        let voice = build_voice(
            r#"
repeat-start
measure 1
note 1 C4
end-measure
repeat-start
measure 2
"#,
            VoiceOptions::default(),
        );
        assert_eq!(voice.repeat_depth(), 0);
        assert_eq!(voice.warnings().len(), 2);
        assert_eq!(
            voice.tree().unwrap().to_string(),
            "repeat(x?){[1] repeat(x?){[2]}}"
        );
    }
}
