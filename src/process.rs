use crate::EventFile;
use crate::Voice;
use crate::VoiceError;
use crate::VoiceOptions;
use crate::types::event::{EventLine, VoiceEvent};
use anyhow::{Context, Result};

/// Feeds every event of `file` into a new voice and finalizes it.
pub fn replay_events(file: &EventFile, voice_number: u32, options: VoiceOptions) -> Result<Voice> {
    let mut voice = Voice::new(voice_number, 1, options);

    for line in &file.events {
        apply_event(&mut voice, line).with_context(|| format!("Line #{}", line.input_line))?;
    }
    voice
        .finalize_voice()
        .with_context(|| format!("Finalizing voice {}", voice_number))?;

    Ok(voice)
}

/// Applies a single event to `voice`.
pub fn apply_event(voice: &mut Voice, line: &EventLine) -> Result<(), VoiceError> {
    let input_line = line.input_line;

    match &line.event {
        VoiceEvent::Measure { number, implicit } => voice
            .create_measure_and_append_it_to_voice(number, *implicit, input_line)
            .map(|_| ()),
        VoiceEvent::NextMeasureNumber { number } => voice.set_next_measure_number_in_voice(number),

        VoiceEvent::Element(element) => voice.append_element_to_voice(element.clone(), input_line),
        VoiceEvent::Forward { duration } => voice.advance_position_in_voice(*duration, input_line),
        VoiceEvent::EndMeasure => voice
            .finalize_current_measure_in_voice(input_line)
            .map(|_| ()),

        VoiceEvent::RepeatStart => voice.handle_repeat_start_in_voice(input_line),
        VoiceEvent::RepeatEnd {
            measure_number,
            times,
        } => voice.handle_repeat_end_in_voice(measure_number, *times, input_line),
        VoiceEvent::EndingStart => voice.handle_repeat_ending_start_in_voice(input_line),
        VoiceEvent::EndingEnd { label, kind } => {
            voice.handle_repeat_ending_end_in_voice(label, *kind, input_line)
        }

        VoiceEvent::RestMeasuresStart { count } => {
            voice.create_rest_measures_in_voice(*count, input_line)
        }
        VoiceEvent::RestMeasuresStop => voice.append_pending_rest_measures_to_voice(input_line),
        VoiceEvent::MeasuresRepeatStart {
            pattern_length,
            slashes,
        } => voice.create_measures_repeat_from_its_first_measures_in_voice(
            *pattern_length as usize,
            *slashes,
            input_line,
        ),
        VoiceEvent::MeasuresRepeatStop => voice.append_pending_measures_repeat_to_voice(input_line),

        VoiceEvent::EmptyLine => Ok(()),
    }
}
