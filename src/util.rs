use crate::Voice;
use crate::VoiceOptions;
use crate::parse_events;
use crate::replay_events;
use pretty_assertions::assert_eq;

/// Parses and replays `script` into a finalized voice.
pub fn build_voice(script: &str, options: VoiceOptions) -> Voice {
    let _ = env_logger::try_init();
    let file = parse_events(script).expect("Failed to parse script");
    replay_events(&file, 1, options).expect("Failed to build voice")
}

/// Builds `script` with default options and compares the outline of the finished
/// voice with `expected`. Also checks that every `newMeasure` event is accounted for
/// and that no repeat is left open.
pub fn assert_outline(script: &str, expected: &str) -> Voice {
    let voice = build_voice(script, VoiceOptions::default());
    {
        let tree = voice.tree().expect("Voice is not finalized");
        assert_eq!(tree.to_string(), expected);
        assert_eq!(
            tree.announced_measure_count() + voice.absorbed_measure_count(),
            voice.measure_events_count(),
            "measure events not conserved in {}",
            tree
        );
    }
    assert_eq!(voice.repeat_depth(), 0);
    voice
}
