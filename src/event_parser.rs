use crate::types::element::{
    Barline, BarlineLocation, BarlineStyle, Chord, Clef, Key, KeyMode, MeasureElement, Note,
    Pitch, TimeSignature, Tuplet,
};
use crate::types::event::{EventLine, RepeatEndingKind, VoiceEvent};
use crate::WholeNotes;
use anyhow::{Result, anyhow, bail};

fn parse_duration(part: &str) -> Result<WholeNotes> {
    part.parse()
        .map_err(|_| anyhow!("Invalid duration \"{}\"", part))
}

fn parse_pitch(part: &str) -> Result<Pitch> {
    part.parse().map_err(|_| anyhow!("Invalid pitch \"{}\"", part))
}

fn parse_count(part: &str, what: &str) -> Result<u32> {
    part.parse()
        .map_err(|_| anyhow!("Invalid {} \"{}\"", what, part))
}

fn parse_measure_event(parts: &[&str]) -> Result<VoiceEvent> {
    let number = parts
        .first()
        .ok_or_else(|| anyhow!("Measure event requires a measure number"))?;

    let implicit = match parts.get(1) {
        None => false,
        Some(&"implicit") => true,
        Some(other) => bail!("Unsupported measure attribute \"{}\"", other),
    };
    if parts.len() > 2 {
        bail!("Too many arguments for measure event");
    }

    Ok(VoiceEvent::Measure {
        number: number.to_string(),
        implicit,
    })
}

fn parse_note_event(parts: &[&str]) -> Result<VoiceEvent> {
    if parts.len() != 2 {
        bail!("Note event requires a duration and a pitch");
    }
    let duration = parse_duration(parts[0])?;
    let pitch = parse_pitch(parts[1])?;
    Ok(VoiceEvent::Element(MeasureElement::Note(Note::pitched(
        pitch, duration,
    ))))
}

fn parse_rest_event(parts: &[&str]) -> Result<VoiceEvent> {
    if parts.len() != 1 {
        bail!("Rest event requires a duration");
    }
    let duration = parse_duration(parts[0])?;
    Ok(VoiceEvent::Element(MeasureElement::Note(Note::rest(
        duration,
    ))))
}

fn parse_chord_event(parts: &[&str]) -> Result<VoiceEvent> {
    if parts.len() < 2 {
        bail!("Chord event requires a duration and at least one pitch");
    }
    let duration = parse_duration(parts[0])?;
    let pitches = parts[1..]
        .iter()
        .map(|part| parse_pitch(part))
        .collect::<Result<Vec<_>>>()?;
    Ok(VoiceEvent::Element(MeasureElement::Chord(Chord {
        pitches,
        duration,
    })))
}

fn parse_tuplet_event(parts: &[&str]) -> Result<VoiceEvent> {
    if parts.len() < 3 {
        bail!("Tuplet event requires a ratio, a duration and at least one member");
    }
    let (actual, normal) = parts[0]
        .split_once(':')
        .ok_or_else(|| anyhow!("Invalid tuplet ratio \"{}\"", parts[0]))?;
    let actual = parse_count(actual, "tuplet ratio")?;
    let normal = parse_count(normal, "tuplet ratio")?;
    if actual == 0 || normal == 0 {
        bail!("Invalid tuplet ratio \"{}\"", parts[0]);
    }

    let duration = parse_duration(parts[1])?;
    let notes = parts[2..]
        .iter()
        .map(|part| match *part {
            "r" => Ok(Note::rest(duration)),
            pitch => parse_pitch(pitch).map(|p| Note::pitched(p, duration)),
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(VoiceEvent::Element(MeasureElement::Tuplet(Tuplet {
        actual,
        normal,
        notes,
    })))
}

fn parse_key_event(parts: &[&str]) -> Result<VoiceEvent> {
    let fifths_str = parts
        .first()
        .ok_or_else(|| anyhow!("Key event requires a number of fifths"))?;
    let fifths: i8 = fifths_str
        .parse()
        .map_err(|_| anyhow!("Invalid key fifths \"{}\"", fifths_str))?;
    if !(-7..=7).contains(&fifths) {
        bail!("Key fifths must be -7..7");
    }

    let mode = match parts.get(1) {
        None | Some(&"major") => KeyMode::Major,
        Some(&"minor") => KeyMode::Minor,
        Some(other) => bail!("Invalid key mode \"{}\"", other),
    };

    Ok(VoiceEvent::Element(MeasureElement::Key(Key { fifths, mode })))
}

fn parse_barline_event(parts: &[&str]) -> Result<VoiceEvent> {
    let mut location = BarlineLocation::Right;
    let mut style = BarlineStyle::Regular;

    for part in parts {
        if let Ok(l) = part.parse::<BarlineLocation>() {
            location = l;
        } else if let Ok(s) = part.parse::<BarlineStyle>() {
            style = s;
        } else {
            bail!("Unsupported barline attribute \"{}\"", part);
        }
    }

    Ok(VoiceEvent::Element(MeasureElement::Barline(Barline {
        location,
        style,
    })))
}

fn parse_repeat_end_event(parts: &[&str]) -> Result<VoiceEvent> {
    if parts.len() != 2 {
        bail!("Repeat end event requires a measure number and a repeat count");
    }
    let times_str = parts[1]
        .strip_prefix('x')
        .ok_or_else(|| anyhow!("Repeat count must be written as x<times>"))?;
    let times = parse_count(times_str, "repeat count")?;

    Ok(VoiceEvent::RepeatEnd {
        measure_number: parts[0].to_string(),
        times,
    })
}

fn parse_ending_end_event(parts: &[&str]) -> Result<VoiceEvent> {
    if parts.len() != 2 {
        bail!("Ending end event requires a label and hooked/hookless");
    }
    let kind = match parts[1] {
        "hooked" => RepeatEndingKind::Hooked,
        "hookless" => RepeatEndingKind::Hookless,
        other => bail!("Invalid ending kind \"{}\"", other),
    };

    Ok(VoiceEvent::EndingEnd {
        label: parts[0].to_string(),
        kind,
    })
}

fn parse_measures_repeat_event(parts: &[&str]) -> Result<VoiceEvent> {
    let length_str = parts
        .first()
        .ok_or_else(|| anyhow!("Measures repeat event requires a pattern length"))?;
    let pattern_length = parse_count(length_str, "pattern length")?;
    if pattern_length == 0 {
        bail!("Pattern length must be at least 1");
    }

    let mut slashes = 1;
    for part in &parts[1..] {
        match part.split_once('=') {
            Some(("slashes", value)) => slashes = parse_count(value, "slash count")?,
            _ => bail!("Unsupported directive \"{}\"", part),
        }
    }

    Ok(VoiceEvent::MeasuresRepeatStart {
        pattern_length,
        slashes,
    })
}

fn expect_no_arguments(keyword: &str, parts: &[&str], event: VoiceEvent) -> Result<VoiceEvent> {
    if !parts.is_empty() {
        bail!("\"{}\" takes no arguments", keyword);
    }
    Ok(event)
}

pub fn parse_event_line(line: &str) -> Result<EventLine> {
    let (content, comment) = match line.split_once("//") {
        Some((content, comment)) => (content, Some(comment.trim().to_string())),
        None => (line, None),
    };

    let parts: Vec<&str> = content.split_whitespace().collect();
    let Some((keyword, args)) = parts.split_first() else {
        return Ok(EventLine {
            event: VoiceEvent::EmptyLine,
            input_line: 0,
            comment,
        });
    };

    let event = match *keyword {
        "measure" => parse_measure_event(args)?,
        "next" => match args {
            [number] => VoiceEvent::NextMeasureNumber {
                number: number.to_string(),
            },
            _ => bail!("Next event requires a measure number"),
        },
        "note" => parse_note_event(args)?,
        "rest" => parse_rest_event(args)?,
        "chord" => parse_chord_event(args)?,
        "tuplet" => parse_tuplet_event(args)?,
        "clef" => match args {
            [clef] => VoiceEvent::Element(MeasureElement::Clef(clef.parse::<Clef>()?)),
            _ => bail!("Clef event requires a clef name"),
        },
        "key" => parse_key_event(args)?,
        "time" => match args {
            [time] => VoiceEvent::Element(MeasureElement::Time(time.parse::<TimeSignature>()?)),
            _ => bail!("Time event requires a signature"),
        },
        "barline" => parse_barline_event(args)?,
        "forward" => match args {
            [duration] => VoiceEvent::Forward {
                duration: parse_duration(duration)?,
            },
            _ => bail!("Forward event requires a duration"),
        },
        "end-measure" => expect_no_arguments(keyword, args, VoiceEvent::EndMeasure)?,
        "repeat-start" => expect_no_arguments(keyword, args, VoiceEvent::RepeatStart)?,
        "repeat-end" => parse_repeat_end_event(args)?,
        "ending-start" => expect_no_arguments(keyword, args, VoiceEvent::EndingStart)?,
        "ending-end" => parse_ending_end_event(args)?,
        "rest-measures" => match args {
            [count] => {
                let count = parse_count(count, "rest measures count")?;
                if count == 0 {
                    bail!("Rest measures count must be at least 1");
                }
                VoiceEvent::RestMeasuresStart { count }
            }
            _ => bail!("Rest measures event requires a count"),
        },
        "rest-measures-stop" => expect_no_arguments(keyword, args, VoiceEvent::RestMeasuresStop)?,
        "measures-repeat" => parse_measures_repeat_event(args)?,
        "measures-repeat-stop" => {
            expect_no_arguments(keyword, args, VoiceEvent::MeasuresRepeatStop)?
        }
        other => bail!("Unknown event \"{}\"", other),
    };

    Ok(EventLine {
        event,
        input_line: 0,
        comment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(line: &str) -> VoiceEvent {
        parse_event_line(line).unwrap().event
    }

    #[test]
    fn test_measure_events() {
        assert_eq!(
            event("measure 12"),
            VoiceEvent::Measure {
                number: "12".to_string(),
                implicit: false
            }
        );
        assert_eq!(
            event("measure 0 implicit"),
            VoiceEvent::Measure {
                number: "0".to_string(),
                implicit: true
            }
        );
        assert!(parse_event_line("measure").is_err());
        assert!(parse_event_line("measure 1 explicit").is_err());
    }

    #[test]
    fn test_element_events() {
        assert_eq!(
            event("note 1/4 C#4"),
            VoiceEvent::Element(MeasureElement::Note(Note::pitched(
                "C#4".parse().unwrap(),
                WholeNotes::new(1, 4)
            )))
        );
        assert_eq!(
            event("rest 1"),
            VoiceEvent::Element(MeasureElement::Note(Note::rest(WholeNotes::whole(1))))
        );

        let VoiceEvent::Element(MeasureElement::Tuplet(tuplet)) = event("tuplet 3:2 1/8 C4 r E4")
        else {
            panic!("expected a tuplet");
        };
        assert_eq!(tuplet.notes.len(), 3);
        assert!(tuplet.notes[1].is_rest());
        assert_eq!(tuplet.duration(), WholeNotes::new(1, 4));

        assert_eq!(
            event("barline left light-heavy"),
            VoiceEvent::Element(MeasureElement::Barline(Barline {
                location: BarlineLocation::Left,
                style: BarlineStyle::LightHeavy,
            }))
        );
        assert!(parse_event_line("note C4 1/4").is_err());
        assert!(parse_event_line("chord 1/2").is_err());
        assert!(parse_event_line("key 9").is_err());
        assert!(parse_event_line("tuplet 0:2 1/8 C4").is_err());
    }

    #[test]
    fn test_structure_events() {
        assert_eq!(
            event("repeat-end 8 x3"),
            VoiceEvent::RepeatEnd {
                measure_number: "8".to_string(),
                times: 3
            }
        );
        assert_eq!(
            event("ending-end 1,2 hooked"),
            VoiceEvent::EndingEnd {
                label: "1,2".to_string(),
                kind: RepeatEndingKind::Hooked
            }
        );
        assert_eq!(
            event("measures-repeat 2 slashes=2"),
            VoiceEvent::MeasuresRepeatStart {
                pattern_length: 2,
                slashes: 2
            }
        );
        assert!(parse_event_line("repeat-end 8 3").is_err());
        assert!(parse_event_line("repeat-start now").is_err());
        assert!(parse_event_line("rest-measures 0").is_err());
        assert!(parse_event_line("ending-end 1 curly").is_err());
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let line = parse_event_line("repeat-start // forward repeat").unwrap();
        assert_eq!(line.event, VoiceEvent::RepeatStart);
        assert_eq!(line.comment.as_deref(), Some("forward repeat"));

        let line = parse_event_line("   ").unwrap();
        assert_eq!(line.event, VoiceEvent::EmptyLine);
        assert!(line.comment.is_none());

        let line = parse_event_line("// just a comment").unwrap();
        assert_eq!(line.event, VoiceEvent::EmptyLine);
        assert_eq!(line.comment.as_deref(), Some("just a comment"));

        assert!(parse_event_line("fermata").is_err());
    }

    #[test]
    fn test_display_round_trip() {
        for line in [
            "measure 3 implicit",
            "note 3/8 Bb3",
            "chord 1/2 C4 E4 G4",
            "tuplet 3:2 1/8 C4 r E4",
            "key -3 minor",
            "time 6/8",
            "barline left heavy",
            "repeat-end 4 x2",
            "ending-end 2 hookless",
            "measures-repeat 2 slashes=2",
        ] {
            assert_eq!(event(line).to_string(), line);
        }
    }
}
