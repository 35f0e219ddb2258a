use crate::types::event::{EventLine, VoiceEvent};
use std::fmt;

/// A parsed event script.
#[derive(Debug, Clone)]
pub struct EventFile {
    pub events: Vec<EventLine>,
}

impl Default for EventFile {
    fn default() -> Self {
        Self::new()
    }
}

impl EventFile {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn from_events(events: Vec<EventLine>) -> Self {
        Self { events }
    }

    /// Events without the formatting-only lines.
    pub fn get_events(&self) -> Vec<&VoiceEvent> {
        self.events
            .iter()
            .map(|line| &line.event)
            .filter(|event| **event != VoiceEvent::EmptyLine)
            .collect()
    }

    pub fn measure_count(&self) -> usize {
        self.events
            .iter()
            .filter(|line| matches!(line.event, VoiceEvent::Measure { .. }))
            .count()
    }

    pub fn push(&mut self, event: VoiceEvent) {
        self.events.push(EventLine::new(event));
    }
}

impl fmt::Display for EventFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.events {
            match (&line.event, &line.comment) {
                (VoiceEvent::EmptyLine, Some(comment)) => write!(f, "// {}", comment)?,
                (VoiceEvent::EmptyLine, None) => {}
                (event, Some(comment)) => write!(f, "{} // {}", event, comment)?,
                (event, None) => write!(f, "{}", event)?,
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::parse_events;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_display_round_trip() {
        let content = r#"// pickup
measure 0 implicit
rest 1/4
end-measure

measure 1
repeat-start // forward repeat
chord 1/2 C4 E4 G4
repeat-end 1 x2
"#;
        let file = parse_events(content).unwrap();
        assert_eq!(file.to_string(), content);
        assert_eq!(file.measure_count(), 2);
        assert_eq!(file.get_events().len(), 7);
    }
}
