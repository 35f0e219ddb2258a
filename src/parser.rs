use crate::event_parser::parse_event_line;
use crate::file::EventFile;
use anyhow::{Result, bail};

pub struct EventParser {}

pub fn parse_events(content: &str) -> Result<EventFile> {
    let mut parser = EventParser::new();
    parser.parse(content)
}

impl Default for EventParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParser {
    pub fn new() -> Self {
        Self {}
    }

    pub fn parse(&mut self, content: &str) -> Result<EventFile> {
        let mut event_file = EventFile::new();

        for (line_idx, line) in content.lines().enumerate() {
            match parse_event_line(line) {
                Ok(mut event_line) => {
                    event_line.input_line = line_idx + 1;
                    event_file.events.push(event_line);
                }
                Err(e) => bail!("Line #{}: {}", line_idx + 1, e),
            }
        }

        Ok(event_file)
    }
}
