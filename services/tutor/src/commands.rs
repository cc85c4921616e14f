use tutor_core::SessionInput;

pub const HELP: &str = "\
Type a question and press Enter, or use a command:
  /next /prev         move between sections
  /jump N             go to section N
  /listen /stop       start or drop a spoken question
  /pause /resume      pause or resume speech
  /hush               stop speaking
  /mute               toggle speech output
  /camera             toggle the camera
  /narrate            read the current section aloud
  /reset              clear the conversation
  /quit               leave the session";

/// One line of console input, classified.
#[derive(Debug, PartialEq)]
pub enum ConsoleLine {
    Blank,
    Text(String),
    Command(SessionInput),
    Help,
}

#[derive(Debug, PartialEq, thiserror::Error)]
pub enum CommandError {
    #[error("Unknown command: /{0} (type /help for a list)")]
    Unknown(String),
    #[error("/jump needs a section number, e.g. /jump 2")]
    MissingSectionNumber,
    #[error("Not a section number: {0}")]
    InvalidSectionNumber(String),
}

pub fn parse_line(line: &str) -> Result<ConsoleLine, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(ConsoleLine::Blank);
    }
    let Some(rest) = line.strip_prefix('/') else {
        return Ok(ConsoleLine::Text(line.to_string()));
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default().to_lowercase();
    let input = match name.as_str() {
        "next" | "n" => SessionInput::Next,
        "prev" | "previous" | "p" => SessionInput::Previous,
        "jump" | "j" => SessionInput::Jump(parse_section_number(parts.next())?),
        "listen" => SessionInput::StartListening,
        "stop" => SessionInput::StopListening,
        "pause" => SessionInput::Pause,
        "resume" => SessionInput::Resume,
        "hush" => SessionInput::StopSpeaking,
        "mute" => SessionInput::ToggleMute,
        "camera" => SessionInput::ToggleCamera,
        "narrate" => SessionInput::NarrateSection,
        "reset" => SessionInput::Reset,
        "quit" | "exit" => SessionInput::Shutdown,
        "help" | "?" => return Ok(ConsoleLine::Help),
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(ConsoleLine::Command(input))
}

// Section numbers are 1-based on the console.
fn parse_section_number(arg: Option<&str>) -> Result<usize, CommandError> {
    let arg = arg.ok_or(CommandError::MissingSectionNumber)?;
    match arg.parse::<usize>() {
        Ok(number) if number > 0 => Ok(number - 1),
        _ => Err(CommandError::InvalidSectionNumber(arg.to_string())),
    }
}
