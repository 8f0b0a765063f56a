use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Model(Option<String>),    // /model <name> | /model
    Models,                   // /models
    Clear,                    // /clear
    Export(Option<PathBuf>),  // /export [dir]
    History,                  // /history
    Help,                     // /help
    Quit,                     // /quit or /exit
    Unknown(String),
}

pub fn parse_command(input: &str) -> Command {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return Command::Unknown(trimmed.to_string());
    }
    let mut parts = trimmed.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or_default();
    let rest = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match verb {
        "/model" => Command::Model(rest.map(str::to_string)),
        "/models" => Command::Models,
        "/clear" => Command::Clear,
        "/export" => Command::Export(rest.map(PathBuf::from)),
        "/history" => Command::History,
        "/help" => Command::Help,
        "/quit" | "/exit" => Command::Quit,
        _ => Command::Unknown(trimmed.to_string()),
    }
}
