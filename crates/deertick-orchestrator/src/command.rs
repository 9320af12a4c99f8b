use std::fmt;

/// Interactive chat commands, entered as `%name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Exit,
    Help,
    Clear,
    FileRead,
    NewAgent,
    RemoveAgent,
    ListAgents,
    AgentSettings,
    SetGlobalSystemPrompt,
    SetAgentSystemPrompt,
    History,
    Save,
    Load,
}

/// Prefix that marks a line as a command.
pub const COMMAND_PREFIX: char = '%';

const COMMANDS: &[(&str, Command, &str)] = &[
    ("exit", Command::Exit, "exit the chat"),
    ("help", Command::Help, "show this message"),
    ("clear", Command::Clear, "clear the chat history"),
    ("file_read", Command::FileRead, "show a file's contents to an agent"),
    ("new_agent", Command::NewAgent, "create a new agent"),
    ("remove_agent", Command::RemoveAgent, "remove an agent"),
    ("list_agents", Command::ListAgents, "list all agents"),
    ("agent_settings", Command::AgentSettings, "change agent settings (JSON object)"),
    (
        "set_global_system_prompt",
        Command::SetGlobalSystemPrompt,
        "set the system prompt for all agents",
    ),
    (
        "set_agent_system_prompt",
        Command::SetAgentSystemPrompt,
        "set the system prompt for a specific agent",
    ),
    ("history", Command::History, "toggle resending prior turns for an agent"),
    ("save", Command::Save, "save an agent's conversation"),
    ("load", Command::Load, "load a saved conversation into an agent"),
];

impl Command {
    /// Parse a `%name` line. Anything else, including unknown names, is not a command.
    pub fn parse(line: &str) -> Option<Command> {
        let name = line.trim().strip_prefix(COMMAND_PREFIX)?;
        COMMANDS
            .iter()
            .find(|(n, _, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, cmd, _)| *cmd)
    }

    pub fn name(self) -> &'static str {
        match self {
            Command::Exit => "exit",
            Command::Help => "help",
            Command::Clear => "clear",
            Command::FileRead => "file_read",
            Command::NewAgent => "new_agent",
            Command::RemoveAgent => "remove_agent",
            Command::ListAgents => "list_agents",
            Command::AgentSettings => "agent_settings",
            Command::SetGlobalSystemPrompt => "set_global_system_prompt",
            Command::SetAgentSystemPrompt => "set_agent_system_prompt",
            Command::History => "history",
            Command::Save => "save",
            Command::Load => "load",
        }
    }

    pub fn description(self) -> &'static str {
        COMMANDS
            .iter()
            .find(|(_, cmd, _)| *cmd == self)
            .map_or("", |(_, _, desc)| *desc)
    }

    pub fn all() -> impl Iterator<Item = Command> {
        COMMANDS.iter().map(|(_, cmd, _)| *cmd)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{COMMAND_PREFIX}{}", self.name())
    }
}

/// One line per command, as shown by `%help`.
pub fn help_lines() -> Vec<String> {
    Command::all()
        .map(|cmd| format!("{cmd} - {}", cmd.description()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_commands() {
        assert_eq!(Command::parse("%exit"), Some(Command::Exit));
        assert_eq!(Command::parse("  %FILE_READ "), Some(Command::FileRead));
        assert_eq!(Command::parse("%set_agent_system_prompt"), Some(Command::SetAgentSystemPrompt));
    }

    #[test]
    fn test_non_commands() {
        assert_eq!(Command::parse("exit"), None);
        assert_eq!(Command::parse("%dance"), None);
        assert_eq!(Command::parse("100% sure"), None);
        assert_eq!(Command::parse(""), None);
    }

    #[test]
    fn test_table_is_exhaustive() {
        let all: Vec<Command> = Command::all().collect();
        assert_eq!(all.len(), 13);
        for cmd in all {
            assert_eq!(Command::parse(&cmd.to_string()), Some(cmd));
            assert!(!cmd.description().is_empty());
        }
    }

    #[test]
    fn test_help_lines() {
        let lines = help_lines();
        assert_eq!(lines[0], "%exit - exit the chat");
        assert!(lines.iter().any(|l| l.starts_with("%history")));
    }
}
