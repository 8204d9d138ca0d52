use super::*;

#[test]
fn test_parse_commands() {
    assert_eq!(Command::parse("/start", "cemtem_bot").unwrap(), Command::Start);
    assert_eq!(Command::parse("/help", "cemtem_bot").unwrap(), Command::Help);
    assert_eq!(
        Command::parse("/start@cemtem_bot", "cemtem_bot").unwrap(),
        Command::Start
    );
}

#[test]
fn test_commands_for_other_bots_rejected() {
    assert!(Command::parse("/start@other_bot", "cemtem_bot").is_err());
    assert!(Command::parse("/list", "cemtem_bot").is_err());
    assert!(Command::parse("start", "cemtem_bot").is_err());
}

#[test]
fn test_registered_command_list() {
    let commands = Command::bot_commands();
    let names: Vec<&str> = commands
        .iter()
        .map(|c| c.command.trim_start_matches('/'))
        .collect();
    assert_eq!(names, vec!["start", "help"]);
    assert!(commands.iter().all(|c| !c.description.is_empty()));
}

#[test]
fn test_forwarded_text() {
    assert_eq!(Command::Start.as_text(), "/start");
    assert_eq!(Command::Help.as_text(), "/help");
}
