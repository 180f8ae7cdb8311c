//! UI Builder module for the command menu shown by Telegram clients

use teloxide::types::BotCommand;

use super::messenger::Command;
use crate::localization::Localizer;

fn description_key(command: Command) -> &'static str {
    match command {
        Command::Start => "command-start",
        Command::GenPic => "command-gen-pic",
        Command::Variation => "command-variation",
        Command::Background => "command-background",
    }
}

/// Command menu entries with localized descriptions
pub fn create_command_menu(localizer: &Localizer) -> Vec<BotCommand> {
    Command::ALL
        .into_iter()
        .map(|command| BotCommand::new(command.name(), localizer.text(description_key(command))))
        .collect()
}
