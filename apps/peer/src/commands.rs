//! Line-oriented command parsing for the terminal peer.

use yeeplayer_core::protocol_constants::QUICK_EMOJI;
use yeeplayer_core::{Command, SettingsChange, TowerAction};

/// One parsed input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Input {
    Action(Command),
    /// Print the current board snapshot.
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  sound [name]         play a sound cue (spawns a music note)
  emoji <glyph|1-6>    emoji burst; digits pick from the quick panel
  chat <text>          send a chat line
  start                start tower defense
  tower <name>         select a tower
  bg <image>           change the background
  anim <name>          play a board animation
  gif <id>             show a gif
  weather <location>   show the weather widget
  brush <color>        change the whiteboard brush colour
  url <url>            share a video URL
  name <name>          change display name
  show                 print the board
  quit";

/// Parses one line. Blank lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<Input>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };
    let arg = || {
        if rest.is_empty() {
            Err(format!("'{verb}' needs an argument"))
        } else {
            Ok(rest.to_string())
        }
    };

    let input = match verb {
        "sound" => Input::Action(Command::Sound {
            sound: (!rest.is_empty()).then(|| rest.to_string()),
        }),
        "emoji" => Input::Action(Command::Emoji {
            glyph: quick_emoji(rest).map_or_else(arg, Ok)?,
        }),
        "chat" => Input::Action(Command::Chat { text: arg()? }),
        "start" => Input::Action(Command::TowerDefense(TowerAction::Start)),
        "tower" => Input::Action(Command::TowerDefense(TowerAction::SelectTower(arg()?))),
        "bg" => Input::Action(Command::Background { image: arg()? }),
        "anim" => Input::Action(Command::Animation { name: arg()? }),
        "gif" => Input::Action(Command::Gif { id: arg()? }),
        "weather" => Input::Action(Command::Weather { location: arg()? }),
        "brush" => Input::Action(Command::Whiteboard { color: arg()? }),
        "url" => Input::Action(Command::Settings(SettingsChange::Url(arg()?))),
        "name" => Input::Action(Command::Settings(SettingsChange::Name(arg()?))),
        "show" => Input::Show,
        "help" | "?" => Input::Help,
        "quit" | "exit" => Input::Quit,
        other => return Err(format!("unknown command '{other}' (try 'help')")),
    };
    Ok(Some(input))
}

/// Maps `1`..`6` to the quick-reaction emoji.
fn quick_emoji(arg: &str) -> Option<String> {
    let index: usize = arg.parse().ok()?;
    QUICK_EMOJI
        .get(index.checked_sub(1)?)
        .map(|glyph| glyph.to_string())
}
