//! Command and default handlers bound into the standard modes.

use session::{ModeId, OnlinePlayer, Player, Race};

use crate::context::GameContext;
use crate::dispatch::{split_verb, switch_modes};
use crate::mode::{Command, CommandResult, Response};
use crate::view::{PlayerView, WhoView};

pub const FAREWELL: &str = "See you next time.";
pub const DISPLACED_NOTICE: &str = "You have been logged in from another connection.";
pub const MIN_NAME_LEN: usize = 4;
const MIN_PASSWORD_LEN: usize = 6;

pub fn quit() -> Command {
    Command::new("quit", |p: &mut Player, _: &str, ctx: &GameContext| -> CommandResult {
        if !p.name.is_empty() {
            ctx.players.deregister_session(&p.name, p.session_id);
        }
        tracing::info!(player = %p.short_id(), "Player quit");
        Ok(Response::exit(FAREWELL))
    })
    .aliases(&["exit", "q"])
    .help("leave the game")
}

pub fn login() -> Command {
    Command::new("login", |p: &mut Player, msg: &str, ctx: &GameContext| -> CommandResult {
        Ok(Response::text(switch_modes(p, ModeId::LoginUsername, ctx, msg)))
    })
    .aliases(&["l"])
    .help("log in to an existing character")
}

pub fn create() -> Command {
    Command::new("create", |p: &mut Player, msg: &str, ctx: &GameContext| -> CommandResult {
        Ok(Response::text(switch_modes(p, ModeId::CreateCharacter, ctx, msg)))
    })
    .aliases(&["c"])
    .help("create a new character")
}

pub fn who() -> Command {
    Command::new("who", |_: &mut Player, _: &str, ctx: &GameContext| -> CommandResult {
        let online = ctx.players.snapshot();
        Ok(Response::text(ctx.renderer.render("cmd_who.txt", &WhoView::new(&online))))
    })
    .help("list players online")
}

pub fn status() -> Command {
    Command::new("status", |p: &mut Player, _: &str, ctx: &GameContext| -> CommandResult {
        Ok(Response::text(ctx.renderer.render("cmd_status.txt", &PlayerView::from(&*p))))
    })
    .help("show your character")
}

pub fn save() -> Command {
    Command::new("save", |p: &mut Player, _: &str, ctx: &GameContext| -> CommandResult {
        match ctx.repo.save(p) {
            Ok(()) => Ok(Response::text("Saved.")),
            Err(e) => {
                tracing::error!(player = %p.short_id(), "Save failed: {}", e);
                Ok(Response::text("Couldn't save your character right now."))
            }
        }
    })
    .help("save your character")
}

pub fn help() -> Command {
    Command::new("help", |p: &mut Player, _: &str, ctx: &GameContext| -> CommandResult {
        let Some(mode) = p.mode.map(|id| ctx.modes.get(id)) else {
            return Ok(Response::empty());
        };
        let mut out = String::from("Commands:");
        for cmd in mode.commands() {
            out.push_str("\n  ");
            out.push_str(&cmd.name);
            if !cmd.aliases.is_empty() {
                out.push_str(&format!(" ({})", cmd.aliases.join(", ")));
            }
            if !cmd.help.is_empty() {
                out.push_str(" - ");
                out.push_str(&cmd.help);
            }
        }
        Ok(Response::text(out))
    })
    .aliases(&["?"])
    .help("this list")
}

/// LoginUsername default: look the name up and merge the stored character.
pub fn get_username(p: &mut Player, msg: &str, ctx: &GameContext) -> CommandResult {
    match ctx.repo.load(msg) {
        Ok(Some(record)) => {
            *p = p.merge(&record);
            Ok(Response::text(switch_modes(p, ModeId::LoginPassword, ctx, "username found")))
        }
        Ok(None) => {
            tracing::info!(player = %p.short_id(), name = msg, "Login for unknown name");
            let prompt = ctx.modes.get(ModeId::LoginUsername).describe(p, &ctx.renderer);
            Ok(Response::text(format!(
                "Player with name {msg} doesn't exist yet. [Create] to go to character creation.\n{prompt}"
            )))
        }
        Err(e) => {
            tracing::error!(player = %p.short_id(), name = msg, "Player lookup failed: {}", e);
            Ok(Response::text("Couldn't look up that character right now. Please try again."))
        }
    }
}

/// Placeholder policy: any password longer than five characters is accepted.
/// There are no stored credentials to compare against.
pub fn check_password(password: &str) -> bool {
    password.chars().count() >= MIN_PASSWORD_LEN
}

/// LoginPassword default.
pub fn get_password(p: &mut Player, msg: &str, ctx: &GameContext) -> CommandResult {
    tracing::debug!(player = %p.short_id(), len = msg.len(), "Password attempt");
    if !check_password(msg) {
        return Ok(Response::text(format!(
            "Sorry {}, couldn't recognize your password.",
            p.name
        )));
    }
    Ok(Response::text(switch_modes(p, ModeId::Game, ctx, "password accepted")))
}

/// CreateCharacter default: first a name, then a race, then persist.
pub fn create_character(p: &mut Player, msg: &str, ctx: &GameContext) -> CommandResult {
    let creation = ctx.modes.get(ModeId::CreateCharacter);
    let reprompt = |p: &Player, text: String| -> CommandResult {
        Ok(Response::text(format!("{text}\n{}", creation.describe(p, &ctx.renderer))))
    };

    if p.name.is_empty() {
        if msg.chars().count() < MIN_NAME_LEN {
            return reprompt(&*p, "Name must be at least four letters long.".into());
        }
        // Dispatch looks at the first word only, so a name starting with a
        // command word could never be typed at the login prompt.
        if ctx.modes.is_command_word(&split_verb(msg).0) {
            return reprompt(&*p, format!("The name {msg} is reserved."));
        }
        match ctx.repo.exists(msg) {
            Ok(true) => return reprompt(&*p, format!("The name {msg} is already taken.")),
            Ok(false) => {}
            Err(e) => {
                tracing::error!(player = %p.short_id(), name = msg, "Name lookup failed: {}", e);
                return Ok(Response::text("Couldn't check that name right now. Please try again."));
            }
        }
        p.name = msg.to_string();
        tracing::info!(player = %p.short_id(), "Chose a name");
        return Ok(Response::text(creation.describe(p, &ctx.renderer)));
    }

    if p.race == Race::None {
        match Race::parse(msg) {
            Some(race) => p.race = race,
            None => {
                return reprompt(
                    &*p,
                    format!("Race {msg} didn't match a valid option: earther, lunite or belter."),
                )
            }
        }
    }

    p.init_new_character();
    match ctx.repo.create(p) {
        Ok(true) => {
            tracing::info!(player = %p.name, race = %p.race, "Created character");
            Ok(Response::text(switch_modes(p, ModeId::Game, ctx, "character created")))
        }
        Ok(false) => {
            let name = std::mem::take(&mut p.name);
            p.race = Race::None;
            reprompt(&*p, format!("The name {name} is already taken."))
        }
        Err(e) => {
            tracing::error!(player = %p.short_id(), "Failed to create character: {}", e);
            Ok(Response::text("Couldn't create your new character."))
        }
    }
}

/// Game on-enter: mark the player online. Replaces any other session
/// holding the same name.
pub fn enter_game(p: &mut Player, ctx: &GameContext) {
    p.logged_in = true;
    if let Some(displaced) = ctx.players.register(OnlinePlayer::from_player(p)) {
        tracing::warn!(
            player = %p.name,
            displaced = %displaced.session_id,
            "Name already online, displacing older session"
        );
        // A full queue just means the notice is lost; the close still lands.
        let _ = displaced.outbox.try_push(DISPLACED_NOTICE);
        displaced.outbox.close();
    }
    tracing::info!(player = %p.name, online = ctx.players.len(), "Player entered the game");
}
