use session::{ModeId, Player};

use crate::context::GameContext;
use crate::error::CommandError;
use crate::mode::{CommandResult, Response};

/// Split trimmed input into a lower-cased verb and the rest.
pub fn split_verb(msg: &str) -> (String, &str) {
    let mut parts = msg.splitn(2, char::is_whitespace);
    let verb = parts.next().unwrap_or("").to_lowercase();
    let rest = parts.next().unwrap_or("").trim();
    (verb, rest)
}

/// Route one line of input through the player's current mode.
///
/// Blank input is a no-op. Unmatched input with no default handler gets a
/// list of the mode's commands; neither case is an error.
pub fn handle_message(player: &mut Player, raw: &str, ctx: &GameContext) -> CommandResult {
    let msg = raw.trim();
    if msg.is_empty() {
        return Ok(Response::empty());
    }
    let mode_id = player.mode.ok_or(CommandError::NoActiveMode)?;
    let mode = ctx.modes.get(mode_id);
    let (verb, _) = split_verb(msg);

    if let Some(cmd) = mode.find_command(&verb) {
        tracing::debug!(player = %player.short_id(), mode = %mode_id, command = %cmd.name, "Dispatching command");
        return cmd.invoke(player, msg, ctx);
    }
    if let Some(fallback) = mode.fallback() {
        return fallback.handle(player, msg, ctx);
    }

    let allowed = mode.command_names().join(", ");
    tracing::info!(player = %player.short_id(), mode = %mode_id, verb = %verb, "Unrecognized command");
    Ok(Response::text(format!(
        "Sorry, didn't recognize that command. Try one of {allowed}."
    )))
}

/// Move the player into `id`, run its enter hook, and return its description.
pub fn switch_modes(player: &mut Player, id: ModeId, ctx: &GameContext, reason: &str) -> String {
    let mode = ctx.modes.get(id);
    tracing::info!(
        player = %player.short_id(),
        from = ?player.mode,
        to = %id,
        reason,
        "Switching modes"
    );
    player.mode = Some(id);
    if let Some(hook) = mode.enter_hook() {
        hook.on_enter(player, ctx);
    }
    mode.describe(player, &ctx.renderer)
}

/// First text a new connection sees.
pub fn start(player: &mut Player, ctx: &GameContext) -> String {
    switch_modes(player, ModeId::Splash, ctx, "connect")
}

/// Session teardown: stop output, persist, leave the registry.
///
/// Safe to call more than once.
pub fn logout(player: &mut Player, ctx: &GameContext) {
    player.outbox.close();
    if player.logged_in && !player.name.is_empty() {
        match ctx.repo.save(player) {
            Ok(()) => tracing::info!(player = %player.name, "Saved player on logout"),
            Err(e) => tracing::error!(player = %player.name, "Failed to save player on logout: {}", e),
        }
    }
    if !player.name.is_empty() && ctx.players.deregister_session(&player.name, player.session_id) {
        tracing::info!(player = %player.name, online = ctx.players.len(), "Player left the game");
    }
    player.logged_in = false;
}
