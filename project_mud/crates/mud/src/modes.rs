use session::ModeId;

use crate::commands;
use crate::error::ConfigError;
use crate::mode::{Description, Mode, ModeRegistry};

fn template(id: &str) -> Description {
    Description::Template(id.to_string())
}

/// The standard mode table: splash, login, character creation and the game.
pub fn standard_modes() -> Result<ModeRegistry, ConfigError> {
    ModeRegistry::new(standard_mode_list())
}

/// Unvalidated standard modes, in `ModeId` order. Callers may extend them
/// before building a registry.
pub fn standard_mode_list() -> Vec<Mode> {
    vec![
        Mode::new(ModeId::Splash, "Splash", template("splash.txt"))
            .command(commands::login())
            .command(commands::create())
            .command(commands::quit()),
        Mode::new(ModeId::LoginUsername, "LoginUsername", template("login_username.txt"))
            .command(commands::create())
            .command(commands::quit())
            .default_handler(commands::get_username),
        Mode::new(ModeId::LoginPassword, "LoginPassword", template("login_password.txt"))
            .command(commands::quit())
            .default_handler(commands::get_password),
        Mode::new(ModeId::CreateCharacter, "CreateCharacter", template("create_character.txt"))
            .command(commands::quit())
            .default_handler(commands::create_character),
        Mode::new(ModeId::Game, "Game", template("game.txt"))
            .command(commands::who())
            .command(commands::status())
            .command(commands::save())
            .command(commands::help())
            .command(commands::quit())
            .on_enter(commands::enter_game),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use persistence::{MemoryStore, PersistenceError, PlayerStore};
    use session::{outbox, OutboxReceiver, Player, Race};

    use super::*;
    use crate::commands::{DISPLACED_NOTICE, FAREWELL};
    use crate::context::GameContext;
    use crate::dispatch::{handle_message, start};
    use crate::render::Renderer;
    use crate::repo::PlayerRepo;

    fn ctx_with(store: Arc<dyn PlayerStore>) -> GameContext {
        GameContext::new(standard_modes().unwrap(), PlayerRepo::new(store), Renderer::builtin())
    }

    fn ctx() -> GameContext {
        ctx_with(Arc::new(MemoryStore::new()))
    }

    fn connect(ctx: &GameContext) -> (Player, OutboxReceiver, String) {
        let (tx, rx) = outbox(16);
        let mut p = Player::new(tx);
        let splash = start(&mut p, ctx);
        (p, rx, splash)
    }

    fn send(p: &mut Player, ctx: &GameContext, line: &str) -> String {
        handle_message(p, line, ctx).unwrap().text
    }

    fn create(ctx: &GameContext, name: &str, race: &str) -> (Player, OutboxReceiver) {
        let (mut p, rx, _) = connect(ctx);
        send(&mut p, ctx, "create");
        send(&mut p, ctx, name);
        send(&mut p, ctx, race);
        assert_eq!(p.mode, Some(ModeId::Game));
        (p, rx)
    }

    /// A store whose every call fails.
    struct BrokenStore;

    impl PlayerStore for BrokenStore {
        fn get(&self, _: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
            Err(PersistenceError::Backend("disk on fire".into()))
        }
        fn put(&self, _: &str, _: &[u8]) -> Result<(), PersistenceError> {
            Err(PersistenceError::Backend("disk on fire".into()))
        }
        fn create(&self, _: &str, _: &[u8]) -> Result<bool, PersistenceError> {
            Err(PersistenceError::Backend("disk on fire".into()))
        }
    }

    /// Reads succeed (nothing exists), writes fail.
    struct ReadOnlyStore;

    impl PlayerStore for ReadOnlyStore {
        fn get(&self, _: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
            Ok(None)
        }
        fn put(&self, _: &str, _: &[u8]) -> Result<(), PersistenceError> {
            Err(PersistenceError::Backend("read only".into()))
        }
        fn create(&self, _: &str, _: &[u8]) -> Result<bool, PersistenceError> {
            Err(PersistenceError::Backend("read only".into()))
        }
    }

    #[test]
    fn standard_table_is_valid() {
        let modes = standard_modes().unwrap();
        assert_eq!(modes.get(ModeId::Splash).command_names(), vec!["login", "create", "quit"]);
        assert!(modes.get(ModeId::LoginUsername).fallback().is_some());
        assert!(modes.get(ModeId::Game).enter_hook().is_some());
        for mode in modes.iter() {
            assert!(mode.find_command("quit").is_some(), "{} lacks quit", mode.name);
        }
    }

    #[test]
    fn splash_then_login_prompt() {
        let ctx = ctx();
        let (mut p, _rx, splash) = connect(&ctx);
        assert!(splash.contains("[Login]"));
        assert_eq!(p.mode, Some(ModeId::Splash));

        let prompt = send(&mut p, &ctx, "LOGIN");
        assert!(prompt.contains("Enter the name of your character"));
        assert_eq!(p.mode, Some(ModeId::LoginUsername));
    }

    #[test]
    fn unknown_username_stays_put() {
        let ctx = ctx();
        let (mut p, _rx, _) = connect(&ctx);
        send(&mut p, &ctx, "l");
        let reply = send(&mut p, &ctx, "zz");
        assert!(reply.starts_with("Player with name zz doesn't exist yet. [Create]"));
        assert!(reply.contains("Enter the name of your character"));
        assert_eq!(p.mode, Some(ModeId::LoginUsername));
        assert!(!ctx.repo.exists("zz").unwrap());
    }

    #[test]
    fn create_from_login_prompt() {
        let ctx = ctx();
        let (mut p, _rx, _) = connect(&ctx);
        send(&mut p, &ctx, "login");
        send(&mut p, &ctx, "c");
        assert_eq!(p.mode, Some(ModeId::CreateCharacter));
    }

    #[test]
    fn character_creation_flow() {
        let ctx = ctx();
        let (mut p, _rx, _) = connect(&ctx);
        let prompt = send(&mut p, &ctx, "create");
        assert!(prompt.contains("What name do you go by"));

        assert!(send(&mut p, &ctx, "ab").starts_with("Name must be at least four letters long."));
        assert!(send(&mut p, &ctx, "login").starts_with("The name login is reserved."));
        assert!(send(&mut p, &ctx, "abcd").contains("Choose your race"));
        assert_eq!(p.name, "abcd");

        let bad = send(&mut p, &ctx, "martian");
        assert!(bad.starts_with(
            "Race martian didn't match a valid option: earther, lunite or belter."
        ));
        assert_eq!(p.mode, Some(ModeId::CreateCharacter));

        let game = send(&mut p, &ctx, "Earther");
        assert_eq!(game, "You are abcd, a level 1 earther. Type [help] for commands.\n");
        assert_eq!(p.mode, Some(ModeId::Game));
        assert!(p.logged_in);
        assert!(ctx.players.contains("abcd"));

        let record = ctx.repo.load("abcd").unwrap().unwrap();
        assert_eq!(record.race, Race::Earther);
        assert_eq!((record.level, record.hit_points, record.max_hit_points), (1, 100, 100));
    }

    #[test]
    fn name_starting_with_command_word_is_refused() {
        let ctx = ctx();
        let (mut p, _rx, _) = connect(&ctx);
        send(&mut p, &ctx, "create");
        for name in ["c mon", "Create me", "quit now", "login"] {
            let reply = send(&mut p, &ctx, name);
            assert!(reply.starts_with(&format!("The name {name} is reserved.")), "{reply}");
            assert!(p.name.is_empty());
        }

        // A multi-word name whose first word is free still works, and can log in.
        send(&mut p, &ctx, "vesta prime");
        send(&mut p, &ctx, "belter");
        assert_eq!(p.mode, Some(ModeId::Game));
        crate::dispatch::logout(&mut p, &ctx);

        let (mut again, _rx, _) = connect(&ctx);
        send(&mut again, &ctx, "login");
        assert!(send(&mut again, &ctx, "vesta prime").contains("Welcome back, vesta prime."));
        assert_eq!(again.mode, Some(ModeId::LoginPassword));
    }

    #[test]
    fn taken_name_is_refused() {
        let ctx = ctx();
        create(&ctx, "vesta", "lunite");

        let (mut p, _rx, _) = connect(&ctx);
        send(&mut p, &ctx, "create");
        assert!(send(&mut p, &ctx, "vesta").starts_with("The name vesta is already taken."));
        assert!(p.name.is_empty());
    }

    #[test]
    fn login_merges_and_checks_password() {
        let ctx = ctx();
        let (mut first, _rx) = create(&ctx, "vesta", "belter");
        let uuid = first.uuid;
        crate::dispatch::logout(&mut first, &ctx);

        let (mut p, _rx, _) = connect(&ctx);
        send(&mut p, &ctx, "login");
        let prompt = send(&mut p, &ctx, "vesta");
        assert!(prompt.contains("Welcome back, vesta."));
        assert_eq!(p.mode, Some(ModeId::LoginPassword));
        assert_eq!(p.uuid, uuid);
        assert_eq!(p.race, Race::Belter);

        assert_eq!(send(&mut p, &ctx, "abc"), "Sorry vesta, couldn't recognize your password.");
        assert_eq!(p.mode, Some(ModeId::LoginPassword));
        assert!(!p.logged_in);

        let game = send(&mut p, &ctx, "abcdef");
        assert!(game.starts_with("You are vesta"));
        assert_eq!(p.mode, Some(ModeId::Game));
        assert!(ctx.players.contains("vesta"));
    }

    #[test]
    fn quit_deregisters_and_exits() {
        let ctx = ctx();
        let (mut p, _rx) = create(&ctx, "pallas", "earther");
        let res = handle_message(&mut p, "quit", &ctx).unwrap();
        assert!(res.is_exit());
        assert_eq!(res.text, FAREWELL);
        assert!(!ctx.players.contains("pallas"));
    }

    #[test]
    fn quit_works_before_login() {
        let ctx = ctx();
        let (mut p, _rx, _) = connect(&ctx);
        assert!(handle_message(&mut p, "Q", &ctx).unwrap().is_exit());
    }

    #[test]
    fn game_commands() {
        let ctx = ctx();
        let (mut a, _rx_a) = create(&ctx, "ceres", "lunite");
        let (_b, _rx_b) = create(&ctx, "vesta", "belter");

        let who = send(&mut a, &ctx, "who");
        assert!(who.contains("Players online (2)"));
        assert!(who.contains("ceres (level 1 lunite)"));
        assert!(who.contains("vesta (level 1 belter)"));

        let status = send(&mut a, &ctx, "status");
        assert!(status.contains("Health:     100/100"));

        a.experience = 42;
        assert_eq!(send(&mut a, &ctx, "save"), "Saved.");
        assert_eq!(ctx.repo.load("ceres").unwrap().unwrap().experience, 42);

        let help = send(&mut a, &ctx, "help");
        assert!(help.contains("quit (exit, q) - leave the game"));

        let unknown = send(&mut a, &ctx, "dance");
        assert_eq!(
            unknown,
            "Sorry, didn't recognize that command. Try one of who, status, save, help, quit."
        );
    }

    #[test]
    fn second_login_displaces_first() {
        let ctx = ctx();
        let (mut first, mut first_rx) = create(&ctx, "ceres", "lunite");
        crate::dispatch::logout(&mut first, &ctx);
        let (mut old, mut old_rx, _) = connect(&ctx);
        send(&mut old, &ctx, "login");
        send(&mut old, &ctx, "ceres");
        send(&mut old, &ctx, "password");

        let (mut new, _new_rx, _) = connect(&ctx);
        send(&mut new, &ctx, "login");
        send(&mut new, &ctx, "ceres");
        send(&mut new, &ctx, "password");

        assert!(old.outbox.is_closed());
        assert_eq!(ctx.players.len(), 1);
        assert_eq!(ctx.players.get("ceres").unwrap().session_id, new.session_id);

        // The older session's teardown must not evict the winner.
        crate::dispatch::logout(&mut old, &ctx);
        assert_eq!(ctx.players.get("ceres").unwrap().session_id, new.session_id);

        let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
        assert_eq!(rt.block_on(old_rx.recv()).as_deref(), Some(DISPLACED_NOTICE));
        assert_eq!(rt.block_on(old_rx.recv()), None);
        assert_eq!(rt.block_on(first_rx.recv()), None);
    }

    #[test]
    fn store_errors_leave_player_in_place() {
        let ctx = ctx_with(Arc::new(BrokenStore));
        let (mut p, _rx, _) = connect(&ctx);
        send(&mut p, &ctx, "login");
        assert!(send(&mut p, &ctx, "vesta").starts_with("Couldn't look up"));
        assert_eq!(p.mode, Some(ModeId::LoginUsername));

        send(&mut p, &ctx, "create");
        assert!(send(&mut p, &ctx, "vesta").starts_with("Couldn't check that name"));
        assert!(p.name.is_empty());
    }

    #[test]
    fn failed_create_stays_in_creation() {
        let ctx = ctx_with(Arc::new(ReadOnlyStore));
        let (mut p, _rx, _) = connect(&ctx);
        send(&mut p, &ctx, "create");
        send(&mut p, &ctx, "vesta");
        assert_eq!(send(&mut p, &ctx, "belter"), "Couldn't create your new character.");
        assert_eq!(p.mode, Some(ModeId::CreateCharacter));
        assert!(!ctx.players.contains("vesta"));
    }
}
