use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use session::{ModeId, Player};

use crate::context::GameContext;
use crate::error::{CommandError, ConfigError};
use crate::render::Renderer;
use crate::view::PlayerView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    /// The player asked to leave. Not a fault: the session shuts down cleanly.
    Exited,
}

/// Text for the player plus what the session should do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub text: String,
    pub outcome: Outcome,
}

impl Response {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            outcome: Outcome::Continue,
        }
    }

    pub fn empty() -> Self {
        Self::text(String::new())
    }

    pub fn exit(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            outcome: Outcome::Exited,
        }
    }

    pub fn is_exit(&self) -> bool {
        self.outcome == Outcome::Exited
    }
}

pub type CommandResult = Result<Response, CommandError>;

/// Something that can answer a line of input in a given mode.
///
/// Handlers get the full trimmed line, not just the arguments, so default
/// handlers can treat the whole line as a name or password.
pub trait CommandHandler: Send + Sync {
    fn handle(&self, player: &mut Player, msg: &str, ctx: &GameContext) -> CommandResult;
}

impl<F> CommandHandler for F
where
    F: Fn(&mut Player, &str, &GameContext) -> CommandResult + Send + Sync,
{
    fn handle(&self, player: &mut Player, msg: &str, ctx: &GameContext) -> CommandResult {
        self(player, msg, ctx)
    }
}

/// Runs when a player switches into a mode, before its description renders.
pub trait EnterHook: Send + Sync {
    fn on_enter(&self, player: &mut Player, ctx: &GameContext);
}

impl<F> EnterHook for F
where
    F: Fn(&mut Player, &GameContext) + Send + Sync,
{
    fn on_enter(&self, player: &mut Player, ctx: &GameContext) {
        self(player, ctx)
    }
}

#[derive(Clone)]
pub struct Command {
    pub name: String,
    pub aliases: Vec<String>,
    pub help: String,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    pub fn new(name: &str, handler: impl CommandHandler + 'static) -> Self {
        Self {
            name: name.to_lowercase(),
            aliases: Vec::new(),
            help: String::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases.extend(aliases.iter().map(|a| a.to_lowercase()));
        self
    }

    pub fn help(mut self, help: &str) -> Self {
        self.help = help.to_string();
        self
    }

    /// Name followed by aliases.
    pub fn words(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// `verb` must already be lower-cased.
    pub fn matches(&self, verb: &str) -> bool {
        self.words().any(|w| w == verb)
    }

    pub fn invoke(&self, player: &mut Player, msg: &str, ctx: &GameContext) -> CommandResult {
        self.handler.handle(player, msg, ctx)
    }
}

impl fmt::Debug for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Description {
    Static(String),
    /// Template id resolved through the [`Renderer`].
    Template(String),
}

/// One state of the session machine. Immutable once built.
#[derive(Clone)]
pub struct Mode {
    pub id: ModeId,
    pub name: &'static str,
    pub description: Description,
    commands: Vec<Command>,
    default_handler: Option<Arc<dyn CommandHandler>>,
    on_enter: Option<Arc<dyn EnterHook>>,
}

impl Mode {
    pub fn new(id: ModeId, name: &'static str, description: Description) -> Self {
        Self {
            id,
            name,
            description,
            commands: Vec::new(),
            default_handler: None,
            on_enter: None,
        }
    }

    pub fn command(mut self, command: Command) -> Self {
        self.commands.push(command);
        self
    }

    pub fn default_handler(mut self, handler: impl CommandHandler + 'static) -> Self {
        self.default_handler = Some(Arc::new(handler));
        self
    }

    pub fn on_enter(mut self, hook: impl EnterHook + 'static) -> Self {
        self.on_enter = Some(Arc::new(hook));
        self
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn command_names(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name.as_str()).collect()
    }

    /// First command, in declared order, whose name or alias is `verb`.
    pub fn find_command(&self, verb: &str) -> Option<&Command> {
        self.commands.iter().find(|c| c.matches(verb))
    }

    pub fn fallback(&self) -> Option<&dyn CommandHandler> {
        self.default_handler.as_deref()
    }

    pub fn enter_hook(&self) -> Option<&dyn EnterHook> {
        self.on_enter.as_deref()
    }

    /// Text shown when a player enters this mode.
    pub fn describe(&self, player: &Player, renderer: &Renderer) -> String {
        match &self.description {
            Description::Static(text) => text.clone(),
            Description::Template(id) => renderer.render(id, &PlayerView::from(player)),
        }
    }

    /// Reject empty words and any word claimed by two commands.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = HashSet::new();
        for word in self.commands.iter().flat_map(|c| c.words()) {
            if word.trim().is_empty() {
                return Err(ConfigError::EmptyCommandWord(self.id));
            }
            if !seen.insert(word) {
                return Err(ConfigError::CommandCollision {
                    mode: self.id,
                    word: word.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mode")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("commands", &self.commands)
            .field("has_default", &self.default_handler.is_some())
            .field("has_on_enter", &self.on_enter.is_some())
            .finish()
    }
}

/// Every mode, indexed by id. Built once at startup; lookups cannot fail.
#[derive(Debug)]
pub struct ModeRegistry {
    modes: Vec<Mode>,
}

impl ModeRegistry {
    pub fn new(modes: Vec<Mode>) -> Result<Self, ConfigError> {
        let mut slots: Vec<Option<Mode>> = ModeId::ALL.iter().map(|_| None).collect();
        for mode in modes {
            mode.validate()?;
            let slot = &mut slots[mode.id.index()];
            if slot.is_some() {
                return Err(ConfigError::DuplicateMode(mode.id));
            }
            *slot = Some(mode);
        }

        let modes = slots
            .into_iter()
            .zip(ModeId::ALL)
            .map(|(slot, id)| slot.ok_or(ConfigError::MissingMode(id)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { modes })
    }

    pub fn get(&self, id: ModeId) -> &Mode {
        &self.modes[id.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Mode> {
        self.modes.iter()
    }

    /// True if any mode binds `word` (case-insensitive) to a command.
    pub fn is_command_word(&self, word: &str) -> bool {
        let word = word.to_lowercase();
        self.modes.iter().any(|m| m.find_command(&word).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(_: &mut Player, _: &str, _: &GameContext) -> CommandResult {
        Ok(Response::empty())
    }

    fn bare(id: ModeId) -> Mode {
        Mode::new(id, "bare", Description::Static(String::new()))
    }

    fn all_bare() -> Vec<Mode> {
        ModeId::ALL.iter().map(|&id| bare(id)).collect()
    }

    #[test]
    fn command_matches_name_and_aliases() {
        let cmd = Command::new("Quit", noop).aliases(&["EXIT", "q"]);
        assert!(cmd.matches("quit"));
        assert!(cmd.matches("exit"));
        assert!(cmd.matches("q"));
        assert!(!cmd.matches("qu"));
        assert_eq!(cmd.words().collect::<Vec<_>>(), vec!["quit", "exit", "q"]);
    }

    #[test]
    fn find_command_uses_declared_order() {
        let mode = bare(ModeId::Game)
            .command(Command::new("look", noop).help("first"))
            .command(Command::new("list", noop).aliases(&["l"]).help("second"));
        assert_eq!(mode.find_command("l").unwrap().name, "list");
        assert_eq!(mode.find_command("look").unwrap().help, "first");
        assert!(mode.find_command("dance").is_none());
        assert_eq!(mode.command_names(), vec!["look", "list"]);
    }

    #[test]
    fn alias_collision_is_rejected() {
        let mode = bare(ModeId::Splash)
            .command(Command::new("login", noop).aliases(&["l"]))
            .command(Command::new("look", noop).aliases(&["l"]));
        assert_eq!(
            mode.validate(),
            Err(ConfigError::CommandCollision {
                mode: ModeId::Splash,
                word: "l".into()
            })
        );
    }

    #[test]
    fn empty_alias_is_rejected() {
        let mode = bare(ModeId::Splash).command(Command::new("login", noop).aliases(&[" "]));
        assert_eq!(mode.validate(), Err(ConfigError::EmptyCommandWord(ModeId::Splash)));
    }

    #[test]
    fn registry_requires_every_mode_once() {
        assert!(ModeRegistry::new(all_bare()).is_ok());

        let mut missing = all_bare();
        missing.pop();
        assert_eq!(
            ModeRegistry::new(missing).unwrap_err(),
            ConfigError::MissingMode(ModeId::Game)
        );

        let mut doubled = all_bare();
        doubled.push(bare(ModeId::Splash));
        assert_eq!(
            ModeRegistry::new(doubled).unwrap_err(),
            ConfigError::DuplicateMode(ModeId::Splash)
        );
    }

    #[test]
    fn registry_lookup_by_id() {
        let mut modes = all_bare();
        modes[ModeId::Game.index()] = bare(ModeId::Game).command(Command::new("who", noop));
        let registry = ModeRegistry::new(modes).unwrap();
        assert_eq!(registry.get(ModeId::Game).id, ModeId::Game);
        assert!(registry.is_command_word("WHO"));
        assert!(!registry.is_command_word("abcd"));
    }

    #[test]
    fn response_constructors() {
        assert!(Response::exit("bye").is_exit());
        assert!(!Response::text("hi").is_exit());
        assert!(Response::empty().text.is_empty());
    }
}
