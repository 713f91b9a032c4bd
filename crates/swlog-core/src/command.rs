use std::collections::HashMap;
use std::time::Instant;

use crate::bus::EventBus;
use crate::console::Console;
use crate::event::{Event, UserCommand};
use crate::signal::{Controller, Signal, WorkerMessage};
use crate::tracker::StatusTracker;

/// Output from a command execution.
pub enum CommandOutput {
    /// Lines to display in the console.
    Lines(Vec<String>),
    /// Signal that the app should quit.
    Quit,
}

/// Context available to commands during execution.
///
/// Commands read the tracker but never mutate it: anything that changes
/// tracker state is published to the bus so it is applied in arrival order.
pub struct CommandContext<'a> {
    pub tracker: &'a StatusTracker,
    pub console: &'a mut Console,
    pub bus: &'a mut EventBus,
    /// Latest controller snapshot reported by the worker feed.
    pub controller: Option<Controller>,
    pub started_at: Instant,
}

/// A console command.
pub trait Command: Send + Sync {
    fn name(&self) -> &str;
    fn aliases(&self) -> &[&str] { &[] }
    fn description(&self) -> &str;
    fn usage(&self) -> &str { self.name() }
    fn execute(&self, args: &[&str], ctx: &mut CommandContext) -> CommandOutput;
}

/// Registry of console commands.
pub struct CommandRegistry {
    commands: Vec<Box<dyn Command>>,
    lookup: HashMap<String, usize>,
}

impl Default for CommandRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self {
            commands: Vec::new(),
            lookup: HashMap::new(),
        }
    }

    pub fn register(&mut self, cmd: Box<dyn Command>) {
        let idx = self.commands.len();
        self.lookup.insert(cmd.name().to_string(), idx);
        for alias in cmd.aliases() {
            self.lookup.insert(alias.to_string(), idx);
        }
        self.commands.push(cmd);
    }

    pub fn execute(&self, input: &str, ctx: &mut CommandContext) -> CommandOutput {
        let parts: Vec<&str> = input.split_whitespace().collect();
        let Some((&name, args)) = parts.split_first() else {
            return CommandOutput::Lines(vec![]);
        };

        if name == "help" || name == "?" {
            return CommandOutput::Lines(self.help_lines(args.first().copied()));
        }

        match self.lookup.get(name) {
            Some(&idx) => self.commands[idx].execute(args, ctx),
            None => CommandOutput::Lines(vec![format!(
                "unknown command: '{}'. Type 'help' for available commands.",
                name
            )]),
        }
    }

    fn help_lines(&self, topic: Option<&str>) -> Vec<String> {
        if let Some(topic) = topic {
            return match self.lookup.get(topic) {
                Some(&idx) => {
                    let cmd = &self.commands[idx];
                    vec![format!("usage: {}", cmd.usage()), format!("  {}", cmd.description())]
                }
                None => vec![format!("no such command: '{}'", topic)],
            };
        }
        self.commands
            .iter()
            .map(|cmd| {
                let aliases = cmd.aliases();
                if aliases.is_empty() {
                    format!("  {:22} {}", cmd.usage(), cmd.description())
                } else {
                    format!(
                        "  {:22} {} (aliases: {})",
                        cmd.usage(),
                        cmd.description(),
                        aliases.join(", ")
                    )
                }
            })
            .collect()
    }

    pub fn commands(&self) -> &[Box<dyn Command>] {
        &self.commands
    }
}

// ── Built-in commands ──

pub struct ClearCommand;

impl Command for ClearCommand {
    fn name(&self) -> &str { "clear" }
    fn aliases(&self) -> &[&str] { &["cls"] }
    fn description(&self) -> &str { "Clear console scrollback" }

    fn execute(&self, _args: &[&str], ctx: &mut CommandContext) -> CommandOutput {
        ctx.console.clear_logs();
        CommandOutput::Lines(vec![])
    }
}

pub struct ClearLogsCommand;

impl Command for ClearLogsCommand {
    fn name(&self) -> &str { "logs-clear" }
    fn aliases(&self) -> &[&str] { &["clear-logs"] }
    fn description(&self) -> &str { "Empty the activity log and reset counters" }

    fn execute(&self, _args: &[&str], ctx: &mut CommandContext) -> CommandOutput {
        ctx.bus.publish(Event::Command(UserCommand::ClearLogs));
        CommandOutput::Lines(vec!["activity log cleared".into()])
    }
}

pub struct IdleCommand;

impl Command for IdleCommand {
    fn name(&self) -> &str { "idle" }
    fn description(&self) -> &str { "Show or switch idle logging" }
    fn usage(&self) -> &str { "idle [on|off|toggle]" }

    fn execute(&self, args: &[&str], ctx: &mut CommandContext) -> CommandOutput {
        let enabled = ctx.tracker.poller().is_enabled();
        let wanted = match args.first().copied() {
            None => {
                return CommandOutput::Lines(vec![format!(
                    "idle logging: {} ({})",
                    on_off(enabled),
                    if ctx.tracker.poller().is_running() { "running" } else { "stopped" }
                )]);
            }
            Some("on") => true,
            Some("off") => false,
            Some("toggle") => !enabled,
            Some(other) => {
                return CommandOutput::Lines(vec![format!(
                    "expected on, off or toggle, got '{}'",
                    other
                )]);
            }
        };

        if wanted == enabled {
            return CommandOutput::Lines(vec![format!("idle logging already {}", on_off(enabled))]);
        }
        ctx.bus.publish(Event::Command(UserCommand::ToggleIdleLogging));
        CommandOutput::Lines(vec![format!("idle logging -> {}", on_off(wanted))])
    }
}

fn on_off(v: bool) -> &'static str {
    if v { "on" } else { "off" }
}

pub struct StatusCommand;

impl Command for StatusCommand {
    fn name(&self) -> &str { "status" }
    fn aliases(&self) -> &[&str] { &["st"] }
    fn description(&self) -> &str { "Show tracker state" }

    fn execute(&self, _args: &[&str], ctx: &mut CommandContext) -> CommandOutput {
        let t = ctx.tracker;
        let status = t
            .current_status()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into());
        let controller = ctx
            .controller
            .map(|c| c.state.to_string())
            .unwrap_or_else(|| "none".into());
        let counters = t.counters();
        let capacity = t
            .log()
            .capacity()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "unbounded".into());
        CommandOutput::Lines(vec![
            format!("status:     {} ({})", status, t.status_text()),
            format!("active:     {}", t.is_active()),
            format!("controller: {}", controller),
            format!(
                "idle:       {} / {}",
                on_off(t.poller().is_enabled()),
                if t.poller().is_running() { "running" } else { "stopped" }
            ),
            format!(
                "log:        {} (capacity {}, evicted {})",
                counters.events_label,
                capacity,
                t.log().evicted()
            ),
            format!("halted:     {}", t.is_halted()),
        ])
    }
}

pub struct EmitCommand;

impl Command for EmitCommand {
    fn name(&self) -> &str { "emit" }
    fn description(&self) -> &str { "Inject a synthetic lifecycle signal" }
    fn usage(&self) -> &str { "emit <signal> [args]" }

    fn execute(&self, args: &[&str], ctx: &mut CommandContext) -> CommandOutput {
        match parse_signal(args, ctx.controller) {
            Ok(signal) => {
                let label = signal.label();
                ctx.bus.publish(Event::Signal(signal));
                CommandOutput::Lines(vec![format!("queued {}", label)])
            }
            Err(msg) => CommandOutput::Lines(vec![
                msg,
                "signals: registered, failed [reason], update, controller, poll, lost, unsupported, message <status> [name]".into(),
            ]),
        }
    }
}

/// Build a signal from `emit` arguments.
///
/// `poll` and `message` use the supplied controller snapshot, matching what
/// the worker feed would have reported at that moment.
pub fn parse_signal(args: &[&str], controller: Option<Controller>) -> Result<Signal, String> {
    let Some((&kind, rest)) = args.split_first() else {
        return Err("usage: emit <signal> [args]".into());
    };
    let signal = match kind {
        "registered" => Signal::RegistrationSucceeded { controller },
        "failed" => Signal::RegistrationFailed {
            reason: if rest.is_empty() { "manual".into() } else { rest.join(" ") },
        },
        "update" => Signal::UpdateFound { installing: true },
        "controller" => Signal::ControllerChange {
            controller: Some(controller.unwrap_or_else(Controller::activated)),
        },
        "poll" => Signal::PeriodicPoll { controller },
        "lost" => Signal::PeriodicPoll { controller: None },
        "unsupported" => Signal::UnsupportedEnvironment,
        "message" | "msg" => {
            let Some((&status, name)) = rest.split_first() else {
                return Err("usage: emit message <status> [name]".into());
            };
            let name = if name.is_empty() { status.to_string() } else { name.join(" ") };
            Signal::Message {
                message: WorkerMessage::log_event(status, name),
                controller,
            }
        }
        other => return Err(format!("unknown signal: '{}'", other)),
    };
    Ok(signal)
}

pub struct UptimeCommand;

impl Command for UptimeCommand {
    fn name(&self) -> &str { "uptime" }
    fn description(&self) -> &str { "Show monitor uptime" }

    fn execute(&self, _args: &[&str], ctx: &mut CommandContext) -> CommandOutput {
        let secs = ctx.started_at.elapsed().as_secs();
        CommandOutput::Lines(vec![format!(
            "Uptime: {:02}:{:02}:{:02}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )])
    }
}

pub struct QuitCommand;

impl Command for QuitCommand {
    fn name(&self) -> &str { "quit" }
    fn aliases(&self) -> &[&str] { &["exit", "q"] }
    fn description(&self) -> &str { "Exit swlog" }

    fn execute(&self, _args: &[&str], _ctx: &mut CommandContext) -> CommandOutput {
        CommandOutput::Quit
    }
}

/// Registry pre-loaded with every built-in command.
pub fn builtin_registry() -> CommandRegistry {
    let mut reg = CommandRegistry::new();
    reg.register(Box::new(ClearCommand));
    reg.register(Box::new(ClearLogsCommand));
    reg.register(Box::new(IdleCommand));
    reg.register(Box::new(StatusCommand));
    reg.register(Box::new(EmitCommand));
    reg.register(Box::new(UptimeCommand));
    reg.register(Box::new(QuitCommand));
    reg
}
