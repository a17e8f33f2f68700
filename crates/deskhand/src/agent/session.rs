//! The interactive session: read a line, run the turn, resolve interrupts,
//! resume, repeat.

use super::console::Console;
use super::interrupt::{AgentInput, Interrupt, Resume, RunConfig, StreamChunk};
use super::resolver::InterruptResolver;
use super::runtime::{AgentError, AgentRuntime};
use crate::arcade::AuthorizationGate;
use crossterm::style::{StyledContent, Stylize};
use futures::StreamExt;
use tracing::{debug, error, info, warn};

pub const PROMPT: &str = "> ";
pub const EXIT_COMMAND: &str = "exit";
pub const GREETING: &str = "Welcome to the chatbot! Type 'exit' to quit.";
pub const FAREWELL: &str = "👋 Bye...";
/// Prefix of every message the agent prints.
pub const AGENT_PREFIX: &str = "🤖: ";
/// Consecutive unreadable lines after which the session ends.
const MAX_READ_FAILURES: u32 = 3;

/// Long-lived objects built once at startup.
#[derive(Debug)]
pub struct AppContext<R> {
    pub runtime: R,
    pub run_config: RunConfig,
}

impl<R: AgentRuntime> AppContext<R> {
    pub fn new(runtime: R, run_config: RunConfig) -> Self {
        Self {
            runtime,
            run_config,
        }
    }
}

/// What happened during one turn.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnReport {
    /// Number of times the runtime stream was drained.
    pub passes: usize,
    /// Every resumption value sent, in order.
    pub resumes: Vec<Resume>,
}

/// Drives turns against a runtime, resolving interrupts through the operator.
pub struct SessionLoop<R, G, C> {
    context: AppContext<R>,
    resolver: InterruptResolver<G>,
    console: C,
}

impl<R, G, C> SessionLoop<R, G, C>
where
    R: AgentRuntime,
    G: AuthorizationGate,
    C: Console,
{
    pub fn new(context: AppContext<R>, resolver: InterruptResolver<G>, console: C) -> Self {
        Self {
            context,
            resolver,
            console,
        }
    }

    pub fn context(&self) -> &AppContext<R> {
        &self.context
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn into_console(self) -> C {
        self.console
    }

    /// Drain one runtime stream, printing messages as they arrive and
    /// collecting interrupts.
    pub async fn stream_agent(&mut self, input: AgentInput) -> Result<Vec<Interrupt>, AgentError> {
        let mut stream = self
            .context
            .runtime
            .stream(input, &self.context.run_config);
        let mut interrupts = Vec::new();

        while let Some(chunk) = stream.next().await {
            match chunk? {
                StreamChunk::Interrupts(batch) => interrupts.extend(batch),
                StreamChunk::Updates(updates) => {
                    for update in updates {
                        debug!("Update from {}: {} message(s)", update.node, update.messages.len());
                        for message in update.messages {
                            self.console.print_line(&format!(
                                "{AGENT_PREFIX}{}",
                                message.to_formatted_string()
                            ));
                        }
                    }
                }
            }
        }
        Ok(interrupts)
    }

    /// Run one user turn until no interrupts remain.
    pub async fn run_turn(&mut self, text: &str) -> Result<TurnReport, AgentError> {
        let mut input = AgentInput::user(text);
        let mut report = TurnReport::default();

        loop {
            report.passes += 1;
            let interrupts = self.stream_agent(input).await?;
            if interrupts.is_empty() {
                return Ok(report);
            }

            let decisions = self
                .resolver
                .resolve_all(&interrupts, &mut self.console)
                .await;
            let resume = Resume::from_decisions(decisions);
            debug!("Resuming with {}", serde_json::to_string(&resume).unwrap_or_default());
            report.resumes.push(resume.clone());
            input = AgentInput::Resume(resume);
        }
    }

    /// Prompt for input until `exit` or end of input. Every other line,
    /// blank ones included, is sent to the agent as typed. Turn failures and
    /// unreadable input are reported and the session carries on.
    pub async fn run(&mut self) {
        let greeting = self.paint(GREETING, |s| s.green());
        self.console.print_line(&greeting);

        let mut read_failures = 0;
        loop {
            let line = match self.console.read_line(PROMPT) {
                Ok(Some(line)) => {
                    read_failures = 0;
                    line
                }
                Ok(None) => break,
                Err(e) => {
                    read_failures += 1;
                    warn!("Could not read input ({read_failures}/{MAX_READ_FAILURES}): {e}");
                    self.console.print_error(&format!("Error: could not read input: {e}"));
                    if read_failures >= MAX_READ_FAILURES {
                        break;
                    }
                    continue;
                }
            };
            if line.eq_ignore_ascii_case(EXIT_COMMAND) {
                break;
            }
            match self.run_turn(&line).await {
                Ok(report) => info!(
                    "Turn finished after {} pass(es), {} resume(s)",
                    report.passes,
                    report.resumes.len()
                ),
                Err(e) => {
                    error!("Turn failed: {e}");
                    self.console.print_error(&format!("Error: {e}"));
                }
            }
        }

        let farewell = self.paint(FAREWELL, |s| s.red());
        self.console.print_line(&farewell);
    }

    fn paint<'a>(
        &self,
        text: &'a str,
        color: impl FnOnce(&'a str) -> StyledContent<&'a str>,
    ) -> String {
        if self.console.supports_color() {
            color(text).to_string()
        } else {
            text.to_string()
        }
    }
}
