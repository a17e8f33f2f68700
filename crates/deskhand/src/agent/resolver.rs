//! Turns interrupts into decisions.
//!
//! Authorization interrupts are delegated to an [`AuthorizationGate`]: the
//! operator is shown the URL and the resolver waits for the out-of-band flow
//! to finish. Human-approval interrupts are put to the operator as a yes/no
//! question. Anything else is denied.

use super::console::Console;
use super::interrupt::{Decision, Interrupt, InterruptKind};
use crate::arcade::AuthorizationGate;
use tracing::{debug, warn};

/// Prefix of every status line the resolver prints.
pub const STATUS_PREFIX: &str = "⚙️: ";

/// Resolves interrupts one at a time, in order.
#[derive(Debug)]
pub struct InterruptResolver<G> {
    gate: G,
}

impl<G: AuthorizationGate> InterruptResolver<G> {
    pub fn new(gate: G) -> Self {
        Self { gate }
    }

    pub fn gate(&self) -> &G {
        &self.gate
    }

    /// Resolve a batch, returning one decision per interrupt in the same order.
    pub async fn resolve_all(
        &self,
        interrupts: &[Interrupt],
        console: &mut dyn Console,
    ) -> Vec<Decision> {
        let mut decisions = Vec::with_capacity(interrupts.len());
        for interrupt in interrupts {
            decisions.push(self.resolve(interrupt, console).await);
        }
        decisions
    }

    /// Resolve a single interrupt. Failures are reported to the operator and
    /// come back as a denial; nothing is retried here.
    pub async fn resolve(&self, interrupt: &Interrupt, console: &mut dyn Console) -> Decision {
        debug!("Resolving interrupt {}", interrupt.id);
        match interrupt.kind() {
            InterruptKind::Authorization {
                tool_name,
                authorization,
            } => {
                status(console, &format!("Authorization required for tool call {tool_name}"));
                status(
                    console,
                    &format!(
                        "Please authorize in your browser {}",
                        authorization.url.as_deref().unwrap_or("(no URL provided)")
                    ),
                );
                status(console, "Waiting for you to complete authorization...");

                match self.gate.wait_for_completion(&authorization.id).await {
                    Ok(_) => {
                        status(console, "Authorization granted. Resuming execution...");
                        Decision::approve()
                    }
                    Err(e) => {
                        warn!("Authorization {} for {tool_name} failed: {e}", authorization.id);
                        console.print_error(&format!(
                            "{STATUS_PREFIX}Error waiting for authorization to complete: {e}"
                        ));
                        Decision::deny()
                    }
                }
            }
            InterruptKind::HumanApproval { tool_name, input } => {
                status(console, &format!("Human in the loop required for tool call {tool_name}"));
                let rendered = serde_json::to_string_pretty(&input).unwrap_or_else(|_| input.to_string());
                status(console, &format!("Please approve the tool call {rendered}"));

                match console.confirm("Do you approve this tool call?") {
                    Ok(approved) => Decision {
                        authorized: approved,
                    },
                    Err(e) => {
                        warn!("Could not read approval for {tool_name}: {e}");
                        console.print_error(&format!("{STATUS_PREFIX}Could not read your answer: {e}"));
                        Decision::deny()
                    }
                }
            }
            InterruptKind::Unrecognized { reason } => {
                warn!(
                    "Unrecognized interrupt {} ({reason}); denying. Payload: {}",
                    interrupt.id, interrupt.value
                );
                console.print_error(&format!(
                    "{STATUS_PREFIX}Unrecognized interrupt {}: {reason}. Denied.",
                    interrupt.id
                ));
                Decision::deny()
            }
        }
    }
}

fn status(console: &mut dyn Console, text: &str) {
    console.print_line(&format!("{STATUS_PREFIX}{text}"));
}
