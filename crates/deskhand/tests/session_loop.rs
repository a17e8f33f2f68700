//! Suspend/resume cycle of the session loop against a scripted runtime.

mod common;

use common::{FakeGate, ScriptedRuntime, approval_payload, auth_payload};
use deskhand::Message;
use deskhand::agent::session::{FAREWELL, GREETING};
use deskhand::agent::{
    AgentError, AgentInput, AppContext, Console, Decision, Interrupt, InterruptResolver,
    NodeUpdate, Resume, RunConfig, ScriptedConsole, SessionLoop, StreamChunk,
};
use serde_json::json;
use std::io;
use std::sync::Arc;

type Session = SessionLoop<Arc<ScriptedRuntime>, Arc<FakeGate>, ScriptedConsole>;

fn session(runtime: &Arc<ScriptedRuntime>, gate: &Arc<FakeGate>, input: &[&str]) -> Session {
    SessionLoop::new(
        AppContext::new(Arc::clone(runtime), RunConfig::default()),
        InterruptResolver::new(Arc::clone(gate)),
        ScriptedConsole::new(input.iter().copied()),
    )
}

fn answer(text: &str) -> StreamChunk {
    StreamChunk::Updates(vec![NodeUpdate {
        node: "model".into(),
        messages: vec![Message::assistant_text(text)],
    }])
}

#[tokio::test]
async fn turn_without_interrupts_completes_in_one_pass() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![vec![Ok(answer(
        "There are 3 open tickets.",
    ))]]));
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &[]);

    let report = session.run_turn("list open tickets").await.unwrap();

    assert_eq!(report.passes, 1);
    assert!(report.resumes.is_empty());
    assert_eq!(runtime.inputs(), vec![AgentInput::user("list open tickets")]);
    let console = session.into_console();
    assert_eq!(console.output.len(), 1);
    assert!(console.output[0].starts_with("🤖: "));
    assert!(console.output[0].contains("There are 3 open tickets."));
}

#[tokio::test]
async fn single_authorization_resumes_with_bare_decision() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![
        vec![Ok(StreamChunk::Interrupts(vec![Interrupt::new(
            "call_1",
            auth_payload("Zendesk_ListTickets", "auth-1"),
        )]))],
        vec![Ok(answer("Here are your tickets."))],
    ]));
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &[]);

    let report = session.run_turn("show my tickets").await.unwrap();

    assert_eq!(report.passes, 2);
    assert_eq!(report.resumes, vec![Resume::Single(Decision::approve())]);
    assert_eq!(
        runtime.inputs()[1],
        AgentInput::Resume(Resume::Single(Decision::approve()))
    );
    assert_eq!(gate.waited(), vec!["auth-1"]);
    assert!(session.console().printed("Here are your tickets."));
}

#[tokio::test]
async fn two_interrupts_resume_with_ordered_list() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![
        vec![Ok(StreamChunk::Interrupts(vec![
            Interrupt::new("call_1", auth_payload("Zendesk_ListTickets", "auth-1")),
            Interrupt::new(
                "call_2",
                approval_payload("Zendesk_MarkTicketSolved", json!({ "ticket_id": 9 })),
            ),
        ]))],
        vec![Ok(answer("Listed tickets; ticket 9 left open."))],
    ]));
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &["n"]);

    let report = session.run_turn("close ticket 9").await.unwrap();

    let expected = Resume::Many(vec![Decision::approve(), Decision::deny()]);
    assert_eq!(report.resumes, vec![expected.clone()]);
    assert_eq!(runtime.inputs()[1], AgentInput::Resume(expected));
    assert_eq!(
        serde_json::to_value(&report.resumes[0]).unwrap(),
        json!([{ "authorized": true }, { "authorized": false }])
    );
}

#[tokio::test]
async fn interrupts_from_several_chunks_are_collected_in_order() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![
        vec![
            Ok(answer("Let me check.")),
            Ok(StreamChunk::Interrupts(vec![Interrupt::new(
                "a",
                approval_payload("Zendesk_AddTicketComment", json!({})),
            )])),
            Ok(StreamChunk::Interrupts(vec![Interrupt::new(
                "b",
                approval_payload("Zendesk_MarkTicketSolved", json!({})),
            )])),
        ],
        vec![],
    ]));
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &["no", "yes"]);

    let report = session.run_turn("reply and close").await.unwrap();

    assert_eq!(
        report.resumes,
        vec![Resume::Many(vec![Decision::deny(), Decision::approve()])]
    );
}

#[tokio::test]
async fn repeated_suspensions_loop_until_clean() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![
        vec![Ok(StreamChunk::Interrupts(vec![Interrupt::new(
            "call_1",
            auth_payload("Zendesk_ListTickets", "auth-1"),
        )]))],
        vec![Ok(StreamChunk::Interrupts(vec![Interrupt::new(
            "call_1",
            approval_payload("Zendesk_ListTickets", json!({})),
        )]))],
        vec![Ok(answer("done"))],
    ]));
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &["y"]);

    let report = session.run_turn("go").await.unwrap();

    assert_eq!(report.passes, 3);
    assert_eq!(report.resumes.len(), 2);
}

#[tokio::test]
async fn stream_error_aborts_the_turn() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![vec![
        Ok(answer("partial")),
        Err(AgentError::RoundLimit(25)),
    ]]));
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &[]);

    let err = session.run_turn("hi").await.unwrap_err();
    assert!(matches!(err, AgentError::RoundLimit(25)));
    assert!(session.console().printed("partial"));
}

#[tokio::test]
async fn run_survives_turn_errors_and_exits_on_command() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![
        vec![Err(AgentError::RoundLimit(1))],
        vec![Ok(answer("second turn ok"))],
    ]));
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &["first", "second", "EXIT", "never"]);

    session.run().await;

    let console = session.into_console();
    assert_eq!(console.output[0], GREETING);
    assert_eq!(console.output.last().unwrap(), FAREWELL);
    assert_eq!(console.errors, vec!["Error: stopped after 1 model steps without a final answer"]);
    assert!(console.printed("second turn ok"));
    assert_eq!(console.remaining(), 1);
    assert!(console.prompts.iter().all(|p| p == "> "));
    assert_eq!(
        runtime.inputs(),
        vec![AgentInput::user("first"), AgentInput::user("second")]
    );
}

#[tokio::test]
async fn lines_reach_the_agent_exactly_as_typed() {
    let runtime = Arc::new(ScriptedRuntime::default());
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &["", "   ", " exit ", "  list tickets ", "Exit"]);

    session.run().await;

    assert_eq!(
        runtime.inputs(),
        vec![
            AgentInput::user(""),
            AgentInput::user("   "),
            AgentInput::user(" exit "),
            AgentInput::user("  list tickets "),
        ]
    );
    assert_eq!(session.console().remaining(), 0);
}

#[tokio::test]
async fn run_ends_at_end_of_input() {
    let runtime = Arc::new(ScriptedRuntime::default());
    let gate = Arc::new(FakeGate::default());
    let mut session = session(&runtime, &gate, &[]);

    session.run().await;

    assert!(runtime.inputs().is_empty());
    assert_eq!(session.console().output.last().unwrap(), FAREWELL);
}

/// Console whose first `failures` reads fail.
struct FailingReads {
    failures: usize,
    color: bool,
    inner: ScriptedConsole,
}

impl Console for FailingReads {
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        if self.failures > 0 {
            self.failures -= 1;
            return Err(io::Error::new(io::ErrorKind::InvalidData, "bad bytes"));
        }
        self.inner.read_line(prompt)
    }

    fn print_line(&mut self, text: &str) {
        self.inner.print_line(text);
    }

    fn print_error(&mut self, text: &str) {
        self.inner.print_error(text);
    }

    fn supports_color(&self) -> bool {
        self.color
    }
}

fn failing_session(
    runtime: &Arc<ScriptedRuntime>,
    failures: usize,
    input: &[&str],
) -> SessionLoop<Arc<ScriptedRuntime>, Arc<FakeGate>, FailingReads> {
    SessionLoop::new(
        AppContext::new(Arc::clone(runtime), RunConfig::default()),
        InterruptResolver::new(Arc::new(FakeGate::default())),
        FailingReads {
            failures,
            color: false,
            inner: ScriptedConsole::new(input.iter().copied()),
        },
    )
}

#[tokio::test]
async fn unreadable_line_is_reported_and_the_session_continues() {
    let runtime = Arc::new(ScriptedRuntime::new(vec![vec![Ok(answer("hello back"))]]));
    let mut session = failing_session(&runtime, 1, &["hello", "exit"]);

    session.run().await;

    let console = session.into_console().inner;
    assert_eq!(console.errors, vec!["Error: could not read input: bad bytes"]);
    assert!(console.printed("hello back"));
    assert_eq!(console.output.last().unwrap(), FAREWELL);
    assert_eq!(runtime.inputs(), vec![AgentInput::user("hello")]);
}

#[tokio::test]
async fn repeated_read_failures_end_the_session() {
    let runtime = Arc::new(ScriptedRuntime::default());
    let mut session = failing_session(&runtime, usize::MAX, &[]);

    session.run().await;

    let console = session.into_console().inner;
    assert_eq!(console.errors.len(), 3);
    assert_eq!(console.output.last().unwrap(), FAREWELL);
    assert!(runtime.inputs().is_empty());
}

#[tokio::test]
async fn colors_only_on_a_color_console() {
    let runtime = Arc::new(ScriptedRuntime::default());
    let mut session = SessionLoop::new(
        AppContext::new(Arc::clone(&runtime), RunConfig::default()),
        InterruptResolver::new(Arc::new(FakeGate::default())),
        FailingReads {
            failures: 0,
            color: true,
            inner: ScriptedConsole::default(),
        },
    );

    session.run().await;

    let output = session.into_console().inner.output;
    assert!(output[0].starts_with('\u{1b}') && output[0].contains(GREETING));
    assert!(output[1].starts_with('\u{1b}') && output[1].contains(FAREWELL));
}
