//! Core chat session management.
//!
//! This module provides the `ChatSession` struct which owns the transcript,
//! drives the prompt loop and streams replies from the selected provider.

use futures::StreamExt;

use crate::chat::commands::{UserInput, classify_input};
use crate::chat::interrupt::Interrupt;
use crate::error::Result;
use crate::observability::{SESSION_INTERRUPTS, SESSION_TURN_FAILURES, SESSION_TURNS};
use crate::providers::ChatCompletion;
use crate::render::Renderer;
use crate::types::{ChatMessage, ExecutionSettings};

/// Prompt shown before every line of input.
pub const PROMPT: &str = "Q (or exit): ";

/// A source of user input lines.
pub trait LineSource {
    /// Shows `prompt` and reads one line without its terminator.
    ///
    /// Returns `None` at end of input.
    fn read_line(&mut self, prompt: &str) -> Option<String>;
}

/// Whether the prompt loop keeps going.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Running,
    Terminated,
}

/// How a turn that reached the provider ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply streamed to completion and is in the transcript.
    Completed,

    /// The user interrupted the request; the session is now terminated.
    Interrupted,
}

/// A chat session that manages conversation state and API interactions.
///
/// The transcript always starts with the system message. Each completed turn
/// adds the user message and the assistant reply; failed turns add nothing.
pub struct ChatSession {
    provider: Box<dyn ChatCompletion>,
    settings: ExecutionSettings,
    transcript: Vec<ChatMessage>,
    state: SessionState,
}

impl ChatSession {
    /// Creates a running session whose transcript holds only `system_prompt`.
    pub fn new(provider: Box<dyn ChatCompletion>, system_prompt: &str) -> Self {
        Self {
            provider,
            settings: ExecutionSettings::default(),
            transcript: vec![ChatMessage::system(system_prompt)],
            state: SessionState::Running,
        }
    }

    /// Sets the sampling settings sent with every request.
    pub fn with_settings(mut self, settings: ExecutionSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The conversation so far, oldest first.
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn provider(&self) -> &dyn ChatCompletion {
        self.provider.as_ref()
    }

    /// Reads and answers lines until the session terminates.
    ///
    /// Provider failures are reported through `renderer` and the loop goes
    /// back to the prompt.
    pub async fn run(
        &mut self,
        input: &mut dyn LineSource,
        renderer: &mut dyn Renderer,
        interrupt: &Interrupt,
    ) {
        while self.state == SessionState::Running {
            if interrupt.is_triggered() {
                self.state = SessionState::Terminated;
                break;
            }
            let line = input.read_line(PROMPT);
            // Ctrl-C while the read was blocked.
            if interrupt.is_triggered() {
                self.state = SessionState::Terminated;
                break;
            }
            if let Err(err) = self.handle_input(line.as_deref(), renderer, interrupt).await {
                renderer.print_error(&err.to_string());
            }
        }
    }

    /// Handles one line of input and returns the resulting state.
    pub async fn handle_input(
        &mut self,
        line: Option<&str>,
        renderer: &mut dyn Renderer,
        interrupt: &Interrupt,
    ) -> Result<SessionState> {
        match classify_input(line) {
            UserInput::Exit => {
                self.state = SessionState::Terminated;
            }
            UserInput::Message(message) => {
                self.send_streaming(&message, renderer, interrupt).await?;
            }
        }
        Ok(self.state)
    }

    /// Sends a user message and streams the response.
    ///
    /// This method:
    /// 1. Adds the user message to history
    /// 2. Sends the whole transcript to the provider
    /// 3. Renders each fragment as it arrives
    /// 4. Adds the complete assistant response to history
    ///
    /// If `interrupt` fires first, the request is abandoned, no reply is
    /// recorded and the session terminates.
    ///
    /// # Errors
    ///
    /// Returns the provider's error if the request or the stream fails. The
    /// user message is removed again so the transcript stays consistent.
    pub async fn send_streaming(
        &mut self,
        user_input: &str,
        renderer: &mut dyn Renderer,
        interrupt: &Interrupt,
    ) -> Result<TurnOutcome> {
        let previous_len = self.transcript.len();
        self.transcript.push(ChatMessage::user(user_input));
        SESSION_TURNS.click();

        let reply = tokio::select! {
            biased;
            _ = interrupt.triggered() => None,
            reply = self.stream_reply(renderer) => Some(reply),
        };

        match reply {
            Some(Ok(reply)) => {
                renderer.finish_response();
                self.transcript.push(ChatMessage::assistant(reply));
                Ok(TurnOutcome::Completed)
            }
            Some(Err(err)) => {
                SESSION_TURN_FAILURES.click();
                self.transcript.truncate(previous_len);
                Err(err)
            }
            None => {
                SESSION_INTERRUPTS.click();
                renderer.print_interrupted();
                self.state = SessionState::Terminated;
                Ok(TurnOutcome::Interrupted)
            }
        }
    }

    async fn stream_reply(&self, renderer: &mut dyn Renderer) -> Result<String> {
        let mut stream = self
            .provider
            .stream_chat(&self.transcript, &self.settings)
            .await?;
        let mut reply = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment?;
            renderer.print_text(&fragment);
            reply.push_str(&fragment);
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use futures::stream;

    use super::*;
    use crate::client::ChatStream;
    use crate::error::Error;
    use crate::types::ChatRole;

    enum Script {
        Reply(Vec<&'static str>),
        Fail(Error),
        FailMidStream(Vec<&'static str>, Error),
        Hang(Vec<&'static str>),
    }

    struct ScriptedProvider {
        scripts: Mutex<VecDeque<Script>>,
        requests: Arc<Mutex<Vec<Vec<ChatMessage>>>>,
    }

    impl ScriptedProvider {
        fn new(scripts: Vec<Script>) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                requests: Arc::default(),
            }
        }
    }

    #[async_trait]
    impl ChatCompletion for ScriptedProvider {
        fn provider_name(&self) -> &str {
            "scripted"
        }

        fn model(&self) -> &str {
            "test-model"
        }

        async fn stream_chat(
            &self,
            transcript: &[ChatMessage],
            _: &ExecutionSettings,
        ) -> Result<ChatStream> {
            self.requests.lock().unwrap().push(transcript.to_vec());
            let script = self.scripts.lock().unwrap().pop_front();
            let ok = |frags: Vec<&'static str>| {
                stream::iter(frags.into_iter().map(|f| Ok::<_, Error>(f.to_string())))
            };
            match script {
                Some(Script::Reply(frags)) => Ok(Box::pin(ok(frags))),
                Some(Script::Fail(err)) => Err(err),
                Some(Script::FailMidStream(frags, err)) => {
                    Ok(Box::pin(ok(frags).chain(stream::iter(vec![Err(err)]))))
                }
                Some(Script::Hang(frags)) => Ok(Box::pin(ok(frags).chain(stream::pending()))),
                None => Err(Error::streaming("no script left", None)),
            }
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        text: String,
        errors: Vec<String>,
        finished: usize,
        interrupted: usize,
        interrupt_on_text: Option<Interrupt>,
    }

    impl Renderer for RecordingRenderer {
        fn print_text(&mut self, text: &str) {
            self.text.push_str(text);
            if let Some(interrupt) = &self.interrupt_on_text {
                interrupt.trigger();
            }
        }

        fn print_error(&mut self, error: &str) {
            self.errors.push(error.to_string());
        }

        fn print_info(&mut self, _: &str) {}

        fn finish_response(&mut self) {
            self.finished += 1;
        }

        fn print_interrupted(&mut self) {
            self.interrupted += 1;
        }
    }

    struct Lines(VecDeque<&'static str>);

    impl LineSource for Lines {
        fn read_line(&mut self, prompt: &str) -> Option<String> {
            assert_eq!(prompt, PROMPT);
            self.0.pop_front().map(String::from)
        }
    }

    fn session(scripts: Vec<Script>) -> ChatSession {
        ChatSession::new(Box::new(ScriptedProvider::new(scripts)), "Be brief.")
    }

    fn roles(session: &ChatSession) -> Vec<ChatRole> {
        session.transcript().iter().map(|m| m.role()).collect()
    }

    #[test]
    fn new_session_holds_system_prompt() {
        let session = session(vec![]);
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.transcript(), &[ChatMessage::system("Be brief.")]);
        assert_eq!(session.provider().model(), "test-model");
    }

    #[tokio::test]
    async fn completed_turn_appends_reply() {
        let mut session = session(vec![Script::Reply(vec!["Hi", " there", "!"])]);
        let mut renderer = RecordingRenderer::default();
        let outcome = session
            .send_streaming("Hello", &mut renderer, &Interrupt::new())
            .await
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Completed);
        assert_eq!(renderer.text, "Hi there!");
        assert_eq!(renderer.finished, 1);
        assert_eq!(
            session.transcript(),
            &[
                ChatMessage::system("Be brief."),
                ChatMessage::user("Hello"),
                ChatMessage::assistant("Hi there!"),
            ]
        );
    }

    #[tokio::test]
    async fn every_request_carries_full_transcript() {
        let provider = ScriptedProvider::new(vec![
            Script::Reply(vec!["one"]),
            Script::Reply(vec!["two"]),
        ]);
        let requests = Arc::clone(&provider.requests);
        let mut session = ChatSession::new(Box::new(provider), "sys");
        let mut renderer = RecordingRenderer::default();
        let interrupt = Interrupt::new();
        session.send_streaming("a", &mut renderer, &interrupt).await.unwrap();
        session.send_streaming("b", &mut renderer, &interrupt).await.unwrap();
        assert_eq!(
            roles(&session),
            vec![
                ChatRole::System,
                ChatRole::User,
                ChatRole::Assistant,
                ChatRole::User,
                ChatRole::Assistant,
            ]
        );
        assert_eq!(session.transcript()[4].content(), "two");

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].len(), 2);
        assert_eq!(requests[1].len(), 4);
        assert_eq!(requests[1][2], ChatMessage::assistant("one"));
    }

    #[tokio::test]
    async fn provider_failure_rolls_back_user_message() {
        let mut session = session(vec![Script::Fail(Error::authentication("bad key"))]);
        let mut renderer = RecordingRenderer::default();
        let err = session
            .send_streaming("Hello", &mut renderer, &Interrupt::new())
            .await
            .unwrap_err();
        assert!(err.is_authentication());
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.state(), SessionState::Running);
    }

    #[tokio::test]
    async fn stream_failure_discards_partial_reply() {
        let mut session = session(vec![Script::FailMidStream(
            vec!["Hi"],
            Error::streaming("connection reset", None),
        )]);
        let mut renderer = RecordingRenderer::default();
        let result = session
            .send_streaming("Hello", &mut renderer, &Interrupt::new())
            .await;
        assert!(result.is_err());
        assert_eq!(renderer.text, "Hi");
        assert_eq!(renderer.finished, 0);
        assert_eq!(session.transcript().len(), 1);
    }

    #[tokio::test]
    async fn interrupt_mid_stream_terminates_without_reply() {
        let mut session = session(vec![Script::Hang(vec!["Hi"])]);
        let interrupt = Interrupt::new();
        let mut renderer = RecordingRenderer {
            interrupt_on_text: Some(interrupt.clone()),
            ..Default::default()
        };
        let outcome = session
            .send_streaming("Hello", &mut renderer, &interrupt)
            .await
            .unwrap();
        assert_eq!(outcome, TurnOutcome::Interrupted);
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(renderer.text, "Hi");
        assert_eq!(renderer.interrupted, 1);
        assert!(
            session
                .transcript()
                .iter()
                .all(|m| m.role() != ChatRole::Assistant)
        );
    }

    #[tokio::test]
    async fn exit_terminates_without_appending() {
        for line in [None, Some(""), Some("exit"), Some("EXIT")] {
            let mut session = session(vec![]);
            let mut renderer = RecordingRenderer::default();
            let state = session
                .handle_input(line, &mut renderer, &Interrupt::new())
                .await
                .unwrap();
            assert_eq!(state, SessionState::Terminated);
            assert_eq!(session.transcript().len(), 1);
        }
    }

    #[tokio::test]
    async fn run_reports_errors_and_continues() {
        let mut session = session(vec![
            Script::Fail(Error::rate_limit("slow down", Some(1))),
            Script::Reply(vec!["Hi there!"]),
        ]);
        let mut input = Lines(VecDeque::from(["Hello", "Hello again", "exit", "unread"]));
        let mut renderer = RecordingRenderer::default();
        session
            .run(&mut input, &mut renderer, &Interrupt::new())
            .await;

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(renderer.errors.len(), 1);
        assert!(renderer.errors[0].contains("slow down"));
        assert_eq!(input.0, VecDeque::from(["unread"]));
        assert_eq!(
            session.transcript(),
            &[
                ChatMessage::system("Be brief."),
                ChatMessage::user("Hello again"),
                ChatMessage::assistant("Hi there!"),
            ]
        );
    }

    #[tokio::test]
    async fn run_stops_at_end_of_input() {
        let mut session = session(vec![Script::Reply(vec!["ok"])]);
        let mut input = Lines(VecDeque::from(["Hello"]));
        let mut renderer = RecordingRenderer::default();
        session
            .run(&mut input, &mut renderer, &Interrupt::new())
            .await;
        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.transcript().len(), 3);
    }

    struct InterruptingLines {
        line: &'static str,
        interrupt: Interrupt,
    }

    impl LineSource for InterruptingLines {
        fn read_line(&mut self, _: &str) -> Option<String> {
            self.interrupt.trigger();
            Some(self.line.to_string())
        }
    }

    #[tokio::test]
    async fn interrupt_during_read_discards_the_line() {
        let provider = ScriptedProvider::new(vec![Script::Reply(vec!["unused"])]);
        let requests = Arc::clone(&provider.requests);
        let mut session = ChatSession::new(Box::new(provider), "Be brief.");
        let interrupt = Interrupt::new();
        let mut input = InterruptingLines {
            line: "Hello",
            interrupt: interrupt.clone(),
        };
        let mut renderer = RecordingRenderer::default();
        session.run(&mut input, &mut renderer, &interrupt).await;

        assert_eq!(session.state(), SessionState::Terminated);
        assert_eq!(session.transcript().len(), 1);
        assert!(requests.lock().unwrap().is_empty());
    }
}
