//! The orchestrator: the one task that owns the breakpoint registry and
//! decides what every front-end command and engine message leads to.

use config::Config;
use dbgp::command::{self, break_command};
use dbgp::{BreakpointId, CommandError, Message, State, Translator, WireCommand};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::breakpoint::Registry;
use crate::connection::Connection;
use crate::current_state::CurrentState;
use crate::directive::Directive;
use crate::handle::{Request, SubmitError};
use crate::paths::{to_absolute_uri, to_codebase_path};

pub(crate) struct Orchestrator {
    registry: Registry,
    translator: Translator,
    connection: Connection,
    current: CurrentState,
    outputs: Vec<mpsc::Sender<Message>>,
    wire: mpsc::Sender<WireCommand>,
    config: Config,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub(crate) fn new(
        config: Config,
        connection: Connection,
        outputs: Vec<mpsc::Sender<Message>>,
        wire: mpsc::Sender<WireCommand>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            registry: Registry::new(config.code_dir()),
            translator: Translator::new(),
            connection,
            current: CurrentState::default(),
            outputs,
            wire,
            config,
            cancel,
        }
    }

    /// Serve front-end requests and engine messages until cancelled.
    ///
    /// Both sources are handled on this one task, so commands and messages
    /// are processed strictly in arrival order.
    #[tracing::instrument(skip_all)]
    pub(crate) async fn run(
        mut self,
        mut requests: mpsc::Receiver<Request>,
        mut messages: mpsc::Receiver<Message>,
    ) {
        let cancel = self.cancel.clone();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                request = requests.recv() => match request {
                    Some(request) => self.handle_request(request).await,
                    None => break,
                },
                message = messages.recv() => match message {
                    Some(message) => self.handle_message(message).await,
                    None => break,
                },
            }
        }
        tracing::debug!("orchestrator finished");
    }

    async fn handle_request(&mut self, request: Request) {
        match request {
            Request::Command { text, reply } => {
                let result = self.handle_command(&text).await;
                if let Err(e) = &result {
                    tracing::debug!(command = text, error = %e, "rejected command");
                }
                let _ = reply.send(result);
            }
            Request::CurrentState { reply } => {
                let _ = reply.send(self.current.snapshot(&self.registry));
            }
        }
    }

    async fn handle_command(&mut self, text: &str) -> Result<(), SubmitError> {
        let (name, args) = break_command(text)?;

        if let Some(directive) = Directive::parse(&name, &args)? {
            self.run_directive(directive).await;
            return Ok(());
        }
        if self.divert_to_registry(&name, &args).await? {
            return Ok(());
        }

        let args = self.absolute_file_args(&name, args);
        let command = self.translator.prepare(&name, &args)?;
        self.dispatch(command).await;
        Ok(())
    }

    async fn run_directive(&mut self, directive: Directive) {
        match directive {
            Directive::On => match self.connection.activate().await {
                Ok(_) => self.broadcast(Message::synthetic(State::Awake, "on")).await,
                Err(e) => tracing::error!(error = ?e, "cannot listen for engines"),
            },
            Directive::Off => {
                self.connection.deactivate().await;
                self.broadcast(Message::synthetic(State::Asleep, "off")).await;
            }
            Directive::Continue => {
                self.connection.disconnect().await;
                self.broadcast(Message::synthetic(State::Stopped, "continue")).await;
            }
            Directive::UpdateSource(file) => {
                let uri = to_absolute_uri(&file, self.config.code_dir());
                let local = to_codebase_path(&uri, self.config.code_dir(), self.config.codebase());
                if !local.is_file() {
                    tracing::warn!(path = %local.display(), "source file not found");
                }
                let mut message = Message::synthetic(State::None, "update_source");
                message.properties.filename = uri;
                self.broadcast(message).await;
            }
        }
    }

    /// Breakpoint changes the engine cannot take right now go to the
    /// registry instead. Returns whether the command was consumed.
    async fn divert_to_registry(
        &mut self,
        name: &str,
        args: &[String],
    ) -> Result<bool, CommandError> {
        match name {
            "breakpoint_set" => {
                if self.connection.is_on_air().await {
                    return Ok(false);
                }
                command::validate(name, args)?;
                if let [file, line] = args {
                    let id = self.registry.enqueue_line(file, line)?;
                    tracing::info!(id, %file, %line, "breakpoint queued until an engine attaches");
                }
            }
            "breakpoint_remove" => {
                let [id] = args else {
                    return Err(CommandError::Usage("breakpoint_remove ID"));
                };
                let id = id
                    .parse::<BreakpointId>()
                    .map_err(|_| CommandError::InvalidNumber {
                        what: "a breakpoint id",
                        value: id.clone(),
                    })?;
                // the engine never sees negative ids
                if id >= 0 && self.connection.is_on_air().await {
                    return Ok(false);
                }
                if !self.registry.remove(id) {
                    tracing::debug!(id, "no such breakpoint");
                }
            }
            _ => return Ok(false),
        }

        let listing = self.registry.compose_listing();
        self.broadcast(listing).await;
        Ok(true)
    }

    /// Make the file argument of file-taking commands absolute, as engines
    /// only understand absolute URIs.
    fn absolute_file_args(&self, name: &str, mut args: Vec<String>) -> Vec<String> {
        let takes_file = match name {
            "breakpoint_set" => args.len() == 2,
            "source" => args.len() == 1,
            _ => false,
        };
        if takes_file {
            if let Some(file) = args.first_mut() {
                *file = to_absolute_uri(file, self.config.code_dir());
            }
        }
        args
    }

    async fn handle_message(&mut self, message: Message) {
        match message.state {
            State::Stopping => self.send_bare("stop").await,
            State::Starting => {
                for command in self.registry.drain_pending(&self.translator) {
                    self.dispatch(command).await;
                }
                self.send_bare("run").await;
            }
            State::None => match message.command() {
                // learn the ids the engine assigned
                "breakpoint_set" | "breakpoint_remove" => self.send_bare("breakpoint_list").await,
                "breakpoint_list" => self.registry.renew_established(&message.breakpoints),
                _ => {}
            },
            _ => {}
        }

        self.broadcast(message).await;
    }

    async fn send_bare(&self, name: &'static str) {
        match self.translator.prepare(name, &[]) {
            Ok(command) => self.dispatch(command).await,
            Err(e) => tracing::error!(error = %e, name, "cannot prepare command"),
        }
    }

    async fn dispatch(&self, command: WireCommand) {
        if self.wire.send(command).await.is_err() {
            tracing::debug!("send loop has stopped");
        }
    }

    /// Deliver `message` to every front-end, in order. A front-end that
    /// has gone away is skipped.
    async fn broadcast(&mut self, message: Message) {
        self.current.save(&message);
        self.outputs.retain(|output| !output.is_closed());

        for output in &self.outputs {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                sent = output.send(message.clone()) => {
                    if sent.is_err() {
                        tracing::debug!("front-end went away");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::oneshot;

    struct Harness {
        orchestrator: Orchestrator,
        output: mpsc::Receiver<Message>,
        wire: mpsc::Receiver<WireCommand>,
        codebase: tempfile::TempDir,
    }

    impl Harness {
        fn new() -> Self {
            let codebase = tempfile::tempdir().unwrap();
            let (output_tx, output) = mpsc::channel(16);
            let (wire_tx, wire) = mpsc::channel(16);
            let orchestrator = Orchestrator::new(
                Config::new(codebase.path()),
                Connection::new(0),
                vec![output_tx],
                wire_tx,
                CancellationToken::new(),
            );
            Self {
                orchestrator,
                output,
                wire,
                codebase,
            }
        }

        async fn submit(&mut self, text: &str) -> Result<(), SubmitError> {
            let (reply, response) = oneshot::channel();
            self.orchestrator
                .handle_request(Request::Command {
                    text: text.to_string(),
                    reply,
                })
                .await;
            response.await.unwrap()
        }

        fn sent(&mut self) -> Vec<String> {
            let mut sent = Vec::new();
            while let Ok(command) = self.wire.try_recv() {
                sent.push(command.as_str().to_string());
            }
            sent
        }

        fn code_dir(&self) -> String {
            self.orchestrator.config.code_dir().display().to_string()
        }
    }

    #[tokio::test]
    async fn breakpoint_is_queued_while_off_air() {
        let mut harness = Harness::new();

        harness.submit("b index.php 18").await.unwrap();

        assert!(harness.sent().is_empty());
        let listing = harness.output.try_recv().unwrap();
        assert_eq!(listing.command(), "breakpoint_list");
        let breakpoint = &listing.breakpoints[&-1];
        assert_eq!(breakpoint.line_number, 18);
        assert_eq!(
            breakpoint.filename,
            format!("file://{}/index.php", harness.code_dir())
        );
    }

    #[tokio::test]
    async fn pending_breakpoint_is_removed_locally() {
        let mut harness = Harness::new();
        harness.submit("b index.php 18").await.unwrap();
        harness.output.try_recv().unwrap();

        harness.submit("br -1").await.unwrap();

        let listing = harness.output.try_recv().unwrap();
        assert!(listing.breakpoints.is_empty());
        assert!(harness.sent().is_empty());
    }

    #[tokio::test]
    async fn malformed_input_is_reported() {
        let mut harness = Harness::new();

        assert!(matches!(
            harness.submit("b index.php").await,
            Err(SubmitError::Command(CommandError::Usage(_)))
        ));
        assert!(matches!(
            harness.submit("on now").await,
            Err(SubmitError::Directive(_))
        ));
        assert!(matches!(
            harness.submit("").await,
            Err(SubmitError::Command(CommandError::Empty))
        ));
        assert!(harness.output.try_recv().is_err());
    }

    #[tokio::test]
    async fn engine_commands_go_to_the_wire() {
        let mut harness = Harness::new();

        harness.submit("sr index.php").await.unwrap();
        harness.submit("stk").await.unwrap();

        assert_eq!(
            harness.sent(),
            [
                format!("source -i 1 -f file://{}/index.php", harness.code_dir()),
                "stack_get -i 2".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn starting_drains_then_runs() {
        let mut harness = Harness::new();
        harness.submit("b index.php 18").await.unwrap();
        harness.submit("b lib/util.php 4").await.unwrap();

        let mut init = Message::synthetic(State::Starting, "");
        init.message_type = dbgp::MessageType::Init;
        harness.orchestrator.handle_message(init).await;

        let code_dir = harness.code_dir();
        assert_eq!(
            harness.sent(),
            [
                format!("breakpoint_set -i 1 -t line -f file://{code_dir}/index.php -n 18"),
                format!("breakpoint_set -i 2 -t line -f file://{code_dir}/lib/util.php -n 4"),
                "run -i 3".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn stopping_sends_stop() {
        let mut harness = Harness::new();

        harness
            .orchestrator
            .handle_message(Message::synthetic(State::Stopping, "run"))
            .await;

        assert_eq!(harness.sent(), ["stop -i 1"]);
        assert_eq!(harness.output.try_recv().unwrap().state, State::Stopping);
    }

    #[tokio::test]
    async fn breakpoint_acknowledgement_asks_for_listing() {
        let mut harness = Harness::new();

        harness
            .orchestrator
            .handle_message(Message::synthetic(State::None, "breakpoint_set"))
            .await;

        assert_eq!(harness.sent(), ["breakpoint_list -i 1"]);
    }

    #[tokio::test]
    async fn listing_renews_established() {
        let mut harness = Harness::new();
        let mut listing = Message::synthetic(State::None, "breakpoint_list");
        listing.breakpoints.insert(
            77,
            dbgp::Breakpoint::line(77, "file:///srv/index.php", 3),
        );

        harness.orchestrator.handle_message(listing).await;

        assert!(harness.orchestrator.registry.established().contains_key(&77));
        assert!(harness.output.try_recv().is_ok());
    }

    #[tokio::test]
    async fn directives_broadcast_state() {
        let mut harness = Harness::new();

        harness.submit("on").await.unwrap();
        harness.submit("continue").await.unwrap();
        harness.submit("off").await.unwrap();

        let states: Vec<_> = std::iter::from_fn(|| harness.output.try_recv().ok())
            .map(|message| message.state)
            .collect();
        assert_eq!(states, [State::Awake, State::Stopped, State::Asleep]);
        assert!(!harness.orchestrator.connection.is_active());
    }

    #[tokio::test]
    async fn update_source_names_the_file() {
        let mut harness = Harness::new();
        std::fs::write(harness.codebase.path().join("index.php"), "<?php\n").unwrap();

        harness.submit("update_source index.php").await.unwrap();
        harness.submit("update_source missing.php").await.unwrap();

        let first = harness.output.try_recv().unwrap();
        assert_eq!(first.command(), "update_source");
        assert!(first.properties.filename.ends_with("/index.php"));
        let second = harness.output.try_recv().unwrap();
        assert!(second.properties.filename.ends_with("/missing.php"));
    }

    #[tokio::test]
    async fn update_source_names_remote_uri() {
        let mut harness = Harness::new();
        harness.orchestrator.config.codebase_remote = Some("/var/www/html".into());
        std::fs::write(harness.codebase.path().join("index.php"), "<?php\n").unwrap();

        harness.submit("update_source index.php").await.unwrap();

        let message = harness.output.try_recv().unwrap();
        assert_eq!(message.properties.filename, "file:///var/www/html/index.php");
        let local = to_codebase_path(
            &message.properties.filename,
            harness.orchestrator.config.code_dir(),
            harness.orchestrator.config.codebase(),
        );
        assert!(local.is_file());
    }

    #[tokio::test]
    async fn current_state_replays_last_state_and_breakpoints() {
        let mut harness = Harness::new();
        harness.submit("on").await.unwrap();
        harness.submit("b index.php 2").await.unwrap();
        harness.orchestrator.connection.deactivate().await;

        let (reply, response) = oneshot::channel();
        harness
            .orchestrator
            .handle_request(Request::CurrentState { reply })
            .await;
        let snapshot = response.await.unwrap();

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].state, State::Awake);
        assert_eq!(snapshot[1].breakpoints.len(), 1);
    }

    #[tokio::test]
    async fn closed_outputs_are_skipped() {
        let mut harness = Harness::new();
        let (closed_tx, closed_rx) = mpsc::channel(1);
        drop(closed_rx);
        harness.orchestrator.outputs.push(closed_tx);

        harness
            .orchestrator
            .broadcast(Message::synthetic(State::Break, "run"))
            .await;

        assert_eq!(harness.orchestrator.outputs.len(), 1);
        assert_eq!(harness.output.try_recv().unwrap().state, State::Break);
    }
}
