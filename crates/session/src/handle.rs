use dbgp::{CommandError, Message};
use tokio::sync::{mpsc, oneshot};

use crate::directive::DirectiveError;

/// Why a submitted command was not carried out.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Directive(#[from] DirectiveError),

    #[error("session is shut down")]
    Closed,
}

#[derive(Debug)]
pub(crate) enum Request {
    Command {
        text: String,
        reply: oneshot::Sender<Result<(), SubmitError>>,
    },
    CurrentState {
        reply: oneshot::Sender<Vec<Message>>,
    },
}

/// How front-ends talk to a running session. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    requests: mpsc::Sender<Request>,
}

impl SessionHandle {
    pub(crate) fn new(requests: mpsc::Sender<Request>) -> Self {
        Self { requests }
    }

    /// Hand a command line such as `b index.php 12` to the session and wait
    /// until it has been dealt with.
    pub async fn submit(&self, text: impl Into<String>) -> Result<(), SubmitError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::Command {
                text: text.into(),
                reply,
            })
            .await
            .map_err(|_| SubmitError::Closed)?;
        response.await.map_err(|_| SubmitError::Closed)?
    }

    /// Messages describing the session as it stands.
    pub async fn current_state(&self) -> Result<Vec<Message>, SubmitError> {
        let (reply, response) = oneshot::channel();
        self.requests
            .send(Request::CurrentState { reply })
            .await
            .map_err(|_| SubmitError::Closed)?;
        response.await.map_err(|_| SubmitError::Closed)
    }
}
