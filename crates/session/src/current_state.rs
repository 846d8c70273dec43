use dbgp::Message;

use crate::breakpoint::Registry;

/// The last message that moved the session to a new state.
///
/// Front-ends that attach late replay [`snapshot`](Self::snapshot) to catch
/// up without waiting for the next engine event.
#[derive(Debug, Default)]
pub(crate) struct CurrentState {
    last: Option<Message>,
}

impl CurrentState {
    pub(crate) fn save(&mut self, message: &Message) {
        if message.state.is_session_state() {
            self.last = Some(message.clone());
        }
    }

    /// Last state change, then the breakpoint listing when there is one.
    pub(crate) fn snapshot(&self, registry: &Registry) -> Vec<Message> {
        let mut messages: Vec<Message> = self.last.iter().cloned().collect();
        if !registry.is_empty() {
            messages.push(registry.compose_listing());
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dbgp::State;

    #[test]
    fn empty_session() {
        let state = CurrentState::default();

        assert!(state.snapshot(&Registry::new("/srv")).is_empty());
    }

    #[test]
    fn acknowledgements_do_not_replace_state() {
        let mut state = CurrentState::default();
        state.save(&Message::synthetic(State::Break, "run"));
        state.save(&Message::synthetic(State::None, "stack_get"));
        state.save(&Message::synthetic(State::Waiting, "breakpoint_list"));

        let snapshot = state.snapshot(&Registry::new("/srv"));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].state, State::Break);
    }

    #[test]
    fn breakpoints_follow_state() {
        let mut state = CurrentState::default();
        let mut registry = Registry::new("/srv");
        registry.enqueue_line("index.php", "3").unwrap();
        state.save(&Message::synthetic(State::Awake, "on"));

        let snapshot = state.snapshot(&registry);

        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].state, State::Awake);
        assert_eq!(snapshot[1].command(), "breakpoint_list");
    }
}
