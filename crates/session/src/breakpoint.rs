//! Breakpoints requested while no engine is attached, and the ones the
//! engine has confirmed.

use std::collections::{BTreeMap, VecDeque};
use std::path::{Path, PathBuf};

use dbgp::{
    Breakpoint, BreakpointId, BreakpointType, CommandError, Message, State, Translator,
    WireCommand,
};

use crate::paths::to_absolute_uri;

/// Pending breakpoints carry negative ids issued here; established ones
/// carry the positive id the engine assigned. The two never overlap.
///
/// Pending breakpoints handed to an engine stay in flight, still under
/// their negative ids, until the engine's next full listing arrives. If
/// that engine goes away first they are sent again to the next one.
#[derive(Debug)]
pub struct Registry {
    pending: VecDeque<Breakpoint>,
    in_flight: Vec<Breakpoint>,
    established: BTreeMap<BreakpointId, Breakpoint>,
    last_pending_id: BreakpointId,
    code_dir: PathBuf,
}

impl Registry {
    /// `code_dir` anchors relative filenames of pending breakpoints.
    pub fn new(code_dir: impl Into<PathBuf>) -> Self {
        Self {
            pending: VecDeque::new(),
            in_flight: Vec::new(),
            established: BTreeMap::new(),
            last_pending_id: 0,
            code_dir: code_dir.into(),
        }
    }

    /// Queue a line breakpoint for the next engine that attaches.
    pub fn enqueue_line(
        &mut self,
        filename: &str,
        line: &str,
    ) -> Result<BreakpointId, CommandError> {
        let line = line.trim_matches('\0');
        let line_number = line.parse::<u32>().map_err(|_| CommandError::InvalidNumber {
            what: "a line number",
            value: line.to_string(),
        })?;
        if filename.is_empty() {
            return Err(CommandError::Usage("breakpoint_set FILE LINE"));
        }

        let id = self.next_pending_id();
        self.pending.push_back(Breakpoint::line(id, filename, line_number));
        tracing::debug!(id, filename, line_number, "queued breakpoint");
        Ok(id)
    }

    /// Replace the established set with a full listing from the engine.
    ///
    /// The listing is the engine's answer to everything sent so far, so
    /// nothing is in flight afterwards.
    pub fn renew_established(&mut self, listing: &BTreeMap<BreakpointId, Breakpoint>) {
        self.established = listing.clone();
        self.in_flight.clear();
        tracing::debug!(count = self.established.len(), "renewed established breakpoints");
    }

    /// Forget a breakpoint. Returns whether anything was removed.
    pub fn remove(&mut self, id: BreakpointId) -> bool {
        if id < 0 {
            if let Some(index) = self.pending.iter().position(|breakpoint| breakpoint.id == id) {
                return self.pending.remove(index).is_some();
            }
            match self.in_flight.iter().position(|breakpoint| breakpoint.id == id) {
                Some(index) => {
                    self.in_flight.remove(index);
                    true
                }
                None => false,
            }
        } else {
            self.established.remove(&id).is_some()
        }
    }

    /// Turn every known breakpoint into a `breakpoint_set` command for a
    /// freshly attached engine, emptying the pending queue.
    ///
    /// Breakpoints still in flight from an earlier engine go first, then the
    /// pending queue, then the established set, since a new engine session
    /// starts without any. Sent pending entries move to the in-flight set.
    /// Entries that fail translation are dropped.
    pub fn drain_pending(&mut self, translator: &Translator) -> Vec<WireCommand> {
        let unconfirmed: Vec<_> = self.in_flight.drain(..).chain(self.pending.drain(..)).collect();

        let mut commands = Vec::with_capacity(unconfirmed.len() + self.established.len());
        for breakpoint in unconfirmed {
            if let Some(command) = set_command(&breakpoint, &self.code_dir, translator) {
                commands.push(command);
                self.in_flight.push(breakpoint);
            }
        }
        for breakpoint in self.established.values() {
            commands.extend(set_command(breakpoint, &self.code_dir, translator));
        }
        commands
    }

    /// A `breakpoint_list` shaped message holding every known breakpoint.
    pub fn compose_listing(&self) -> Message {
        let mut listing = Message::synthetic(State::Waiting, "breakpoint_list");
        listing.breakpoints = self.established.clone();
        for breakpoint in self.in_flight.iter().chain(&self.pending) {
            listing.breakpoints.insert(
                breakpoint.id,
                Breakpoint {
                    filename: to_absolute_uri(&breakpoint.filename, &self.code_dir),
                    ..breakpoint.clone()
                },
            );
        }
        listing
    }

    pub fn pending(&self) -> impl Iterator<Item = &Breakpoint> {
        self.pending.iter()
    }

    /// Breakpoints sent to an engine that has not listed them back yet.
    pub fn in_flight(&self) -> impl Iterator<Item = &Breakpoint> {
        self.in_flight.iter()
    }

    pub fn established(&self) -> &BTreeMap<BreakpointId, Breakpoint> {
        &self.established
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty() && self.in_flight.is_empty() && self.established.is_empty()
    }

    fn next_pending_id(&mut self) -> BreakpointId {
        self.last_pending_id -= 1;
        self.last_pending_id
    }
}

fn set_command(
    breakpoint: &Breakpoint,
    code_dir: &Path,
    translator: &Translator,
) -> Option<WireCommand> {
    if breakpoint.kind != BreakpointType::Line {
        return None;
    }
    let args = [
        to_absolute_uri(&breakpoint.filename, code_dir),
        breakpoint.line_number.to_string(),
    ];
    translator
        .prepare("breakpoint_set", &args)
        .inspect_err(|e| tracing::warn!(error = %e, id = breakpoint.id, "skipping breakpoint"))
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(entries: &[(BreakpointId, &str, u32)]) -> BTreeMap<BreakpointId, Breakpoint> {
        entries
            .iter()
            .map(|&(id, file, line)| (id, Breakpoint::line(id, file, line)))
            .collect()
    }

    #[test]
    fn pending_ids_decrease() {
        let mut registry = Registry::new("/srv/www");

        let ids: Vec<_> = (1..=4)
            .map(|line| registry.enqueue_line("index.php", &line.to_string()).unwrap())
            .collect();

        assert_eq!(ids, [-1, -2, -3, -4]);
        let lines: Vec<_> = registry.pending().map(|b| b.line_number).collect();
        assert_eq!(lines, [1, 2, 3, 4]);
    }

    #[test]
    fn ids_are_not_reused_after_removal() {
        let mut registry = Registry::new("/srv/www");
        registry.enqueue_line("a.php", "1").unwrap();
        registry.remove(-1);

        assert_eq!(registry.enqueue_line("a.php", "2").unwrap(), -2);
    }

    #[test]
    fn bad_line_is_rejected() {
        let mut registry = Registry::new("/srv/www");

        assert!(matches!(
            registry.enqueue_line("index.php", "twelve"),
            Err(CommandError::InvalidNumber { .. })
        ));
        assert!(registry.enqueue_line("index.php", "-3").is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn line_with_trailing_nul() {
        let mut registry = Registry::new("/srv/www");

        registry.enqueue_line("index.php", "18\0").unwrap();

        assert_eq!(registry.pending().next().unwrap().line_number, 18);
    }

    #[test]
    fn renew_is_a_full_replace() {
        let mut registry = Registry::new("/srv/www");

        registry.renew_established(&listing(&[
            (1, "file:///a.php", 3),
            (2, "file:///b.php", 4),
        ]));
        registry.renew_established(&listing(&[(7, "file:///c.php", 9)]));

        assert_eq!(registry.established(), &listing(&[(7, "file:///c.php", 9)]));
    }

    #[test]
    fn remove_pending_keeps_order() {
        let mut registry = Registry::new("/srv/www");
        for line in ["1", "2", "3"] {
            registry.enqueue_line("a.php", line).unwrap();
        }

        assert!(registry.remove(-2));

        let ids: Vec<_> = registry.pending().map(|b| b.id).collect();
        assert_eq!(ids, [-1, -3]);
    }

    #[test]
    fn remove_established_and_absent() {
        let mut registry = Registry::new("/srv/www");
        registry.renew_established(&listing(&[(5, "file:///a.php", 3)]));

        assert!(!registry.remove(-9));
        assert!(!registry.remove(6));
        assert!(registry.remove(5));
        assert!(registry.is_empty());
    }

    #[test]
    fn drain_sends_pending_and_established() {
        let mut registry = Registry::new("/srv/www");
        registry.renew_established(&listing(&[(40, "file:///srv/www/lib.php", 7)]));
        registry.enqueue_line("index.php", "18").unwrap();
        let translator = Translator::new();

        let commands: Vec<_> = registry
            .drain_pending(&translator)
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();

        assert_eq!(
            commands,
            [
                "breakpoint_set -i 1 -t line -f file:///srv/www/index.php -n 18",
                "breakpoint_set -i 2 -t line -f file:///srv/www/lib.php -n 7",
            ]
        );
        assert_eq!(registry.pending().count(), 0);
        let in_flight: Vec<_> = registry.in_flight().map(|b| b.id).collect();
        assert_eq!(in_flight, [-1]);
    }

    #[test]
    fn unconfirmed_breakpoints_are_sent_again() {
        let mut registry = Registry::new("/srv/www");
        registry.enqueue_line("index.php", "18").unwrap();
        let translator = Translator::new();
        registry.drain_pending(&translator);

        // the engine went away before listing its breakpoints
        registry.enqueue_line("lib.php", "4").unwrap();
        let listing = registry.compose_listing();
        assert!(listing.breakpoints.contains_key(&-1));
        assert!(listing.breakpoints.contains_key(&-2));

        let commands: Vec<_> = registry
            .drain_pending(&translator)
            .iter()
            .map(|c| c.as_str().to_string())
            .collect();
        assert_eq!(
            commands,
            [
                "breakpoint_set -i 2 -t line -f file:///srv/www/index.php -n 18",
                "breakpoint_set -i 3 -t line -f file:///srv/www/lib.php -n 4",
            ]
        );
    }

    #[test]
    fn listing_from_engine_settles_in_flight() {
        let mut registry = Registry::new("/srv/www");
        registry.enqueue_line("index.php", "18").unwrap();
        let translator = Translator::new();
        registry.drain_pending(&translator);

        registry.renew_established(&listing(&[(9, "file:///srv/www/index.php", 18)]));

        assert_eq!(registry.in_flight().count(), 0);
        let commands = registry.drain_pending(&translator);
        assert_eq!(commands.len(), 1);
        assert_eq!(
            commands[0].as_str(),
            "breakpoint_set -i 2 -t line -f file:///srv/www/index.php -n 18"
        );
    }

    #[test]
    fn in_flight_breakpoint_can_be_removed() {
        let mut registry = Registry::new("/srv/www");
        registry.enqueue_line("index.php", "18").unwrap();
        registry.drain_pending(&Translator::new());

        assert!(registry.remove(-1));
        assert!(registry.is_empty());
    }

    #[test]
    fn drain_skips_untranslatable_entries() {
        let mut registry = Registry::new("/srv/www");
        registry.enqueue_line("index.php", "0").unwrap();
        registry.enqueue_line("index.php", "5").unwrap();

        let commands = registry.drain_pending(&Translator::new());

        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].transaction_id(), 1);
    }

    #[test]
    fn listing_merges_both_sets() {
        let mut registry = Registry::new("/srv/www");
        registry.renew_established(&listing(&[(3, "file:///srv/www/lib.php", 7)]));
        registry.enqueue_line("index.php", "18").unwrap();

        let message = registry.compose_listing();

        assert_eq!(message.state, State::Waiting);
        assert_eq!(message.command(), "breakpoint_list");
        assert_eq!(message.breakpoints.len(), 2);
        assert_eq!(message.breakpoints[&-1].filename, "file:///srv/www/index.php");
        assert_eq!(message.breakpoints[&-1].line_number, 18);
        assert_eq!(message.breakpoints[&3].filename, "file:///srv/www/lib.php");
    }
}
