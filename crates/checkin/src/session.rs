//! The interactive check-in desk.
//!
//! A [`Session`] is the single consumer of a channel of [`SessionEvent`]s.
//! Decode sources and the operator console are producers; all guest and
//! flow state lives here, so check-ins are strictly sequential.
//!
//! The scanner is open exactly while the flow is idle. It is released as
//! soon as a scan opens the prompts and reacquired when the check-in is
//! committed or cancelled.

use std::io::Write;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::flow::{CheckInFlow, FlowState, Notification, ScanOutcome};
use crate::scanner::Scanner;
use crate::store::GuestStore;

/// Input to the session loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A payload decoded by the scanner.
    Decoded(String),
    /// A line typed at the console.
    Input(String),
    /// End the session.
    Quit,
}

/// What happened during a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Guests committed.
    pub checked_in: usize,
    /// Repeat scans refused.
    pub duplicates: usize,
    /// Unreadable codes.
    pub rejected: usize,
    /// Check-ins abandoned at a prompt.
    pub cancelled: usize,
    /// Commits that could not be saved.
    pub persist_failures: usize,
}

/// A prompt command typed while a check-in is in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PromptCommand {
    Increment,
    Decrement,
    Set(u32),
    Confirm,
    Cancel,
}

impl PromptCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim() {
            "" => Some(Self::Confirm),
            "+" => Some(Self::Increment),
            "-" => Some(Self::Decrement),
            "c" | "cancel" => Some(Self::Cancel),
            other => other.parse().ok().map(Self::Set),
        }
    }
}

/// The check-in desk event loop.
#[derive(Debug)]
pub struct Session<W: Write> {
    store: GuestStore,
    flow: CheckInFlow,
    scanner: Option<Scanner>,
    out: W,
    summary: SessionSummary,
}

impl<W: Write> Session<W> {
    /// Create a session writing operator output to `out`.
    #[must_use]
    pub fn new(store: GuestStore, flow: CheckInFlow, out: W) -> Self {
        Self {
            store,
            flow,
            scanner: None,
            out,
            summary: SessionSummary::default(),
        }
    }

    /// Attach a scanner. Without one, codes are typed at the console.
    #[must_use]
    pub fn with_scanner(mut self, scanner: Scanner) -> Self {
        self.scanner = Some(scanner);
        self
    }

    /// The guest store.
    #[must_use]
    pub fn store(&self) -> &GuestStore {
        &self.store
    }

    /// The flow state.
    #[must_use]
    pub fn state(&self) -> &FlowState {
        self.flow.state()
    }

    /// Counts so far.
    #[must_use]
    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Check whether the scanner is currently open.
    #[must_use]
    pub fn scanner_open(&self) -> bool {
        self.scanner.as_ref().is_some_and(Scanner::is_open)
    }

    /// Consume the session, returning the store.
    #[must_use]
    pub fn into_store(mut self) -> GuestStore {
        self.close_scanner();
        self.store
    }

    /// Print the banner and open the scanner.
    ///
    /// # Errors
    ///
    /// Returns an error if operator output cannot be written.
    pub fn start(&mut self) -> Result<()> {
        writeln!(self.out, "== {} ==", self.store.event_name())?;
        self.print_totals()?;
        self.enter_idle()
    }

    /// Run until [`SessionEvent::Quit`] or until every sender is gone.
    ///
    /// # Errors
    ///
    /// Returns an error if operator output cannot be written.
    pub async fn run(&mut self, mut rx: mpsc::Receiver<SessionEvent>) -> Result<SessionSummary> {
        self.start()?;
        while let Some(event) = rx.recv().await {
            if !self.handle(event)? {
                break;
            }
        }
        self.finish()?;
        Ok(self.summary)
    }

    /// Handle one event. Returns `false` when the session should end.
    ///
    /// # Errors
    ///
    /// Returns an error if operator output cannot be written. Check-in
    /// problems are reported to the operator, not returned.
    pub fn handle(&mut self, event: SessionEvent) -> Result<bool> {
        match event {
            SessionEvent::Quit => return Ok(false),
            SessionEvent::Decoded(text) => {
                if self.flow.is_idle() {
                    self.scan(&text)?;
                } else {
                    debug!(state = self.flow.state().name(), "Ignoring decode while busy");
                }
            }
            SessionEvent::Input(line) => {
                if self.flow.is_idle() {
                    match line.trim() {
                        "" => {}
                        "q" | "quit" | "exit" => return Ok(false),
                        text => self.scan(text)?,
                    }
                } else {
                    self.prompt_input(&line)?;
                }
            }
        }
        Ok(true)
    }

    fn scan(&mut self, text: &str) -> Result<()> {
        let outcome = self.flow.scan(&self.store, text);
        match &outcome {
            ScanOutcome::Ignored => {}
            ScanOutcome::Rejected(_) => self.summary.rejected += 1,
            ScanOutcome::Duplicate(_) => self.summary.duplicates += 1,
            ScanOutcome::Accepted(_) => {
                self.close_scanner();
                return self.print_prompt();
            }
        }
        if let Some(notice) = outcome.notification() {
            writeln!(self.out, "{notice}")?;
        }
        Ok(())
    }

    fn prompt_input(&mut self, line: &str) -> Result<()> {
        let Some(command) = PromptCommand::parse(line) else {
            writeln!(
                self.out,
                "Enter +, -, a number, an empty line to confirm, or c to cancel"
            )?;
            return Ok(());
        };

        let awaiting_party = matches!(self.flow.state(), FlowState::AwaitingPartySize { .. });
        let value = match command {
            PromptCommand::Cancel => return self.cancel(),
            PromptCommand::Confirm if awaiting_party => {
                self.flow.confirm_party_size()?;
                return self.print_prompt();
            }
            PromptCommand::Confirm => return self.commit(),
            PromptCommand::Increment if awaiting_party => self.flow.increment_party_size()?,
            PromptCommand::Increment => self.flow.increment_gift_count()?,
            PromptCommand::Decrement if awaiting_party => self.flow.decrement_party_size()?,
            PromptCommand::Decrement => self.flow.decrement_gift_count()?,
            PromptCommand::Set(n) if awaiting_party => self.flow.set_party_size(n)?,
            PromptCommand::Set(n) => self.flow.set_gift_count(n)?,
        };

        let label = if awaiting_party { "Party size" } else { "Gifts" };
        writeln!(self.out, "{label}: {value}")?;
        Ok(())
    }

    fn cancel(&mut self) -> Result<()> {
        if let Some(candidate) = self.flow.cancel() {
            self.summary.cancelled += 1;
            let notice = Notification::Cancelled {
                name: candidate.name,
            };
            writeln!(self.out, "{notice}")?;
        }
        self.enter_idle()
    }

    fn commit(&mut self) -> Result<()> {
        let check_in = self.flow.confirm_gift_count(&mut self.store)?;
        self.summary.checked_in += 1;
        writeln!(self.out, "{}", check_in.notification())?;
        if let Some(e) = &check_in.persist_error {
            self.summary.persist_failures += 1;
            writeln!(self.out, "Warning: check-in not saved: {e}")?;
        }
        self.print_totals()?;
        self.enter_idle()
    }

    fn print_prompt(&mut self) -> Result<()> {
        match self.flow.state() {
            FlowState::AwaitingPartySize {
                candidate,
                party_size,
            } => writeln!(
                self.out,
                "Welcome, {}! How many people in the party (1-{})? [{party_size}]",
                candidate.name,
                self.flow.max_party_size(),
            )?,
            FlowState::AwaitingGiftCount { gift_count, .. } => {
                writeln!(self.out, "How many gifts? [{gift_count}]")?;
            }
            FlowState::Idle => {}
        }
        Ok(())
    }

    fn print_totals(&mut self) -> Result<()> {
        writeln!(
            self.out,
            "{} checked in, {} people present, {} gifts",
            self.store.count(),
            self.store.total_people(),
            self.store.total_gifts()
        )?;
        Ok(())
    }

    fn enter_idle(&mut self) -> Result<()> {
        let Some(scanner) = self.scanner.as_mut() else {
            writeln!(self.out, "Type a code (name,phone) to check in")?;
            return Ok(());
        };

        match scanner.open() {
            Ok(()) => writeln!(self.out, "Ready to scan ({})", scanner.source_name())?,
            Err(e) if e.is_retryable() => {
                warn!(error = %e, "Scanner unavailable");
                writeln!(
                    self.out,
                    "Scanner unavailable: {e}. Type codes manually; the scanner is retried after the next check-in."
                )?;
            }
            Err(e) => return Err(e),
        }
        Ok(())
    }

    fn close_scanner(&mut self) {
        if let Some(scanner) = self.scanner.as_mut() {
            scanner.close();
        }
    }

    fn finish(&mut self) -> Result<()> {
        if let Some(candidate) = self.flow.cancel() {
            info!(name = %candidate.name, "Session ended mid check-in; discarded");
        }
        self.close_scanner();
        let s = self.summary;
        info!(
            checked_in = s.checked_in,
            duplicates = s.duplicates,
            rejected = s.rejected,
            cancelled = s.cancelled,
            "Session ended"
        );
        writeln!(self.out, "Session ended: {} checked in this session", s.checked_in)?;
        self.print_totals()
    }
}
