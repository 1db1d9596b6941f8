//! `checkin` - QR code check-in desk for events
//!
//! Guests present a QR code encoding `name,phone`. Each scan is checked
//! against the guest list, then the operator records the party size and
//! the number of gifts before the guest is committed. A companion export
//! turns a guest list into a ZIP of printable QR codes.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod flow;
pub mod guest;
pub mod logging;
pub mod ops;
pub mod parser;
pub mod scanner;
pub mod session;
pub mod storage;
pub mod store;

pub use config::Config;
pub use error::{Error, Result};
pub use export::{ExportReport, QrExporter, QrStyle};
pub use flow::{CheckIn, CheckInFlow, FlowState, Notification, ScanOutcome};
pub use guest::{Candidate, Guest, GuestId};
pub use logging::init_logging;
pub use parser::{parse_bulk, parse_candidate, BulkParse, ParseError};
pub use scanner::{DecodeSource, FeedSource, Scanner};
pub use session::{Session, SessionEvent, SessionSummary};
pub use ops::ClearOutcome;
pub use storage::{KeyValueStore, Storage, StorageStats};
pub use store::GuestStore;
