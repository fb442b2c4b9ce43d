//! Membership records for the door controller.
//!
//! The snapshot lives outside this process: an external updater replaces it
//! and this crate only reads it. A [`Matcher`] resolves an entry code against
//! whatever the [`RecordStore`] holds at that moment.
//!
//! # Record format
//!
//! ```text
//! ff123456,Alice,M-0001     keypad PIN 123456
//! 1a2b3c4d5e,Bob,           card credential, matched on "1a2b3c"
//! ```
//!
//! # Examples
//!
//! ```no_run
//! use doorbot_core::EntryCode;
//! use doorbot_storage::{CsvRecordStore, Matcher};
//!
//! # async fn example() {
//! let matcher = Matcher::new(CsvRecordStore::new("members.csv"));
//!
//! match matcher.find(&EntryCode::keypad("123456")).await {
//!     Some(record) => println!("welcome {}", record.announce_name()),
//!     None => println!("unknown code"),
//! }
//! # }
//! ```

pub mod error;
pub mod matcher;
pub mod store;

pub use error::{StorageError, StorageResult};
pub use matcher::{Matcher, scan};
pub use store::{CsvRecordStore, MemoryRecordStore, RecordStore, parse_records};
