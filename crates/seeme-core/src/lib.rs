//! # seeme Core Library
//!
//! Business logic for the seeme habit tracker. Every operation is reachable
//! from the standalone `seeme` CLI; any other front-end is a thin layer over
//! the same library.
//!
//! ## Architecture
//!
//! - **Commitment engine**: a pure tri-state cycle per (habit, day) and a
//!   streak derived from day logs and a reference date
//! - **Optimistic store**: owns the habit snapshot, applies commits locally
//!   at once and reverts them if the remote collaborator fails
//! - **Remote**: async trait for the hosted row store, with an in-memory
//!   adapter and a SQLite adapter
//! - **Storage**: TOML configuration and data directory resolution
//!
//! ## Key Components
//!
//! - [`cycle`]: state transition function
//! - [`compute_streak`]: current streak
//! - [`OptimisticLogStore`]: snapshot owner and commit pipeline
//! - [`RemoteLogStore`]: collaborator trait
//! - [`view`]: cards and calendars for rendering

pub mod error;
pub mod events;
pub mod habit;
pub mod remote;
pub mod storage;
pub mod store;
pub mod view;

pub use error::{ConfigError, CoreError, EngineError, RemoteError, StoreError};
pub use events::StoreEvent;
pub use habit::{
    compute_streak, cycle, parse_date, summarize, CommitStatus, CyclePolicy, DayLog, DayState,
    Habit, HabitId, Operation, StreakSummary, Transition,
};
pub use remote::{InMemoryRemote, RemoteLogStore, SqliteRemote};
pub use storage::{data_dir, Config};
pub use store::{CommitOutcome, OptimisticLogStore, StoreOptions, VisibilityOutcome};
pub use view::{DisplayWindow, HabitCard, MonthCalendar};
