//! # lifelog-export
//!
//! A CLI tool that downloads every lifelog from a [Limitless](https://limitless.ai)
//! account and writes them into a single local text file.
//!
//! ## What it does
//!
//! The Limitless API hands out lifelogs (transcripts recorded by the pendant) a page
//! at a time, each page carrying a cursor for the next one. This tool walks that
//! cursor chain from the beginning, one request at a time, collecting every record.
//! When the service stops returning cursors, the text of each record is written, in
//! order, to `all_lifelogs.txt`.
//!
//! The output file is replaced atomically at the end of a successful run. A failed run
//! leaves any previous export untouched.
//!
//! ## Usage
//!
//! ```sh
//! # Key from the environment, output to ./all_lifelogs.txt
//! LIMITLESS_API_KEY=... lifelog-export
//!
//! # Newest first, raw JSON records, custom path
//! lifelog-export --direction desc --format jsonl -o ~/backups/lifelogs.jsonl
//! ```
//!
//! Without a key in the flags, environment or config file, the key is asked for
//! interactively. Preferences can be persisted in
//! `~/.config/lifelog-export/config.toml`.
pub mod api;
pub mod client;
pub mod error;
pub mod exporter;
pub mod logging;
pub mod pager;
pub mod retry;
pub mod sequential;
pub mod utils;
