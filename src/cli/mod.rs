//! Command-line interface components
//!
//! This module contains CLI-specific code for the BDC Fetcher application,
//! including argument parsing, command handlers, and progress display.

pub mod args;
pub mod commands;

pub use args::{
    AuthAction, AuthArgs, ChallengeArgs, Cli, Commands, FixedArgs, GlobalArgs, MobileArgs,
};
pub use commands::{execute, handle_auth, handle_challenge, handle_dates, handle_fixed, handle_mobile};
