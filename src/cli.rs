//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// mTLS client certificates as the OAuth2 client secret
#[derive(Parser, Debug)]
#[command(name = "certgrant")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "CERTGRANT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "CERTGRANT_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "CERTGRANT_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand
    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the authorization server (token endpoint + discovery)
    AuthServer,

    /// Start the resource server (open and mTLS-only listeners)
    ResourceServer,

    /// Run the resource client (discover, authenticate, call loop)
    Client,
}
