use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};

pub use crate::cli_ops::*;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "carmart")]
#[command(bin_name = "carmart")]
#[command(version)]
#[command(about = "A local-first vehicle classifieds marketplace")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        global = true,
        env = "CARMART_DB_PATH",
        default_value = ".carmart/state.sqlite",
        help = "Path to the marketplace SQLite database."
    )]
    pub db: String,

    #[arg(
        short = 'c',
        long,
        global = true,
        env = "CARMART_CONFIG",
        help = "TOML file layered over the built-in defaults."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        short = 'a',
        long = "as",
        global = true,
        env = "CARMART_ACTOR",
        value_name = "EMAIL",
        help = "Act as the member registered with this email."
    )]
    pub actor: Option<String>,

    #[arg(
        short = 'v',
        long = "verbose",
        global = true,
        action = ArgAction::Count,
        help = "Raise log verbosity (-v info, -vv debug)."
    )]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
#[allow(clippy::large_enum_variant)]
pub enum Commands {
    #[command(about = "Register accounts, manage your profile and verification.")]
    Account(AccountArgs),
    #[command(about = "Browse and maintain the category tree.")]
    Category(CategoryArgs),
    #[command(about = "Create and manage your listings.")]
    Listing(ListingArgs),
    #[command(about = "Search active listings.")]
    Search(SearchArgs),
    #[command(about = "Request or withdraw visibility boosts.")]
    Doping(DopingArgs),
    #[command(about = "Moderation commands for admins.")]
    Admin(AdminArgs),
    #[command(about = "Favorite listings.")]
    Favorite(FavoriteArgs),
    #[command(about = "Saved search filters.")]
    Filter(FilterArgs),
    #[command(about = "Message sellers and buyers.")]
    Chat(ChatArgs),
    #[command(about = "Print the effective configuration.")]
    Config,
    #[command(about = "Generate or install shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
#[command(about = "Generate or install shell completions.")]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish). Auto-detected if omitted.")]
    pub shell: Option<String>,

    #[arg(
        short = 'i',
        long = "install",
        help = "Write completions to the canonical path for the shell."
    )]
    pub install: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
