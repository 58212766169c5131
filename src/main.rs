mod app;
mod cards;
mod catalog;
mod cli;
mod cli_ops;
mod clock;
mod completions;
mod config;
mod db;
mod dispatch;
mod domain;
mod ids;
mod listing_query;
mod logging;
mod ui;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    logging::init(cli.verbose);
    let config = config::Config::load(cli.config.as_deref())?;

    match &cli.command {
        Commands::Config => return dispatch::print_json(&config),
        Commands::Completions(args) => {
            return completions::run_completions_command(args.shell.as_deref(), args.install);
        }
        _ => {}
    }

    let mut app = app::App::open(&cli.db, config)?;
    app.act_as(cli.actor.as_deref());
    tracing::debug!(db = %cli.db, actor = cli.actor.as_deref().unwrap_or("-"), "dispatching command");
    dispatch::run_command(&app, cli.command)
}
