//! Main application entry point and CLI dispatch.
//!
//! Parses arguments, applies the custom config directory when given, and
//! hands off to the matching command handler. All real logic lives in the
//! library; this file only maps actions to handlers and errors to exit
//! codes.

use sunwidgetr::args::{CliAction, ParsedArgs, display_help, display_version_info};
use sunwidgetr::{log_end, log_error, log_pipe};
use sunwidgetr::commands;
use sunwidgetr::common::constants::EXIT_FAILURE;
use sunwidgetr::config;

fn main() {
    let parsed = ParsedArgs::parse(std::env::args());

    let result = match parsed.action {
        CliAction::Serve {
            debug_enabled,
            config_dir,
        } => with_config_dir(config_dir, || commands::serve::handle_serve_command(debug_enabled)),
        CliAction::Sync {
            config_dir,
            targets,
            ..
        } => with_config_dir(config_dir, || commands::sync::handle_sync_command(targets)),
        CliAction::Locate { config_dir, .. } => {
            with_config_dir(config_dir, commands::locate::handle_locate_command)
        }
        CliAction::Save {
            config_dir,
            latitude,
            longitude,
            ..
        } => with_config_dir(config_dir, || {
            commands::save::handle_save_command(latitude, longitude)
        }),
        CliAction::Status { config_dir, .. } => {
            with_config_dir(config_dir, commands::status::handle_status_command)
        }
        CliAction::ShowVersion => {
            display_version_info();
            Ok(())
        }
        CliAction::ShowHelp => {
            display_help();
            Ok(())
        }
        CliAction::ShowHelpDueToError => {
            display_help();
            std::process::exit(EXIT_FAILURE);
        }
    };

    if let Err(e) = result {
        log_pipe!();
        log_error!("{:#}", e);
        log_end!();
        std::process::exit(EXIT_FAILURE);
    }
}

fn with_config_dir<F>(config_dir: Option<String>, run: F) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    config::loading::set_config_dir(config_dir)?;
    run()
}
