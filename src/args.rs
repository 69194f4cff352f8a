//! Command-line argument parsing and processing.
//!
//! Hand-rolled parsing over a small fixed grammar: global flags plus one
//! optional subcommand. Unknown arguments fall through to help with an
//! error exit code rather than being silently ignored.

/// Represents the parsed command-line arguments and their intended actions.
#[derive(Debug, PartialEq)]
pub enum CliAction {
    /// Run the long-lived service instance (the default).
    Serve {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Trigger a synchronization pass, via the running instance if any.
    Sync {
        debug_enabled: bool,
        config_dir: Option<String>,
        targets: Vec<u32>,
    },
    /// Acquire the current location and persist it.
    Locate {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Persist a manually chosen location.
    Save {
        debug_enabled: bool,
        config_dir: Option<String>,
        latitude: f64,
        longitude: f64,
    },
    /// Print the persisted state.
    Status {
        debug_enabled: bool,
        config_dir: Option<String>,
    },
    /// Display help information and exit
    ShowHelp,
    /// Display version information and exit
    ShowVersion,
    /// Show help due to unknown arguments and exit
    ShowHelpDueToError,
}

/// Result of parsing command-line arguments.
pub struct ParsedArgs {
    pub action: CliAction,
}

impl ParsedArgs {
    /// Parse command-line arguments into a structured result.
    ///
    /// # Arguments
    /// * `args` - Iterator over command-line arguments (typically from std::env::args())
    pub fn parse<I, S>(args: I) -> ParsedArgs
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut debug_enabled = false;
        let mut config_dir: Option<String> = None;
        let mut targets: Vec<u32> = Vec::new();
        let mut positional: Vec<String> = Vec::new();

        let args_vec: Vec<String> = args
            .into_iter()
            .skip(1)
            .map(|s| s.as_ref().to_string())
            .collect();

        let mut i = 0;
        while i < args_vec.len() {
            match args_vec[i].as_str() {
                "-d" | "--debug" => debug_enabled = true,
                "-h" | "--help" => return ParsedArgs { action: CliAction::ShowHelp },
                "-V" | "--version" => {
                    return ParsedArgs {
                        action: CliAction::ShowVersion,
                    };
                }
                "-c" | "--config" => {
                    i += 1;
                    match args_vec.get(i) {
                        Some(dir) => config_dir = Some(dir.clone()),
                        None => {
                            return ParsedArgs {
                                action: CliAction::ShowHelpDueToError,
                            };
                        }
                    }
                }
                "-t" | "--targets" => {
                    i += 1;
                    let Some(list) = args_vec.get(i) else {
                        return ParsedArgs {
                            action: CliAction::ShowHelpDueToError,
                        };
                    };
                    match parse_targets(list) {
                        Some(parsed) => targets = parsed,
                        None => {
                            return ParsedArgs {
                                action: CliAction::ShowHelpDueToError,
                            };
                        }
                    }
                }
                arg if arg.starts_with('-') && arg.parse::<f64>().is_err() => {
                    return ParsedArgs {
                        action: CliAction::ShowHelpDueToError,
                    };
                }
                arg => positional.push(arg.to_string()),
            }
            i += 1;
        }

        let action = match positional.first().map(String::as_str) {
            None | Some("serve") if positional.len() <= 1 => CliAction::Serve {
                debug_enabled,
                config_dir,
            },
            Some("sync") if positional.len() == 1 => CliAction::Sync {
                debug_enabled,
                config_dir,
                targets,
            },
            Some("locate") | Some("geo") if positional.len() == 1 => CliAction::Locate {
                debug_enabled,
                config_dir,
            },
            Some("save") if positional.len() == 3 => {
                match (positional[1].parse::<f64>(), positional[2].parse::<f64>()) {
                    (Ok(latitude), Ok(longitude)) => CliAction::Save {
                        debug_enabled,
                        config_dir,
                        latitude,
                        longitude,
                    },
                    _ => CliAction::ShowHelpDueToError,
                }
            }
            Some("status") if positional.len() == 1 => CliAction::Status {
                debug_enabled,
                config_dir,
            },
            _ => CliAction::ShowHelpDueToError,
        };

        ParsedArgs { action }
    }
}

/// Parse a comma-separated widget target list.
fn parse_targets(list: &str) -> Option<Vec<u32>> {
    list.split(',')
        .filter(|part| !part.is_empty())
        .map(|part| part.trim().parse::<u32>().ok())
        .collect()
}

/// Display version information using the logging system.
pub fn display_version_info() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_end!();
}

/// Display help information using the logging system.
pub fn display_help() {
    log_version!();
    log_block_start!(env!("CARGO_PKG_DESCRIPTION"));
    log_block_start!("Usage:");
    log_indented!("sunwidgetr [OPTIONS] [COMMAND]");
    log_block_start!("Options:");
    log_indented!("-c, --config <dir>     Use custom configuration directory");
    log_indented!("-d, --debug            Enable detailed debug output");
    log_indented!("-t, --targets <ids>    Address specific widgets (comma-separated)");
    log_indented!("-h, --help             Print help information");
    log_indented!("-V, --version          Print version information");
    log_block_start!("Commands:");
    log_indented!("serve                  Run the service instance (default)");
    log_indented!("sync                   Refresh sunrise/sunset times now");
    log_indented!("locate, geo            Detect current location and save it");
    log_indented!("save <lat> <lon>       Save a manually chosen location");
    log_indented!("status                 Print the persisted state");
    log_end!();
}
