use bkgt_scraper::store::RunKind;
use clap::Parser;
use clap::builder::styling::{AnsiColor, Effects, Styles};

fn get_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .usage(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
        .literal(AnsiColor::Green.on_default())
        .placeholder(AnsiColor::Yellow.on_default())
        .error(AnsiColor::Red.on_default().effects(Effects::BOLD))
        .valid(AnsiColor::Green.on_default())
        .invalid(AnsiColor::Red.on_default())
}

/// Determines whether the command only touches local state.
/// Configuration and reporting commands never contact the source site.
pub fn is_local_command(args: &Args) -> bool {
    args.list_config
        || args.new_source_url.is_some()
        || args.set_credentials.is_some()
        || args.logs.is_some()
        || args.stats
}

/// BKGT club data scraper
///
/// Logs into svenskalag.se with the club's scraping account and imports
/// teams, players and matches into the local database.
///
/// Without options a single manual run of `--kind` is performed and the
/// number of added records is printed per kind. With `--interval` the
/// scraper keeps running and imports everything every N minutes, as long as
/// scheduled scraping is enabled in the config.
#[derive(Parser, Debug)]
#[command(author = "BKGT", version, about, long_about = None)]
#[command(styles = get_styles())]
pub struct Args {
    /// What to scrape: teams, players, events or all.
    #[arg(long, short = 'k', default_value = "all", help_heading = "Scraping")]
    pub kind: RunKind,

    /// Run every N minutes until interrupted instead of once.
    #[arg(long, value_name = "MINUTES", help_heading = "Scraping")]
    pub interval: Option<u64>,

    /// Scrape into an in-memory store. Nothing is written to the database.
    #[arg(long = "dry-run", help_heading = "Scraping")]
    pub dry_run: bool,

    /// Print the run summary as JSON.
    #[arg(long, help_heading = "Scraping")]
    pub json: bool,

    /// List the N most recent run logs. Combine with --kind to filter.
    #[arg(long, value_name = "N", help_heading = "Reports")]
    pub logs: Option<usize>,

    /// Show aggregate statistics over all stored runs.
    #[arg(long, help_heading = "Reports")]
    pub stats: bool,

    /// Encrypt and store credentials for USER. The password is read from stdin
    /// and encrypted with the secret in BKGT_CREDENTIAL_KEY.
    #[arg(long = "set-credentials", value_name = "USER", help_heading = "Configuration")]
    pub set_credentials: Option<String>,

    /// Update the club source URL in config.
    #[arg(
        long = "config-source-url",
        value_name = "URL",
        help_heading = "Configuration"
    )]
    pub new_source_url: Option<String>,

    /// List current configuration settings
    #[arg(long = "list-config", short = 'l', help_heading = "Configuration")]
    pub list_config: bool,

    /// Also write info logs to the terminal during local commands.
    #[arg(long = "debug", help_heading = "Debug")]
    pub debug: bool,

    /// Specify a custom log file path. If not provided, logs will be written to the default location.
    #[arg(long = "log-file", help_heading = "Debug")]
    pub log_file: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_to_single_all_run() {
        let args = Args::try_parse_from(["bkgt_scraper"]).unwrap();
        assert_eq!(args.kind, RunKind::All);
        assert!(args.interval.is_none());
        assert!(!is_local_command(&args));
    }

    #[test]
    fn test_kind_parsing() {
        let args = Args::try_parse_from(["bkgt_scraper", "--kind", "players"]).unwrap();
        assert_eq!(args.kind, RunKind::Players);
        assert!(Args::try_parse_from(["bkgt_scraper", "--kind", "coaches"]).is_err());
    }

    #[test]
    fn test_report_commands_are_local() {
        let args = Args::try_parse_from(["bkgt_scraper", "--logs", "5", "-k", "teams"]).unwrap();
        assert_eq!(args.logs, Some(5));
        assert!(is_local_command(&args));

        let args = Args::try_parse_from(["bkgt_scraper", "--set-credentials", "kassor"]).unwrap();
        assert_eq!(args.set_credentials.as_deref(), Some("kassor"));
        assert!(is_local_command(&args));
    }
}
