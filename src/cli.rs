use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "e5check")]
#[command(about = "Check Microsoft 365 subscription expiry dates from the command line")]
#[command(version)]
pub struct Cli {
    /// Increase verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Credential pairs (email-password&email2-password2...); overrides the
    /// MS_E5_ACCOUNTS environment variable
    #[arg(long, value_name = "PAIRS")]
    pub accounts: Option<String>,

    /// Subscription name to look for on the subscriptions page
    #[arg(long, default_value = "Microsoft 365 E5")]
    pub target: String,

    /// Directory for diagnostic screenshots
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub screenshot_dir: PathBuf,

    /// Timeout for login and navigation waits, in seconds
    #[arg(long, default_value_t = 45)]
    pub timeout_secs: u64,

    /// Timeout for the optional "stay signed in?" prompt, in seconds
    #[arg(long, default_value_t = 20)]
    pub kmsi_timeout_secs: u64,

    /// Minimum pause between accounts, in seconds
    #[arg(long, default_value_t = 20)]
    pub min_delay_secs: u64,

    /// Maximum pause between accounts, in seconds
    #[arg(long, default_value_t = 40)]
    pub max_delay_secs: u64,

    /// Run with a visible browser window
    #[arg(long)]
    pub headful: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_portal_timings() {
        let cli = Cli::try_parse_from(["e5check"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert_eq!(cli.target, "Microsoft 365 E5");
        assert_eq!(cli.timeout_secs, 45);
        assert_eq!(cli.kmsi_timeout_secs, 20);
        assert_eq!(cli.min_delay_secs, 20);
        assert_eq!(cli.max_delay_secs, 40);
        assert!(!cli.headful);
        assert!(cli.accounts.is_none());
        assert_eq!(cli.screenshot_dir, PathBuf::from("."));
    }

    #[test]
    fn parse_accounts_override() {
        let cli = Cli::try_parse_from(["e5check", "--accounts", "a@x.com-pw1&b@x.com-pw2"])
            .unwrap();
        assert_eq!(cli.accounts.as_deref(), Some("a@x.com-pw1&b@x.com-pw2"));
    }

    #[test]
    fn verbose_flag_counts() {
        let cli = Cli::try_parse_from(["e5check", "-vv"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn parse_target_and_screenshot_dir() {
        let cli = Cli::try_parse_from([
            "e5check",
            "--target",
            "Office 365 E3",
            "--screenshot-dir",
            "/tmp/shots",
        ])
        .unwrap();
        assert_eq!(cli.target, "Office 365 E3");
        assert_eq!(cli.screenshot_dir, PathBuf::from("/tmp/shots"));
    }

    #[test]
    fn unknown_flag_fails() {
        assert!(Cli::try_parse_from(["e5check", "--nope"]).is_err());
    }
}
