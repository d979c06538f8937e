use super::Parser;

/// Command line for the `storefront` binary. Not `Debug`: it can carry a password.
#[derive(Parser)]
#[command(name = "storefront", about = "Storefront API session client")]
pub struct Cli {
    /// Settings profile, e.g. `settings/release.toml` (the extension may be omitted).
    #[arg(short, long, value_name = "PATH")]
    pub settings: Option<String>,
    /// Log in as this user when no stored session can be restored.
    #[arg(short, long, requires = "password")]
    pub username: Option<String>,
    #[arg(short, long, requires = "username")]
    pub password: Option<String>,
}
