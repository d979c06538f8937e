use anyhow::Context;
use storefront_session::settings::*;

// $ cargo run --bin settings_demo -- --settings=settings/release.toml
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = parse_settings(cli.settings.as_deref()).context("loading settings profile")?;

    let api = &settings.api;
    println!("backend:        {}", api.backend);
    println!("base url:       {}", api.base_url);
    println!("login:          {}{}", api.base_url, api.login_path);
    println!("refresh:        {}{}", api.base_url, api.refresh_path);
    println!("profile:        {}{}", api.base_url, api.profile_path);
    println!("timeout:        {}s", api.timeout_secs);
    println!("login redirect: {}", api.login_redirect);

    let store = &settings.token_store;
    match &store.path {
        Some(path) => println!("token store:    {} ({path})", store.backend),
        None => println!("token store:    {}", store.backend),
    }
    println!("log filter:     {}", settings.log.filter);

    // An empty path is rejected rather than falling back to the default profile.
    if let Err(e) = parse_settings(Some("")) {
        println!("empty path:     {e:#}");
    }
    Ok(())
}
