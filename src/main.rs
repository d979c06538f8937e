use std::sync::Arc;
use storefront_session::application_port::*;
use storefront_session::client::*;
use storefront_session::domain_model::*;
use storefront_session::infra::*;
use storefront_session::logger::*;
use storefront_session::settings::*;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logger = Logger::new_bootstrap();

    let project_settings = parse_settings(cli.settings.as_deref())?;
    info!(?project_settings);
    logger.reload_from_config(&LogConfig::from(&project_settings.log))?;

    // Keep a typed handle on the fake backend so the demo can expire tokens.
    let fake_backend = (project_settings.api.backend == "fake").then(|| Arc::new(FakeBackend::new()));
    let client = match &fake_backend {
        Some(backend) => StorefrontClient::with_parts(
            &project_settings,
            backend.clone(),
            Arc::new(MemoryTokenStore::new()),
        ),
        None => StorefrontClient::try_new(&project_settings)?,
    };

    let mut events = client.auth_state.subscribe_events();
    let navigator = tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::Expired {
                    reason,
                    redirect_to,
                } => warn!(%reason, "session expired, navigating to {redirect_to}"),
                other => info!(?other, "session event"),
            }
        }
    });

    let result = tokio::select! {
        result = run(&client, &cli, fake_backend.as_deref()) => result,
        _ = signal::ctrl_c() => {
            info!("interrupted");
            Ok(())
        }
    };

    client.shutdown().await;
    navigator.abort();
    result
}

async fn run(
    client: &StorefrontClient,
    cli: &Cli,
    fake_backend: Option<&FakeBackend>,
) -> anyhow::Result<()> {
    let profile = match client.auth_service.restore_session().await {
        Ok(profile) => profile,
        Err(AuthError::NoSession) => {
            let (username, password) = match (&cli.username, &cli.password, fake_backend) {
                (Some(username), Some(password), _) => (username.clone(), password.clone()),
                (_, _, Some(_)) => (DEMO_USERNAME.to_string(), DEMO_PASSWORD.to_string()),
                _ => return Err(anyhow::anyhow!("no stored session, pass --username and --password")),
            };
            client
                .auth_service
                .login(Credentials { username, password })
                .await?
        }
        Err(e) => return Err(e.into()),
    };
    info!(username = %profile.username, id = %profile.id, "signed in");

    if let Some(backend) = fake_backend {
        backend.expire_access_tokens();
        info!("access tokens expired on the fake backend, firing concurrent requests");
        let paths = ["/api/products", "/api/cart", "/api/orders"];
        let results = futures_util::future::join_all(
            paths
                .iter()
                .map(|path| client.session.get_json::<serde_json::Value>(path)),
        )
        .await;
        for (path, result) in paths.iter().zip(results) {
            match result {
                Ok(body) => info!(%path, %body, "request recovered"),
                Err(e) => error!(%path, error = %e, "request failed"),
            }
        }
        info!(refresh_calls = backend.refresh_calls(), "refresh calls made");
    }

    let profile = client.auth_service.fetch_profile().await?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}
