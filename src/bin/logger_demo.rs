use storefront_session::domain_model::AccessToken;
use storefront_session::logger::*;

fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    trace!("bootstrap trace log");
    debug!("bootstrap debug log");
    info!("bootstrap info log");

    let config = LogConfig {
        filter: "storefront_session=trace,debug".to_string(),
    };
    logger.reload_from_config(&config)?;
    trace!("application trace log");
    debug!("application debug log");

    // tokens are redacted in structured fields
    let token = AccessToken("access-0123456789abcdef".to_string());
    info!(?token, "token field");

    Ok(())
}
