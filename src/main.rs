use tracing_subscriber::EnvFilter;
use clap::Parser;
use wsdispatch::{ Args, ServerOptions, server };

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let options = ServerOptions::from_args(Args::parse())?;

    // Set up logging
    let default_level = if options.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        "Starting wsdispatch on {} (idle timeout {:?}, write timeout {:?}, max message {} bytes)",
        options.bind_address,
        options.idle_timeout,
        options.write_timeout,
        options.max_message_size
    );

    server::serve(options).await?;
    Ok(())
}
