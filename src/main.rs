use particles::ParticlesConfig;
use tracing::error;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = particles::run(ParticlesConfig::default()) {
        error!("{}", e);
        std::process::exit(1);
    }
}
