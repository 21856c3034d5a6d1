use clap::Parser;
use dotenvy::dotenv;
use plec_backend::config::AppConfig;
use plec_backend::utils::auth::create_jwt;
use plec_backend::utils::nonce::{GENERATE_ACTION, create_nonce};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Mints a bearer token for calling the SIP generator.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Subject (user id) the token is issued to
    #[arg(short, long)]
    user: String,

    /// Token lifetime in hours
    #[arg(long, default_value_t = 24)]
    ttl_hours: i64,

    /// Also print a generate nonce for this user
    #[arg(long)]
    nonce: bool,
}

fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "issue_token=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if args.user.trim().is_empty() {
        error!("❌ --user must not be empty");
        std::process::exit(1);
    }
    if args.ttl_hours <= 0 {
        error!("❌ --ttl-hours must be positive");
        std::process::exit(1);
    }

    let config = AppConfig::from_env();
    if config.jwt_secret == AppConfig::default().jwt_secret {
        info!("⚠️  JWT_SECRET is unset, signing with the development default");
    }

    let token = create_jwt(args.user.trim(), &config.jwt_secret, args.ttl_hours)?;
    info!(
        "🔑 Issued token for '{}' valid {} hour(s)",
        args.user.trim(),
        args.ttl_hours
    );
    println!("{}", token);

    if args.nonce {
        println!(
            "{}",
            create_nonce(
                &config.nonce_secret,
                args.user.trim(),
                GENERATE_ACTION,
                chrono::Utc::now()
            )?
        );
    }

    Ok(())
}
