use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use smppc::pdu::SubmitSm;
use smppc::{BindParameter, BindType, Session, SessionConfig};

#[derive(Parser, Debug)]
#[command(name = "send_sms")]
#[command(author, version, about = "Bind to an SMSC and submit one message")]
struct Args {
    /// SMSC address (host:port)
    #[arg(long, default_value = "127.0.0.1:2775")]
    smsc: String,

    /// ESME system_id
    #[arg(long)]
    system_id: String,

    /// ESME password
    #[arg(long)]
    password: String,

    /// Optional YAML file with session settings
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Source address
    #[arg(long)]
    from: String,

    /// Destination address
    #[arg(long)]
    to: String,

    /// Message text
    text: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config file: {}", path.display()))?;
            SessionConfig::from_yaml(&contents)?
        }
        None => SessionConfig::default(),
    };

    let bind = BindParameter::new(BindType::Transceiver, &args.system_id, &args.password);
    let session = Session::builder()
        .config(config)
        .connect_and_bind(&args.smsc, &bind)
        .await?;

    info!(
        session_id = %session.session_id(),
        smsc_system_id = %session.smsc_system_id(),
        "bound"
    );

    let submit_sm = SubmitSm {
        source_addr: args.from.clone(),
        dest_addr: args.to.clone(),
        short_message: args.text.into_bytes(),
        ..SubmitSm::default()
    };
    let message_id = session.submit_sm(submit_sm).await?;
    info!(message_id = %message_id, "message accepted");

    session.unbind_and_close().await;
    Ok(())
}
