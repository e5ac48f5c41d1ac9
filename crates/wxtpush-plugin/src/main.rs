// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// wxtpush-demo
//
// Initializes one vendor against the desktop stub bridge and prints every
// event envelope as a JSON line until registration settles.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::{Map, Value};

use wxtpush_bridge::stub::StubBridge;
use wxtpush_core::Vendor;
use wxtpush_plugin::{settings, PushManager};

#[derive(Parser, Debug)]
#[command(name = "wxtpush-demo")]
#[command(version)]
#[command(about = "Register one push vendor on the desktop stub and print its events", long_about = None)]
struct Cli {
    /// Vendor id: huawei, honor, xiaomi, oppo, vivo or apple.
    #[arg(long, default_value = "xiaomi")]
    vendor: String,

    #[arg(long, value_name = "ID")]
    app_id: Option<String>,

    #[arg(long, value_name = "KEY")]
    app_key: Option<String>,

    #[arg(long, value_name = "SECRET")]
    app_secret: Option<String>,

    /// Device id the simulated token is derived from.
    #[arg(long, default_value = "desktop-demo")]
    device_id: String,

    #[arg(long, default_value = "generic")]
    brand: String,

    /// Directory holding settings.json.
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Give up after this many seconds without a final event.
    #[arg(long, default_value_t = 30)]
    wait_secs: u64,
}

impl Cli {
    fn vendor_config(&self) -> Map<String, Value> {
        [
            ("appId", &self.app_id),
            ("appKey", &self.app_key),
            ("appSecret", &self.app_secret),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_owned(), Value::String(v.clone()))))
        .collect()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let vendor = match Vendor::parse(&cli.vendor) {
        Ok(v) => v,
        Err(e) => {
            tracing::error!(error = %e, "bad --vendor");
            return ExitCode::from(2);
        }
    };

    let bridge = StubBridge::default()
        .with_device_id(cli.device_id.clone())
        .with_brand(cli.brand.clone());
    let data_dir = cli.data_dir.clone().unwrap_or_else(settings::data_dir);
    let manager = PushManager::from_data_dir(Arc::new(bridge), &data_dir);
    manager.install_ingress();

    let mut events = manager.subscribe();
    if let Err(e) = manager.initialize_push(vendor, &cli.vendor_config()).await {
        tracing::error!(%vendor, error = %e, "initialize rejected");
        return ExitCode::FAILURE;
    }

    let deadline = tokio::time::sleep(Duration::from_secs(cli.wait_secs));
    tokio::pin!(deadline);
    let code = loop {
        tokio::select! {
            event = events.next() => {
                let Some(envelope) = event else {
                    break ExitCode::FAILURE;
                };
                match serde_json::to_string(&envelope) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "envelope not serializable"),
                }
                match envelope.event.as_str() {
                    "tokenReceived" => break ExitCode::SUCCESS,
                    "tokenError" => break ExitCode::FAILURE,
                    _ => {}
                }
            }
            _ = &mut deadline => {
                tracing::warn!(wait_secs = cli.wait_secs, "no final event before deadline");
                break ExitCode::FAILURE;
            }
        }
    };

    manager.cleanup();
    code
}
