use std::{path::Path, time::Duration};

use anyhow::{Result, anyhow};
use comics_server::config::{Parser, ServerConfig};
use rand::Rng as _;
use reqwest::Url;
use tempfile::TempDir;
use tracing::debug;

pub mod rest;

fn random_port() -> Result<u16> {
    let mut rng = rand::rng();

    let mut retries = 3;
    while retries > 0 {
        let port: u16 = rng.random_range(4030..5030);
        let addr: std::net::SocketAddr = format!("127.0.0.1:{}", port).parse()?;
        match std::net::TcpStream::connect_timeout(&addr, Duration::from_millis(100)) {
            Err(e) if e.kind() == std::io::ErrorKind::ConnectionRefused => return Ok(port),
            Err(_) => retries -= 1,
            Ok(_) => retries -= 1,
        }
    }

    Err(anyhow!("Could not find a free port"))
}

pub struct ConfigGuard {
    #[allow(dead_code)]
    data_dir: TempDir,
}

pub fn test_config(
    test_name: &str,
    base_dir: &Path,
    extra_args: &[&str],
) -> Result<(ServerConfig, ConfigGuard)> {
    let tmp_data_dir = TempDir::with_prefix_in(format!("{}_", test_name), base_dir)?;
    let data_dir = tmp_data_dir.path().to_string_lossy().to_string();
    let port = random_port()?;
    let port = port.to_string();
    let mut args = vec!["comics-e2e-tests", "--data-dir", &data_dir, "--port", &port];
    args.extend_from_slice(extra_args);
    let config = ServerConfig::try_parse_from(args)?;
    Ok((
        config,
        ConfigGuard {
            data_dir: tmp_data_dir,
        },
    ))
}

/// Config with a fresh data directory, nothing is started yet.
pub async fn prepare_env(
    test_name: &str,
    extra_args: &[&str],
) -> Result<(ServerConfig, ConfigGuard)> {
    let base_dir = std::env::temp_dir();
    test_config(test_name, &base_dir, extra_args)
}

pub fn base_url(args: &ServerConfig) -> Result<Url> {
    let url = Url::parse(&format!("http://{}:{}/", args.listen_address, args.port))?;
    Ok(url)
}

pub fn extend_url(url: &Url, segment: impl std::fmt::Display) -> Url {
    let mut url = url.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments.pop_if_empty().push(&segment.to_string());
    }
    url
}

/// Runs the server in the background and waits until it answers.
pub async fn spawn_server(args: ServerConfig) -> Result<()> {
    let health_url = base_url(&args)?.join("v1/healthcheck")?;
    tokio::spawn(async move {
        if let Err(e) = comics_server::run::run(args).await {
            tracing::error!("Server failed: {e}");
        }
    });

    let client = reqwest::Client::new();
    for _ in 0..50 {
        match client.get(health_url.clone()).send().await {
            Ok(response) if response.status().is_success() => return Ok(()),
            Ok(response) => debug!("Server not ready: {}", response.status()),
            Err(e) => debug!("Server not ready: {e}"),
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    Err(anyhow!("Server did not start"))
}

/// Starts the server, returns a client and the comics endpoint.
pub async fn launch_env(args: ServerConfig) -> Result<(reqwest::Client, Url)> {
    let api_url = base_url(&args)?.join("v1/comics")?;
    spawn_server(args).await?;
    Ok((reqwest::Client::new(), api_url))
}
