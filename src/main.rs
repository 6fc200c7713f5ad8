//! vsphere-exporter - Prometheus exporter for VMware vSphere
//!
//! This binary serves host and virtual machine inventory metrics
//! collected from vCenter / ESXi endpoints.

use anyhow::Result;
use clap::Parser;
use serde::Serialize;
use tracing::info;

use vsphere_exporter::cli::{Cli, OutputFormat};
use vsphere_exporter::config::{Config, ScrapeMode, SharedConfig};
use vsphere_exporter::server;

/// Summary printed by `--validate`. Never includes passwords.
#[derive(Serialize)]
struct ValidationReport {
    valid: bool,
    config_file: String,
    mode: ScrapeMode,
    enabled_cluster: Option<String>,
    clusters: Vec<String>,
    port: u16,
    path: String,
    bind_address: String,
    timeout_ms: u64,
    api_release: String,
}

impl ValidationReport {
    fn new(cli: &Cli, config: &Config) -> Self {
        let mut clusters: Vec<String> = config.clusters.keys().cloned().collect();
        clusters.sort();

        Self {
            valid: true,
            config_file: cli.config.display().to_string(),
            mode: config.mode,
            enabled_cluster: config.enabled_cluster.clone(),
            clusters,
            port: cli.port.unwrap_or(config.server.port),
            path: config.server.path.clone(),
            bind_address: cli
                .bind_address
                .clone()
                .unwrap_or_else(|| config.server.bind_address.clone()),
            timeout_ms: config.vsphere.timeout_ms,
            api_release: config.vsphere.api_release.clone(),
        }
    }

    fn render(&self, format: OutputFormat) -> Result<String> {
        Ok(match format {
            OutputFormat::Text => {
                let mut out = String::from("Configuration is valid\n");
                out.push_str(&format!("  Config file:  {}\n", self.config_file));
                out.push_str(&format!("  Mode:         {:?}\n", self.mode));
                if let Some(cluster) = &self.enabled_cluster {
                    out.push_str(&format!("  Enabled:      {}\n", cluster));
                }
                out.push_str(&format!("  Clusters:     {}\n", self.clusters.join(", ")));
                out.push_str(&format!(
                    "  Listen:       {}:{}{}\n",
                    self.bind_address, self.port, self.path
                ));
                out.push_str(&format!("  Timeout:      {}ms\n", self.timeout_ms));
                out.push_str(&format!("  API release:  {}", self.api_release));
                out
            }
            OutputFormat::Json => serde_json::to_string_pretty(self)?,
            OutputFormat::Yaml => serde_yaml::to_string(self)?,
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.validate {
        let config = Config::load(&cli.config)?;
        println!(
            "{}",
            ValidationReport::new(&cli, &config).render(cli.output_format)?
        );
        return Ok(());
    }

    vsphere_exporter::init_logging(&cli.log_level.to_string(), cli.log_format)?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting vsphere-exporter"
    );

    let config = Config::load_or_default(&cli.config)?;
    let port = cli.port.unwrap_or(config.server.port);
    let bind_address = cli
        .bind_address
        .clone()
        .unwrap_or_else(|| config.server.bind_address.clone());

    server::run(SharedConfig::new(&cli.config, config), port, bind_address).await?;

    Ok(())
}
