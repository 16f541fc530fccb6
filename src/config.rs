//! CLI and configuration (§4.10, §6).

use clap::Parser;

use crate::error::{AutoscalerError, Result};
use crate::quantity::parse_resource;
use crate::sizing::Buffer;

fn default_interval() -> u64 {
    60
}

fn default_buffer_spare_nodes() -> u64 {
    1
}

fn default_buffer_percentage() -> f64 {
    10.0
}

#[derive(Parser, Debug)]
#[command(name = "asg-cluster-autoscaler", about = "Request-based cluster autoscaler control loop")]
pub struct Cli {
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,

    #[arg(long, default_value_t = false)]
    pub debug: bool,

    #[arg(long, default_value_t = false)]
    pub once: bool,

    #[arg(long, default_value_t = default_interval())]
    pub interval: u64,

    #[arg(long, default_value_t = false)]
    pub include_master_nodes: bool,

    #[arg(long, env = "BUFFER_SPARE_NODES", default_value_t = default_buffer_spare_nodes())]
    pub buffer_spare_nodes: u64,

    #[arg(long, default_value_t = false)]
    pub no_scale_down: bool,

    #[arg(long, env = "BUFFER_CPU_PERCENTAGE", default_value_t = default_buffer_percentage())]
    pub buffer_cpu_percentage: f64,

    #[arg(long, env = "BUFFER_MEMORY_PERCENTAGE", default_value_t = default_buffer_percentage())]
    pub buffer_memory_percentage: f64,

    #[arg(long, env = "BUFFER_PODS_PERCENTAGE", default_value_t = default_buffer_percentage())]
    pub buffer_pods_percentage: f64,

    #[arg(long, env = "BUFFER_CPU_FIXED", default_value = "200m")]
    pub buffer_cpu_fixed: String,

    #[arg(long, env = "BUFFER_MEMORY_FIXED", default_value = "200Mi")]
    pub buffer_memory_fixed: String,

    #[arg(long, env = "BUFFER_PODS_FIXED", default_value = "10")]
    pub buffer_pods_fixed: String,

    #[arg(long, default_value_t = false)]
    pub enable_healthcheck_endpoint: bool,

    #[arg(long, env = "AUTOSCALER_LOG_FILE")]
    pub log_file: Option<String>,

    #[arg(long, env = "KUBECONFIG")]
    pub kubeconfig: Option<String>,

    #[arg(long, env = "AWS_REGION")]
    pub region: Option<String>,
}

/// The immutable, already-validated configuration a tick runs against.
#[derive(Debug, Clone)]
pub struct Config {
    pub dry_run: bool,
    pub debug: bool,
    pub once: bool,
    pub interval: u64,
    pub include_master_nodes: bool,
    pub buffer_spare_nodes: u64,
    pub disable_scale_down: bool,
    pub buffer: Buffer,
    pub enable_healthcheck_endpoint: bool,
    pub log_file: Option<String>,
    pub kubeconfig: Option<String>,
    pub region: Option<String>,
}

impl TryFrom<Cli> for Config {
    type Error = AutoscalerError;

    fn try_from(cli: Cli) -> Result<Self> {
        let buffer = Buffer {
            cpu_percentage: cli.buffer_cpu_percentage,
            memory_percentage: cli.buffer_memory_percentage,
            pods_percentage: cli.buffer_pods_percentage,
            cpu_fixed: parse_resource(&cli.buffer_cpu_fixed)
                .map_err(|_| AutoscalerError::InvalidQuantity(cli.buffer_cpu_fixed.clone()))?,
            memory_fixed: parse_resource(&cli.buffer_memory_fixed)
                .map_err(|_| AutoscalerError::InvalidQuantity(cli.buffer_memory_fixed.clone()))?,
            pods_fixed: parse_resource(&cli.buffer_pods_fixed)
                .map_err(|_| AutoscalerError::InvalidQuantity(cli.buffer_pods_fixed.clone()))?,
        };

        Ok(Config {
            dry_run: cli.dry_run,
            debug: cli.debug,
            once: cli.once,
            interval: cli.interval,
            include_master_nodes: cli.include_master_nodes,
            buffer_spare_nodes: cli.buffer_spare_nodes,
            disable_scale_down: cli.no_scale_down,
            buffer,
            enable_healthcheck_endpoint: cli.enable_healthcheck_endpoint,
            log_file: cli.log_file,
            kubeconfig: cli.kubeconfig,
            region: cli.region,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_cli() -> Cli {
        Cli::parse_from(["asg-cluster-autoscaler"])
    }

    #[test]
    fn defaults_match_upstream() {
        let cfg = Config::try_from(base_cli()).unwrap();
        assert_eq!(cfg.interval, 60);
        assert_eq!(cfg.buffer_spare_nodes, 1);
        assert_eq!(cfg.buffer.cpu_percentage, 10.0);
        assert_eq!(cfg.buffer.memory_percentage, 10.0);
        assert_eq!(cfg.buffer.pods_percentage, 10.0);
        assert!((cfg.buffer.cpu_fixed - 0.2).abs() < 1e-9);
        assert_eq!(cfg.buffer.memory_fixed, 200.0 * 1024.0 * 1024.0);
        assert_eq!(cfg.buffer.pods_fixed, 10.0);
        assert!(!cfg.dry_run);
        assert!(!cfg.disable_scale_down);
    }

    #[test]
    fn invalid_fixed_buffer_is_a_config_error() {
        let mut cli = base_cli();
        cli.buffer_cpu_fixed = "".to_string();
        assert!(Config::try_from(cli).is_err());
    }
}
