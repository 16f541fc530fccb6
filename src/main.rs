use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use log::{info, warn};

use asg_cluster_autoscaler::clients::{AwsAsgApi, KubeClusterApi};
use asg_cluster_autoscaler::config::{Cli, Config};
use asg_cluster_autoscaler::health::spawn_healthcheck_server;
use asg_cluster_autoscaler::logging;
use asg_cluster_autoscaler::tick::run_tick;

#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::try_from(cli).context("invalid startup configuration") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("fatal: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    logging::init(config.debug, config.log_file.as_deref());

    let cluster = match KubeClusterApi::connect(config.kubeconfig.as_deref(), config.include_master_nodes)
        .await
        .context("failed to connect to the cluster API")
    {
        Ok(client) => client,
        Err(e) => {
            eprintln!("fatal: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let cloud = AwsAsgApi::connect(config.region.clone()).await;

    let healthy = Arc::new(AtomicBool::new(true));
    if config.enable_healthcheck_endpoint {
        spawn_healthcheck_server(Arc::clone(&healthy));
    }

    info!(
        "starting tick loop, interval={}s, dry_run={}",
        config.interval, config.dry_run
    );

    loop {
        let result = run_tick(&config, &cluster, &cloud, &healthy).await;

        if result.is_err() {
            warn!("tick failed, will retry next interval");
        }

        if config.once {
            // A tick failure is a transient I/O error, already logged and
            // latched into `healthy` above — not a fatal startup error, so
            // `--once` still exits cleanly (matching the upstream loop,
            // which logs and swallows a failed tick rather than raising).
            return ExitCode::SUCCESS;
        }

        tokio::select! {
            _ = tokio::time::sleep(std::time::Duration::from_secs(config.interval)) => {}
            _ = tokio::signal::ctrl_c() => {
                info!("received ctrl-c, shutting down");
                return ExitCode::SUCCESS;
            }
        }
    }
}
