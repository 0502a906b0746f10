// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

use std::env;
use std::future::Future;
use std::process::ExitCode;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use cloudwatch_shipper::{HttpLogsClient, ShipperConfig, ShipperHandle, ShipperService};

const STDIN_CALLER: &str = "stdin";

#[tokio::main]
pub async fn main() -> ExitCode {
    let log_level = env::var("SHIPPER_LOG_LEVEL")
        .map(|val| val.to_lowercase())
        .unwrap_or("info".to_string());

    let env_filter = format!("h2=off,hyper=off,rustls=off,{}", log_level);

    #[allow(clippy::expect_used)]
    let subscriber = tracing_subscriber::fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_new(env_filter).expect("could not parse log level in configuration"),
        )
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_thread_names(false)
        .with_thread_ids(false)
        .with_line_number(false)
        .with_file(false)
        .with_target(true)
        .without_time()
        .finish();

    #[allow(clippy::expect_used)]
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    debug!("Logging subsystem enabled");

    let config = match ShipperConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Error loading shipper configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let client = match HttpLogsClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            error!("Error creating CloudWatch Logs client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let (service, handle) = ShipperService::new(&config, client);
    let shipper = tokio::spawn(service.run());
    info!(
        "Shipping stdin to {}/{} via {}",
        config.group_name, config.stream_name, config.endpoint
    );

    let producer = handle.named(STDIN_CALLER);
    let forwarded = forward_lines(
        BufReader::new(tokio::io::stdin()),
        &producer,
        tokio::signal::ctrl_c(),
    )
    .await;
    debug!("Forwarded {forwarded} lines");

    handle.close();
    let state = match shipper.await {
        Ok(state) => state,
        Err(e) => {
            error!("Shipper task failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    match state.permanent_error {
        Some(e) => {
            error!("Log shipping stopped: {e}");
            ExitCode::FAILURE
        }
        None => {
            debug!("All log events shipped");
            ExitCode::SUCCESS
        }
    }
}

/// Ships every line of `reader` until end of input, a read error, a latched
/// shipper failure or `shutdown` completing. Returns the number of lines queued.
///
/// `shutdown` is polled for the whole run, including while waiting for room in the queue.
async fn forward_lines<R, F>(reader: R, producer: &ShipperHandle, shutdown: F) -> usize
where
    R: AsyncBufRead + Unpin,
    F: Future,
{
    tokio::pin!(shutdown);
    let mut lines = reader.lines();
    let mut forwarded = 0;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line,
            _ = &mut shutdown => {
                debug!("Received interrupt, shutting down");
                break;
            }
        };
        let line = match line {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!("Failed to read stdin: {e}");
                break;
            }
        };
        tokio::select! {
            () = producer.log(line) => forwarded += 1,
            _ = &mut shutdown => {
                debug!("Received interrupt while the queue was full, shutting down");
                break;
            }
        }
        if producer.permanent_error().is_some() {
            break;
        }
    }

    forwarded
}
