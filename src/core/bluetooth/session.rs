//! Orchestrates one gathering run end to end.

use log::info;
use tokio_util::sync::CancellationToken;

use crate::config::DeviceConfig;
use crate::core::bluetooth::backoff::RetryPolicy;
use crate::core::bluetooth::connection::{Connect, establish};
use crate::core::bluetooth::discovery::{Discovery, discover_device};
use crate::core::bluetooth::reader::read_selected;
use crate::core::bluetooth::selection::select_services;
use crate::core::bluetooth::transport::GattTransport;
use crate::core::bluetooth::types::GatherReport;
use crate::progress::ProgressReporter;

/// Terminal result of one run.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(GatherReport),
    DiscoveryFailed { attempts: usize },
    ConnectionFailed { reason: String },
    Interrupted { partial: GatherReport },
}

/// Drives discovery, connection, selection and paced reads against one
/// device. Holds the only connection of the run and releases it on every
/// path out of [`GatherSession::run`].
pub struct GatherSession<T: GattTransport> {
    transport: T,
    config: DeviceConfig,
    policy: RetryPolicy,
    reporter: ProgressReporter,
}

impl<T: GattTransport> GatherSession<T> {
    pub fn new(
        transport: T,
        config: DeviceConfig,
        policy: RetryPolicy,
        reporter: ProgressReporter,
    ) -> Self {
        Self {
            transport,
            config,
            policy,
            reporter,
        }
    }

    /// Runs the full gathering sequence.
    pub async fn run(&self, token: &CancellationToken) -> RunOutcome {
        let device = match discover_device(
            &self.transport,
            &self.config.device_address,
            &self.policy,
            token,
            &self.reporter,
        )
        .await
        {
            Discovery::Found(device) => device,
            Discovery::NotFound { attempts } => return RunOutcome::DiscoveryFailed { attempts },
            Discovery::Interrupted => {
                return RunOutcome::Interrupted {
                    partial: GatherReport::default(),
                };
            }
        };

        let connection = match establish(&self.transport, &device, &self.policy, token).await {
            Connect::Open(connection) => connection,
            Connect::Failed(e) => {
                return RunOutcome::ConnectionFailed {
                    reason: e.to_string(),
                };
            }
            Connect::Interrupted => {
                return RunOutcome::Interrupted {
                    partial: GatherReport::default(),
                };
            }
        };

        let outcome = self.run_connected(&connection, token).await;
        self.transport.disconnect(&connection).await;
        outcome
    }

    /// Everything that happens while the connection is open. Kept apart
    /// from [`GatherSession::run`] so no return path can skip the
    /// disconnect that follows it.
    async fn run_connected(&self, connection: &T::Connection, token: &CancellationToken) -> RunOutcome {
        let services = match self.transport.list_services(connection).await {
            Ok(services) => services,
            Err(e) => {
                return RunOutcome::ConnectionFailed {
                    reason: e.to_string(),
                };
            }
        };
        info!("Enumerated {} services", services.len());

        let selected = select_services(&services, &self.config);
        if selected.is_empty() {
            info!("No services matched the target device family");
        }

        let batch = read_selected(
            &self.transport,
            connection,
            &selected,
            &self.config,
            &self.policy,
            token,
        )
        .await;

        let report = GatherReport {
            services: selected,
            reads: batch.reads,
            onboard_storage: batch.onboard_storage,
        };
        if batch.interrupted {
            RunOutcome::Interrupted { partial: report }
        } else {
            RunOutcome::Completed(report)
        }
    }
}
