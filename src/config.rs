use crate::error::{AppError, AppResult};
use clap::Parser;

/// Coordinator tuning knobs (spec.md sec 4.5): read/write quorum, total
/// replicas, virtual nodes per physical node.
#[derive(Debug, Clone, Parser)]
#[command(name = "coordinator", about = "Vector-clock replicated KV coordinator")]
pub struct ClusterConfig {
    #[arg(long, default_value_t = 2)]
    pub read_quorum: usize,

    #[arg(long, default_value_t = 2)]
    pub write_quorum: usize,

    #[arg(long, default_value_t = 3)]
    pub total_replicas: usize,

    #[arg(long, default_value_t = 3)]
    pub virtual_nodes: u32,

    #[arg(long, default_value = "0.0.0.0")]
    pub address: String,

    #[arg(long, default_value_t = 4000)]
    pub port: u16,
}

impl ClusterConfig {
    /// Validates the R/W/N invariants from spec.md sec 4.5: all positive,
    /// R and W each bounded by N, and R + W > N strictly enforced so any
    /// read quorum intersects any write quorum.
    pub fn validate(&self) -> AppResult<()> {
        if self.read_quorum == 0 || self.write_quorum == 0 || self.total_replicas == 0 {
            return Err(AppError::InvalidConfig(
                "read_quorum, write_quorum, and total_replicas must all be positive".into(),
            ));
        }
        if self.read_quorum > self.total_replicas {
            return Err(AppError::InvalidConfig(
                "read_quorum must not exceed total_replicas".into(),
            ));
        }
        if self.write_quorum > self.total_replicas {
            return Err(AppError::InvalidConfig(
                "write_quorum must not exceed total_replicas".into(),
            ));
        }
        if self.read_quorum + self.write_quorum <= self.total_replicas {
            return Err(AppError::InvalidConfig(format!(
                "read_quorum ({}) + write_quorum ({}) must exceed total_replicas ({}) \
                 so reads and writes always intersect",
                self.read_quorum, self.write_quorum, self.total_replicas
            )));
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// Per-node configuration: identity, bind address, and the coordinator it
/// registers with on startup.
#[derive(Debug, Clone, Parser)]
#[command(name = "node", about = "Vector-clock KV replica node")]
pub struct NodeConfig {
    #[arg(long)]
    pub node_id: String,

    #[arg(long, default_value = "0.0.0.0")]
    pub address: String,

    #[arg(long)]
    pub port: u16,

    /// Address other nodes should use to reach this one (defaults to
    /// `address` when the node binds to a routable interface).
    #[arg(long)]
    pub advertise_address: Option<String>,

    #[arg(long)]
    pub coordinator: String,
}

impl NodeConfig {
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }

    pub fn advertised_address(&self) -> &str {
        self.advertise_address.as_deref().unwrap_or(&self.address)
    }
}
