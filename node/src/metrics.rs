//! Prometheus metrics for the DAO node.
//!
//! [`NodeMetrics`] owns a dedicated [`Registry`]; callers encode it in the
//! text exposition format with [`NodeMetrics::encode`].

use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, Encoder, IntCounter,
    IntGauge, Opts, Registry, TextEncoder,
};

pub struct NodeMetrics {
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub blocks_parsed: IntCounter,
    pub parse_failures: IntCounter,
    pub reorgs: IntCounter,
    pub proposals_received: IntCounter,
    pub blind_votes_received: IntCounter,
    pub reveals_published: IntCounter,
    pub reveal_failures: IntCounter,
    pub tallies_completed: IntCounter,
    /// Tallies held back by a majority mismatch.
    pub tallies_deferred: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    pub chain_height: IntGauge,
    pub cycle_index: IntGauge,
}

fn counter(registry: &Registry, name: &str, help: &str) -> Result<IntCounter, prometheus::Error> {
    register_int_counter_with_registry!(Opts::new(name, help), registry)
}

fn gauge(registry: &Registry, name: &str, help: &str) -> Result<IntGauge, prometheus::Error> {
    register_int_gauge_with_registry!(Opts::new(name, help), registry)
}

impl NodeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();
        Ok(Self {
            blocks_parsed: counter(&registry, "dao_blocks_parsed_total", "Blocks appended to the ledger")?,
            parse_failures: counter(&registry, "dao_parse_failures_total", "Blocks that failed to parse")?,
            reorgs: counter(&registry, "dao_reorgs_total", "Re-derivations from a snapshot")?,
            proposals_received: counter(
                &registry,
                "dao_proposals_received_total",
                "New proposals accepted from the network",
            )?,
            blind_votes_received: counter(
                &registry,
                "dao_blind_votes_received_total",
                "New blind votes accepted from the network",
            )?,
            reveals_published: counter(&registry, "dao_reveals_published_total", "Vote reveal txs built")?,
            reveal_failures: counter(&registry, "dao_reveal_failures_total", "Vote reveals that failed")?,
            tallies_completed: counter(&registry, "dao_tallies_completed_total", "Completed vote results")?,
            tallies_deferred: counter(
                &registry,
                "dao_tallies_deferred_total",
                "Vote results deferred pending recovery",
            )?,
            chain_height: gauge(&registry, "dao_chain_height", "Height of the last appended block")?,
            cycle_index: gauge(&registry, "dao_cycle_index", "Index of the current cycle")?,
            registry,
        })
    }

    /// Text exposition of every registered metric.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
