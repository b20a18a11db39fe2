//! Results of a synthetic delivery run

use uav_rust::MetricsCollector;

/// Simulation result
#[derive(Debug)]
pub struct RunResult {
    /// Seed used for the workload
    pub seed_used: u64,

    /// Number of ticks simulated
    pub ticks_completed: u64,

    /// Collector with the full log of the run
    pub metrics: MetricsCollector,

    /// Routing consistency findings
    pub consistency: ConsistencyStats,
}

/// Totals of the consistency checks over all discovery rounds
#[derive(Debug, Default, Clone)]
pub struct ConsistencyStats {
    /// Discovery rounds checked
    pub rounds_checked: usize,

    /// Nodes (depot included) reported with lost acks
    pub nodes_with_lost_acks: usize,

    /// Drones near the depot with a hop count above one
    pub hop_count_violations: usize,

    /// Depot table entries with a hop count above one
    pub depot_table_violations: usize,
}

impl RunResult {
    /// Print a summary of the run
    pub fn print_summary(&mut self) {
        println!("\n╔════════════════════════════════════════════════════════╗");
        println!("║        Synthetic Delivery Run                          ║");
        println!("╚════════════════════════════════════════════════════════╝\n");

        println!("Configuration:");
        println!("  Seed: {}", self.seed_used);
        println!("  Ticks: {}\n", self.ticks_completed);

        println!("Consistency Checks:");
        println!("  Rounds checked: {}", self.consistency.rounds_checked);
        println!(
            "  Nodes with lost acks: {}",
            self.consistency.nodes_with_lost_acks
        );
        println!(
            "  Hop count violations: {}",
            self.consistency.hop_count_violations
        );
        println!(
            "  Depot table violations: {}",
            self.consistency.depot_table_violations
        );

        self.metrics.print_summary();
    }
}
