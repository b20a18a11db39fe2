use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Instant;
use uav_rust::{DataPacket, Event, MetricsCollector, MissionSetup, Position, DEFAULT_UNDELIVERED_PENALTY};

/// Build a collector with `n_events` events and a few copies per event
fn synthetic_log(n_events: u64, seed: u64) -> MetricsCollector {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut metrics = MetricsCollector::new(MissionSetup::default());
    let mut packet_id = 0;

    for event_id in 0..n_events {
        let tick = event_id * 3;
        let event = Event::new(event_id, Position::new(rng.gen(), rng.gen()), tick, 2000);
        metrics.record_event(event);

        for copy in 0..rng.gen_range(1..=4u64) {
            let packet = DataPacket::new(packet_id, tick + copy, event, 1, 200);
            packet_id += 1;
            metrics.record_packet(packet);
            metrics.count_data_packet();

            if rng.gen_bool(0.7) {
                metrics.record_delivery(packet, packet.creation_tick + rng.gen_range(1..500));
            }
        }
    }
    metrics
}

/// Benchmark score and derived statistics over large event logs
fn main() {
    // Suppress debug logs for cleaner output
    std::env::set_var("RUST_LOG", "error");
    let _ = simple_logger::init();

    println!("\n=== Score / Derived Statistics Benchmark ===\n");

    for n_events in [1_000u64, 10_000, 100_000] {
        let build_start = Instant::now();
        let mut metrics = synthetic_log(n_events, 42);
        let build_duration = build_start.elapsed();

        println!("Events: {}", n_events);
        println!("  Packets: {}", metrics.packets().count());
        println!("  Deliveries: {}", metrics.deliveries().len());
        println!("  Recording: {:.2}ms", build_duration.as_secs_f64() * 1000.0);

        let samples = 10;
        let mut total_score_time = 0.0;
        let mut score = None;
        for _ in 0..samples {
            let start = Instant::now();
            score = metrics.score(DEFAULT_UNDELIVERED_PENALTY);
            total_score_time += start.elapsed().as_secs_f64();
        }

        let start = Instant::now();
        let delivered = metrics.compute_derived_statistics().number_of_events_to_depot;
        let derive_duration = start.elapsed();

        println!(
            "  Score: {:.2}ms avg ({:?})",
            total_score_time / samples as f64 * 1000.0,
            score
        );
        println!(
            "  Derived statistics: {:.2}ms ({} events delivered)\n",
            derive_duration.as_secs_f64() * 1000.0,
            delivered
        );
    }
}
