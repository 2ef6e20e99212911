use vpc_perceptron::*;
use vpc_perceptron::workload::Workload;
use log::info;
use std::env;
use std::time::Instant;

fn report(p: &VpcPredictor, stats: &vpc_perceptron::stats::BranchStats) {
    println!("[*] {}", p.name());
    println!("      Storage bits:   {}b, {:.2}KiB",
        p.cfg.storage_bits(), p.cfg.storage_bits() as f64 / 1024.0 / 8.0
    );
    println!("      Conditional:    {}/{} ({:.2}% correct) ({} misses)",
        stats.cond_hits, stats.cond_brns,
        stats.cond_hit_rate() * 100.0, stats.cond_miss()
    );
    println!("      Indirect:       {}/{} ({:.2}% correct) ({} misses)",
        stats.tgt_hits, stats.tgt_brns,
        stats.tgt_hit_rate() * 100.0, stats.tgt_miss()
    );
    println!("      Target cache:   {:.2}% utilization",
        p.targets().cache().utilization()
    );
    if p.targets().usage().is_some() {
        println!("      VPC:            {:.2}% of {} lookups correct",
            p.stat.hit_rate() * 100.0, p.stat.lookups
        );
        println!("                      {} btb misses, {} found, {} allocs, {} evictions",
            p.stat.btb_misses, p.stat.found, p.stat.allocs, p.stat.evictions
        );
        let hits: Vec<String> = p.stat.iter_hits.iter()
            .map(|h| h.to_string()).collect();
        println!("      Hits per iter:  [{}]", hits.join(", "));
    }
    println!("      Low hit-rate branches:");
    for (pc, data) in stats.get_low_rate_branches(4, 100) {
        println!("        {:016x} {:8}/{:8} {:.4}",
            pc, data.hits, data.occ, data.hit_rate()
        );
    }
}

fn main() -> Result<(), ConfigError> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() > 3 {
        println!("usage: {} [seed] [branches]", args[0]);
        return Ok(());
    }
    let seed: u64 = args.get(1).and_then(|s| s.parse().ok()).unwrap_or(1);
    let len: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(1_000_000);

    let records = Workload::mixed(seed).generate(len);
    info!("generated {} records (seed {})", records.len(), seed);

    let base = sim::run(&mut TakenPredictor, &records);
    println!("[*] {}: {:.2}% conditional correct",
        TakenPredictor.name(), base.cond_hit_rate() * 100.0
    );

    for cfg in [
        PredictorConfig::merged_path_vpc(),
        PredictorConfig::global_bipolar(),
        PredictorConfig::global_shifted(),
    ] {
        let mut p = cfg.build()?;
        let start = Instant::now();
        let stats = sim::run(&mut p, &records);
        let done = start.elapsed();
        report(&p, &stats);
        println!("      ... simulated in {:.3?}", done);
        println!();
    }
    Ok(())
}
