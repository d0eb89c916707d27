// scripts/benchmark.rs
use deep_bsde::equation::{Equation, MertonMarket, MertonParams};
use deep_bsde::math_utils::Timer;
use deep_bsde::rng::NoiseSampler;
use deep_bsde::solver::{DeepBsde, SolverOptions};
use deep_bsde::train::{Trainer, TrainerOptions};
use std::env;
use std::fs::File;
use std::io::Write;
use std::process::Command;

#[derive(Debug)]
struct SystemInfo {
    os: String,
    cpu_cores: usize,
    rust_version: String,
    rayon_threads: usize,
}

impl SystemInfo {
    fn gather() -> Self {
        Self {
            os: env::consts::OS.to_string(),
            cpu_cores: num_cpus::get(),
            rust_version: Command::new("rustc")
                .arg("--version")
                .output()
                .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
                .unwrap_or_else(|_| "Unknown Rust version".to_string()),
            rayon_threads: rayon::current_num_threads(),
        }
    }
}

#[derive(Debug)]
struct BenchmarkResult {
    name: String,
    batch_size: usize,
    epochs: usize,
    time_ms: f64,
    epochs_per_sec: f64,
    samples_per_sec: f64,
    final_loss: f64,
}

fn run_training_benchmarks() -> Vec<BenchmarkResult> {
    let mut results = Vec::new();
    let epochs = 5;
    let num_batches = 4;

    for &batch_size in &[64usize, 256, 1024] {
        println!("Benchmarking training with batch size {}...", batch_size);

        let market =
            MertonMarket::new(MertonParams::default()).expect("Valid market parameters");
        let sampler = NoiseSampler::new(
            market.dim(),
            market.num_time_interval(),
            market.delta_t(),
            42,
        )
        .expect("Valid sampler configuration");

        let train_ds = sampler
            .sample_dataset(num_batches, batch_size, 0)
            .expect("Training batches");
        let test_ds = sampler
            .sample_dataset(1, batch_size, 1_000)
            .expect("Test batches");

        let model = DeepBsde::new(market, 1.0, SolverOptions::default())
            .expect("Valid solver configuration");
        let mut trainer =
            Trainer::new(model, TrainerOptions::default()).expect("Valid trainer");

        let mut timer = Timer::new();
        timer.start();
        let history = trainer
            .fit(&train_ds, &test_ds, epochs)
            .expect("Training run");
        let time_ms = timer.elapsed_ms();

        let epochs_run = history.len();
        let samples = epochs_run * (num_batches + 1) * batch_size;
        results.push(BenchmarkResult {
            name: format!("Merton training (batch {})", batch_size),
            batch_size,
            epochs: epochs_run,
            time_ms,
            epochs_per_sec: epochs_run as f64 / (time_ms / 1000.0),
            samples_per_sec: samples as f64 / (time_ms / 1000.0),
            final_loss: history.final_loss().unwrap_or(f64::NAN),
        });
    }

    results
}

fn run_sampling_benchmarks() -> Vec<BenchmarkResult> {
    let mut results = Vec::new();

    for &batch_size in &[10_000usize, 100_000] {
        println!("Benchmarking noise sampling with {} paths...", batch_size);

        let sampler = NoiseSampler::new(2, 20, 0.05, 42).expect("Valid sampler configuration");
        let mut timer = Timer::new();
        timer.start();
        let batch = sampler.sample_batch(batch_size, 0).expect("Noise batch");
        let time_ms = timer.elapsed_ms();

        results.push(BenchmarkResult {
            name: format!("Noise sampling ({}k paths)", batch_size / 1000),
            batch_size,
            epochs: 0,
            time_ms,
            epochs_per_sec: 0.0,
            samples_per_sec: batch.nrows() as f64 / (time_ms / 1000.0),
            final_loss: f64::NAN,
        });
    }

    results
}

fn write_results_to_csv(results: &[BenchmarkResult], system_info: &SystemInfo, filename: &str) {
    let mut file = File::create(filename).expect("Could not create CSV file");

    writeln!(file, "# System Information").unwrap();
    writeln!(file, "# OS: {}", system_info.os).unwrap();
    writeln!(file, "# CPU Cores: {}", system_info.cpu_cores).unwrap();
    writeln!(file, "# Rust Version: {}", system_info.rust_version).unwrap();
    writeln!(file, "# Rayon Threads: {}", system_info.rayon_threads).unwrap();
    writeln!(
        file,
        "# Benchmark Date: {}",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
    .unwrap();
    writeln!(file, "#").unwrap();

    writeln!(
        file,
        "Benchmark,Batch_Size,Epochs,Time_ms,Epochs_per_sec,Samples_per_sec,Final_Loss"
    )
    .unwrap();

    for result in results {
        writeln!(
            file,
            "{},{},{},{:.2},{:.2},{:.0},{:.6e}",
            result.name,
            result.batch_size,
            result.epochs,
            result.time_ms,
            result.epochs_per_sec,
            result.samples_per_sec,
            result.final_loss
        )
        .unwrap();
    }

    println!("Results written to {}", filename);
}

fn main() {
    println!("deep-bsde Benchmark Suite");
    println!("=========================\n");

    let system_info = SystemInfo::gather();
    println!("System Information:");
    println!("  OS: {}", system_info.os);
    println!("  CPU Cores: {}", system_info.cpu_cores);
    println!("  Rust Version: {}", system_info.rust_version);
    println!("  Rayon Threads: {}", system_info.rayon_threads);
    println!();

    let mut all_results = run_sampling_benchmarks();
    all_results.extend(run_training_benchmarks());

    println!("\n{:=<88}", "");
    println!("BENCHMARK RESULTS");
    println!("{:=<88}", "");
    println!(
        "{:<30} {:>10} {:>8} {:>12} {:>12} {:>12}",
        "Benchmark", "Batch", "Epochs", "Time (ms)", "Samples/s", "Final Loss"
    );
    println!("{:-<88}", "");
    for result in &all_results {
        println!(
            "{:<30} {:>10} {:>8} {:>12.2} {:>12.0} {:>12.4e}",
            result.name,
            result.batch_size,
            result.epochs,
            result.time_ms,
            result.samples_per_sec,
            result.final_loss
        );
    }
    println!("{:=<88}", "");

    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let filename = format!("benchmark_results_{}.csv", timestamp);
    write_results_to_csv(&all_results, &system_info, &filename);

    println!("\nBenchmark complete!");
}
