// demos/train_merton.rs
use deep_bsde::analytics::merton_analytic;
use deep_bsde::equation::{Equation, MertonMarket, MertonParams};
use deep_bsde::output;
use deep_bsde::rng::NoiseSampler;
use deep_bsde::solver::{DeepBsde, SolverOptions};
use deep_bsde::train::{Trainer, TrainerOptions};

fn main() {
    env_logger::init();

    let params = MertonParams::default();
    let market = MertonMarket::new(params.clone()).expect("Valid market parameters");

    let target = merton_analytic::target_wealth(params.w0, params.psi, params.total_time);
    let y0_star = merton_analytic::replication_cost(target, params.r, params.total_time);

    println!("deep-bsde Merton terminal-wealth tracking");
    println!("=========================================");
    println!("Assets: {}  Intervals: {}  T: {}", market.dim(), market.num_time_interval(), params.total_time);
    println!("Terminal target c: {:.6}", target);
    println!("Analytic replication cost y0*: {:.6}", y0_star);
    println!(
        "Merton fraction (asset 0, gamma=3): {:.4}",
        merton_analytic::merton_fraction(params.mu[0], params.r, params.sigma[0], 3.0)
    );
    println!();

    let sampler = NoiseSampler::new(
        market.dim(),
        market.num_time_interval(),
        market.delta_t(),
        42,
    )
    .expect("Valid sampler configuration");

    let train_ds = sampler
        .sample_dataset(8, 256, 0)
        .expect("Training batches");
    let test_ds = sampler
        .sample_dataset(2, 256, 1_000)
        .expect("Test batches");

    let model = DeepBsde::new(market, params.w0, SolverOptions::default())
        .expect("Valid solver configuration");
    let mut trainer = Trainer::new(model, TrainerOptions::default()).expect("Valid trainer");

    let history = trainer.fit(&train_ds, &test_ds, 100).expect("Training run");

    println!();
    println!("Epochs run: {}", history.len());
    if let (Some(y0), Some(loss)) = (history.final_y0(), history.final_loss()) {
        println!("Learned y0: {:.6} (analytic {:.6})", y0, y0_star);
        println!("Final test loss: {:.6e}", loss);
        println!("Absolute y0 error: {:.6}", (y0 as f64 - y0_star).abs());
    }

    output::write_history_to_csv("merton_history.csv", &history).expect("Could not write CSV");
    println!("Run history written to merton_history.csv");
}
