// demos/trajectory_demo.rs
use deep_bsde::equation::PureDiffusion;
use deep_bsde::output;
use deep_bsde::rng::NoiseSampler;
use deep_bsde::solver::{DeepBsde, RecordFlags, SolverOptions};

fn main() {
    env_logger::init();

    let num_time_interval = 10;
    let equation = PureDiffusion::new(2, num_time_interval, 1.0).expect("Valid equation");
    let sampler =
        NoiseSampler::new(2, num_time_interval, 0.1, 7).expect("Valid sampler configuration");

    let model = DeepBsde::new(equation, 0.5, SolverOptions::default())
        .expect("Valid solver configuration");

    let batch = sampler.sample_batch(128, 0).expect("Noise batch");
    let pass = model
        .forward(&batch, false, RecordFlags::TRAJECTORY)
        .expect("Forward pass");
    let trajectory = pass.trajectory.expect("Recording was requested");

    println!("deep-bsde recorded trajectory (batch means)");
    println!("===========================================");
    println!("{:>5} {:>8} {:>12} {:>24}", "step", "time", "value", "state");
    for i in 0..trajectory.times.len() {
        let state = trajectory.states[i]
            .iter()
            .map(|v| format!("{:>10.6}", v))
            .collect::<Vec<_>>()
            .join(" ");
        println!(
            "{:>5} {:>8.3} {:>12.6} {:>24}",
            i, trajectory.times[i], trajectory.values[i], state
        );
    }
    println!(
        "\n{} states, {} values, {} controls, {} times",
        trajectory.states.len(),
        trajectory.values.len(),
        trajectory.controls.len(),
        trajectory.times.len()
    );

    output::write_trajectory_to_csv("trajectory.csv", &trajectory)
        .expect("Could not write CSV");
    println!("Trajectory written to trajectory.csv");
}
