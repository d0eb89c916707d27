// tests/solver_test.rs
use candle_core::IndexOp;
use deep_bsde::equation::PureDiffusion;
use deep_bsde::error::BsdeError;
use deep_bsde::rng::NoiseSampler;
use deep_bsde::solver::{DeepBsde, RecordFlags, SolverOptions};
use ndarray::Array2;

fn diffusion_model(
    dimx: usize,
    num_time_interval: usize,
    y0: f64,
    options: SolverOptions,
) -> DeepBsde<PureDiffusion> {
    let equation = PureDiffusion::new(dimx, num_time_interval, 1.0).expect("valid equation");
    DeepBsde::new(equation, y0, options).expect("valid solver configuration")
}

fn noise_batch(dimx: usize, num_time_interval: usize, batch: usize, seed: u64) -> Array2<f32> {
    let delta_t = 1.0 / num_time_interval as f64;
    let sampler = NoiseSampler::new(dimx, num_time_interval, delta_t, seed).unwrap();
    sampler.sample_batch(batch, 0).unwrap()
}

#[test]
fn test_trajectory_length_invariant() {
    for &n in &[1usize, 2, 5, 13] {
        let model = diffusion_model(2, n, 0.3, SolverOptions::default());
        let batch = noise_batch(2, n, 32, 42);

        let pass = model
            .forward(&batch, false, RecordFlags::TRAJECTORY)
            .unwrap();
        let traj = pass.trajectory.expect("recording requested");

        assert_eq!(traj.states.len(), n + 1, "states for N = {}", n);
        assert_eq!(traj.values.len(), n + 1, "values for N = {}", n);
        assert_eq!(traj.times.len(), n + 1, "times for N = {}", n);
        assert_eq!(traj.controls.len(), n, "controls for N = {}", n);
        assert_eq!(traj.policies.len(), n, "policies for N = {}", n);

        assert_eq!(traj.times[0], 0.0);
        assert!((traj.times[n] - 1.0).abs() < 1e-6);
    }
}

#[test]
fn test_partial_record_flags() {
    let model = diffusion_model(1, 3, 0.0, SolverOptions::default());
    let batch = noise_batch(1, 3, 8, 1);

    let pass = model
        .forward(&batch, false, RecordFlags::VALUE | RecordFlags::TIME)
        .unwrap();
    let traj = pass.trajectory.expect("recording requested");
    assert_eq!(traj.values.len(), 4);
    assert_eq!(traj.times.len(), 4);
    assert!(traj.states.is_empty());
    assert!(traj.controls.is_empty());

    let pass = model.forward(&batch, false, RecordFlags::NONE).unwrap();
    assert!(pass.trajectory.is_none());
}

#[test]
fn test_terminal_determinism() {
    let model = diffusion_model(3, 6, 0.8, SolverOptions::default());
    let batch = noise_batch(3, 6, 64, 99);

    let a = model.forward(&batch, false, RecordFlags::NONE).unwrap();
    let b = model.forward(&batch, false, RecordFlags::NONE).unwrap();

    let value_a = a.value.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    let value_b = b.value.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    let state_a = a.state.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    let state_b = b.state.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    let control_a = a.control.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    let control_b = b.control.flatten_all().unwrap().to_vec1::<f32>().unwrap();

    assert_eq!(value_a, value_b);
    assert_eq!(state_a, state_b);
    assert_eq!(control_a, control_b);
}

#[test]
fn test_coupled_z0_snapshot_written_each_pass() {
    let options = SolverOptions {
        separate_z0: false,
        ..SolverOptions::default()
    };
    let model = diffusion_model(2, 4, 0.1, options);
    let batch = noise_batch(2, 4, 5, 3);

    assert_eq!(model.z0_value().unwrap(), vec![0.0, 0.0]);
    model.forward(&batch, false, RecordFlags::NONE).unwrap();

    let snapshot = model.z0_value().unwrap();
    assert_eq!(snapshot.len(), model.dimz());
    assert!(
        snapshot.iter().any(|&v| v != 0.0),
        "the zero-time control overwrites the parameter slot"
    );

    model.forward(&batch, false, RecordFlags::NONE).unwrap();
    assert_eq!(model.z0_value().unwrap(), snapshot);
}

#[test]
fn test_coupled_z0_snapshot_matches_returned_control_single_interval() {
    // With N = 1 no further control is computed, so the control returned by
    // the forward pass is the zero-time batch itself.
    let options = SolverOptions {
        separate_z0: false,
        ..SolverOptions::default()
    };
    let model = diffusion_model(2, 1, 0.1, options);
    let batch = noise_batch(2, 1, 4, 8);

    let pass = model.forward(&batch, false, RecordFlags::NONE).unwrap();
    let first_row = pass
        .control
        .i(0..1)
        .unwrap()
        .flatten_all()
        .unwrap()
        .to_vec1::<f32>()
        .unwrap();
    let snapshot = model.z0_value().unwrap();
    assert_eq!(snapshot, first_row);
}

#[test]
fn test_single_interval_keeps_initial_control() {
    // Separate mode, N = 1: the initial control parameter (zeros) is never
    // recomputed, and only one value step executes.
    let model = diffusion_model(1, 1, 0.25, SolverOptions::default());
    let batch = noise_batch(1, 1, 16, 5);

    let pass = model
        .forward(&batch, false, RecordFlags::TRAJECTORY)
        .unwrap();
    let traj = pass.trajectory.unwrap();

    assert_eq!(traj.controls.len(), 1);
    assert_eq!(traj.controls[0], vec![0.0]);
    let control = pass.control.flatten_all().unwrap().to_vec1::<f32>().unwrap();
    assert!(control.iter().all(|&v| v == 0.0));

    // z0 = 0 means the value never moves: y_1 = y_0 exactly.
    for v in pass.value.flatten_all().unwrap().to_vec1::<f32>().unwrap() {
        assert_eq!(v, 0.25);
    }
}

#[test]
fn test_zero_noise_terminal_value_is_initial_value() {
    // dimx = 1, N = 2, x0 = 0, y0 = 0, zero increments: the value update
    // y + z·dw never moves, so the terminal value is exactly 0.0 no matter
    // what the control network outputs.
    let model = diffusion_model(1, 2, 0.0, SolverOptions::default());
    let batch = Array2::<f32>::zeros((8, 2));

    let pass = model.forward(&batch, false, RecordFlags::NONE).unwrap();
    for v in pass.value.flatten_all().unwrap().to_vec1::<f32>().unwrap() {
        assert_eq!(v, 0.0);
    }
}

#[test]
fn test_shape_mismatch_is_reported() {
    let model = diffusion_model(2, 5, 0.0, SolverOptions::default());
    // Expected width is 2 * 5 = 10; hand a 7-column batch instead.
    let batch = Array2::<f32>::zeros((4, 7));

    let err = model
        .forward(&batch, false, RecordFlags::NONE)
        .err()
        .expect("malformed noise batch must fail");
    match err {
        BsdeError::ShapeMismatch { context, .. } => {
            assert_eq!(context, "noise sample");
        }
        other => panic!("expected ShapeMismatch, got {}", other),
    }
}

#[test]
fn test_trainable_parameter_sets_per_mode() {
    let separate = diffusion_model(2, 3, 0.0, SolverOptions::default());
    let coupled = diffusion_model(
        2,
        3,
        0.0,
        SolverOptions {
            separate_z0: false,
            ..SolverOptions::default()
        },
    );

    // Coupled mode removes exactly one trainable parameter: z0.
    assert_eq!(
        separate.trainable_vars().len(),
        coupled.trainable_vars().len() + 1
    );
}
