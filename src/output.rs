// src/output.rs
use crate::solver::Trajectory;
use crate::train::RunHistory;
use std::fs::File;
use std::io::{self, Write};

fn join_components(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| format!("{}", v))
        .collect::<Vec<_>>()
        .join(";")
}

/// Write a run history to CSV: static parameters as comment lines, one data
/// row per epoch. Vector-valued columns are semicolon-joined.
pub fn write_history_to_csv(filename: &str, history: &RunHistory) -> io::Result<()> {
    let mut file = File::create(filename)?;
    writeln!(file, "# deep-bsde run history")?;
    writeln!(
        file,
        "# Started: {}",
        history.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    )?;
    writeln!(file, "# x0: {}", join_components(&history.x0))?;
    writeln!(file, "# T: {}", history.total_time)?;
    writeln!(file, "# N: {}", history.num_time_interval)?;
    writeln!(file, "# psi: {}", history.psi)?;
    writeln!(file, "# gamma: {}", history.gamma)?;
    writeln!(file, "epoch,elapsed_secs,y0,z0,test_loss,lr")?;
    for record in &history.epochs {
        writeln!(
            file,
            "{},{:.3},{},{},{},{}",
            record.epoch,
            record.elapsed_secs,
            record.y0,
            join_components(&record.z0),
            record.test_loss,
            record.learning_rate
        )?;
    }
    Ok(())
}

/// Write a recorded trajectory to CSV, one row per time index.
///
/// Controls and policies are one entry shorter than states and times; their
/// trailing cells are left empty.
pub fn write_trajectory_to_csv(filename: &str, trajectory: &Trajectory) -> io::Result<()> {
    let mut file = File::create(filename)?;
    writeln!(file, "step,time,value,state,control,pi")?;
    let steps = trajectory
        .times
        .len()
        .max(trajectory.states.len())
        .max(trajectory.values.len());
    for i in 0..steps {
        let time = trajectory
            .times
            .get(i)
            .map(|t| format!("{}", t))
            .unwrap_or_default();
        let value = trajectory
            .values
            .get(i)
            .map(|v| format!("{}", v))
            .unwrap_or_default();
        let state = trajectory
            .states
            .get(i)
            .map(|s| join_components(s))
            .unwrap_or_default();
        let control = trajectory
            .controls
            .get(i)
            .map(|c| join_components(c))
            .unwrap_or_default();
        let pi = trajectory
            .policies
            .get(i)
            .map(|p| join_components(p))
            .unwrap_or_default();
        writeln!(file, "{},{},{},{},{},{}", i, time, value, state, control, pi)?;
    }
    Ok(())
}
