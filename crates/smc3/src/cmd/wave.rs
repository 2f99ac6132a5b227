use std::f64::consts::PI;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};

use smc3_frame::Motor;
use tracing::{info, warn};

use crate::cmd::{connect, install_ctrlc_handler, Session, WaveArgs, WavePattern};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{version_string, OutputFormat};

const STEP: Duration = Duration::from_millis(10);
const CENTER: f64 = 512.0;

pub async fn run(args: WaveArgs, session: &Session, _format: OutputFormat) -> CliResult<i32> {
    let running = install_ctrlc_handler()?;
    let controller = connect(&args.device, session, ())?;

    let version = controller
        .version()
        .await
        .map_err(|err| client_error("version read failed", err))?;
    info!(
        version = %version_string(version),
        pattern = ?args.pattern,
        scale = args.scale,
        "driving motors"
    );

    let feedback_motor = match args.pattern {
        WavePattern::Sine => args.motor,
        WavePattern::Rock | WavePattern::ThreePhase => Motor::A,
    };
    controller
        .enable_feedback(feedback_motor)
        .map_err(|err| client_error("enable feedback failed", err))?;

    let started = Instant::now();
    let mut outcome = Ok(SUCCESS);
    while running.load(Ordering::SeqCst) {
        let t = started.elapsed().as_secs_f64() * args.scale;
        let positions = wave_positions(args.pattern, args.motor, args.sideways, t);
        if let Some(err) = positions
            .into_iter()
            .map(|(motor, position)| controller.set_position(motor, position))
            .find_map(Result::err)
        {
            outcome = Err(client_error("set position failed", err));
            break;
        }
        tokio::time::sleep(STEP).await;
    }

    if let Err(err) = controller.disable_feedback() {
        warn!(error = %err, "disable feedback failed");
    }
    outcome
}

/// Positions for every driven motor at time `t` (seconds, already scaled).
pub fn wave_positions(
    pattern: WavePattern,
    motor: Motor,
    sideways: bool,
    t: f64,
) -> Vec<(Motor, u16)> {
    match pattern {
        WavePattern::Sine => vec![(motor, position_at(t))],
        WavePattern::Rock => {
            let a = position_at(t);
            let b = if sideways { a } else { 1024 - a };
            vec![(Motor::A, a), (Motor::B, b)]
        }
        WavePattern::ThreePhase => vec![
            (Motor::A, position_at(t)),
            (Motor::B, position_at(t + PI / 3.0 * 2.0)),
            (Motor::C, position_at(t + PI / 3.0 * 4.0)),
        ],
    }
}

fn position_at(t: f64) -> u16 {
    // sin() spans [-1, 1], so this lands in 0..=1024.
    (t.sin() * CENTER + CENTER).round().clamp(0.0, 1024.0) as u16
}
