use smc3_client::{Controller, Result};
use smc3_frame::{Motor, Parameter};

use crate::cmd::{connect, DeviceArgs, Session};
use crate::exit::{client_error, CliResult, SUCCESS};
use crate::output::{
    print_status, scaled, version_string, MotorStatus, OutputFormat, StatusReport,
};

pub async fn run(args: DeviceArgs, session: &Session, format: OutputFormat) -> CliResult<i32> {
    let controller = connect(&args.device, session, ())?;

    let version = controller
        .version()
        .await
        .map_err(|err| client_error("version read failed", err))?;

    let mut motors = Vec::with_capacity(Motor::ALL.len());
    for motor in Motor::ALL {
        let status = read_motor(&controller, motor)
            .await
            .map_err(|err| client_error(&format!("motor {motor} read failed"), err))?;
        motors.push(status);
    }

    let report = StatusReport {
        device: args.device,
        version: version_string(version),
        motors,
    };
    print_status(&report, format);
    Ok(SUCCESS)
}

async fn read_motor(controller: &Controller, motor: Motor) -> Result<MotorStatus> {
    let kp = controller.read_param(motor, Parameter::Kp).await?.as_u16();
    let ki = controller.read_param(motor, Parameter::Ki).await?.as_u16();
    let kd = controller.read_param(motor, Parameter::Kd).await?.as_u16();
    let ks = controller.read_param(motor, Parameter::Ks).await?.as_u16();
    let min_max = controller.read_param(motor, Parameter::MinMax).await?;
    let pwm_min_max = controller.read_param(motor, Parameter::PwmMinMax).await?;
    let dead_zone = controller
        .read_param(motor, Parameter::FeedbackDeadZone)
        .await?;
    let (target, feedback) = controller
        .read_param(motor, Parameter::Position)
        .await?
        .as_pair();
    let (pwm, status) = controller
        .read_param(motor, Parameter::PwmStatus)
        .await?
        .as_pair();

    Ok(MotorStatus {
        motor: motor.to_string(),
        kp: scaled(kp),
        ki: scaled(ki),
        kd: scaled(kd),
        ks: scaled(ks),
        min_max: min_max.to_vec(),
        pwm_min_max: pwm_min_max.to_vec(),
        feedback_dead_zone: dead_zone.to_vec(),
        target,
        feedback,
        pwm,
        status,
    })
}
