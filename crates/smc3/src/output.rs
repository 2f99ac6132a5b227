use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use smc3_client::TelemetryEvent;
use smc3_frame::{Motor, Packet};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// Firmware reports its version times 100.
pub fn version_string(raw: u16) -> String {
    format!("{}.{:02}", raw / 100, raw % 100)
}

/// Gains are stored times 100.
pub fn scaled(raw: u16) -> f64 {
    f64::from(raw) / 100.0
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_table(header: Vec<&str>, rows: Vec<Vec<String>>) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
}

#[derive(Serialize)]
struct VersionOutput<'a> {
    device: &'a str,
    raw: u16,
    version: String,
}

pub fn print_version(device: &str, raw: u16, format: OutputFormat) {
    let out = VersionOutput {
        device,
        raw,
        version: version_string(raw),
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["DEVICE", "VERSION", "RAW"],
            vec![vec![out.device.to_string(), out.version, raw.to_string()]],
        ),
        OutputFormat::Pretty => println!("SMC3 Version: {}", out.version),
    }
}

#[derive(Serialize)]
struct PacketOutput {
    code: String,
    motor: String,
    parameter: String,
    values: Vec<u16>,
}

impl From<&Packet> for PacketOutput {
    fn from(packet: &Packet) -> Self {
        Self {
            code: packet.tag.escape_ascii().to_string(),
            motor: packet.motor.to_string(),
            parameter: packet.param.to_string(),
            values: packet.values.to_vec(),
        }
    }
}

pub fn print_packet(packet: &Packet, format: OutputFormat) {
    let out = PacketOutput::from(packet);
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["CODE", "MOTOR", "PARAMETER", "VALUES"],
            vec![vec![
                out.code,
                out.motor,
                out.parameter,
                packet.values.to_string(),
            ]],
        ),
        OutputFormat::Pretty => println!("{packet}"),
    }
}

/// Everything `status` reads from one motor.
#[derive(Debug, Serialize)]
pub struct MotorStatus {
    pub motor: String,
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub ks: f64,
    pub min_max: Vec<u16>,
    pub pwm_min_max: Vec<u16>,
    pub feedback_dead_zone: Vec<u16>,
    pub target: u16,
    pub feedback: u16,
    pub pwm: u16,
    pub status: u16,
}

#[derive(Debug, Serialize)]
pub struct StatusReport {
    pub device: String,
    pub version: String,
    pub motors: Vec<MotorStatus>,
}

fn pair(values: &[u16]) -> String {
    values
        .iter()
        .map(u16::to_string)
        .collect::<Vec<_>>()
        .join(" / ")
}

pub fn print_status(report: &StatusReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(report),
        OutputFormat::Table => {
            println!("SMC3 {} version {}", report.device, report.version);
            print_table(
                vec![
                    "MOTOR", "KP", "KI", "KD", "KS", "MIN/MAX", "PWM MIN/MAX", "FB DEAD ZONE",
                    "TARGET", "FEEDBACK", "PWM", "STATUS",
                ],
                report
                    .motors
                    .iter()
                    .map(|m| {
                        vec![
                            m.motor.clone(),
                            m.kp.to_string(),
                            m.ki.to_string(),
                            m.kd.to_string(),
                            m.ks.to_string(),
                            pair(&m.min_max),
                            pair(&m.pwm_min_max),
                            pair(&m.feedback_dead_zone),
                            m.target.to_string(),
                            m.feedback.to_string(),
                            m.pwm.to_string(),
                            m.status.to_string(),
                        ]
                    })
                    .collect(),
            );
        }
        OutputFormat::Pretty => {
            println!("SMC3 Version: {}", report.version);
            for m in &report.motors {
                println!("Motor {}", m.motor);
                println!("  Kp: {}", m.kp);
                println!("  Ki: {}", m.ki);
                println!("  Kd: {}", m.kd);
                println!("  Ks: {}", m.ks);
                println!("  MinMax: {:?}", m.min_max);
                println!("  PWMinMax: {:?}", m.pwm_min_max);
                println!("  FBDeadZone: {:?}", m.feedback_dead_zone);
                println!("  Position");
                println!("    target:   {}", m.target);
                println!("    feedback: {}", m.feedback);
                println!("  pwm:    {}", m.pwm);
                println!("  status: {}", m.status);
            }
        }
    }
}

#[derive(Serialize)]
struct TelemetryOutput {
    kind: &'static str,
    motor: String,
    values: [u8; 2],
    timestamp: String,
}

pub fn print_telemetry(event: &TelemetryEvent, format: OutputFormat) {
    let (kind, values) = match event {
        TelemetryEvent::Position(update) => ("position", [update.target, update.feedback]),
        TelemetryEvent::PwmStatus(update) => ("pwm_status", [update.pwm, update.status]),
    };
    let out = TelemetryOutput {
        kind,
        motor: event.motor().to_string(),
        values,
        timestamp: now_unix_millis(),
    };

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["MOTOR", "KIND", "VALUES"],
            vec![vec![
                out.motor,
                kind.to_string(),
                format!("{} {}", values[0], values[1]),
            ]],
        ),
        OutputFormat::Pretty => match event {
            TelemetryEvent::Position(update) => println!(
                "Motor {} target {} feedback {}",
                update.motor, update.target, update.feedback
            ),
            TelemetryEvent::PwmStatus(update) => println!(
                "Motor {} pwm {} status {}",
                update.motor, update.pwm, update.status
            ),
        },
    }
}

#[derive(Serialize)]
struct PositionOutput {
    motor: String,
    position: u16,
}

pub fn print_position(motor: Motor, position: u16, format: OutputFormat) {
    let out = PositionOutput {
        motor: motor.to_string(),
        position,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => print_table(
            vec!["MOTOR", "POSITION"],
            vec![vec![out.motor, position.to_string()]],
        ),
        OutputFormat::Pretty => println!("Motor {motor} position {position}"),
    }
}

#[derive(Serialize)]
struct MockOutput<'a> {
    port: &'a str,
    stubs: usize,
}

pub fn print_mock_port(port: &str, stubs: usize, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&MockOutput { port, stubs }),
        OutputFormat::Table => print_table(
            vec!["PORT", "STUBS"],
            vec![vec![port.to_string(), stubs.to_string()]],
        ),
        OutputFormat::Pretty => println!("{port}"),
    }
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_shown_in_hundredths() {
        assert_eq!(version_string(101), "1.01");
        assert_eq!(version_string(250), "2.50");
        assert_eq!(version_string(7), "0.07");
    }

    #[test]
    fn gains_are_scaled() {
        assert_eq!(scaled(400), 4.0);
        assert_eq!(scaled(1234), 12.34);
    }

    #[test]
    fn packets_serialize_with_names() {
        let packet = smc3_frame::parse_packet(b"[T\x14\xeb]").unwrap();
        let json = serde_json::to_value(PacketOutput::from(&packet)).unwrap();
        assert_eq!(json["code"], "T");
        assert_eq!(json["motor"], "B");
        assert_eq!(json["parameter"], "MinMax");
        assert_eq!(json["values"], serde_json::json!([20, 235]));
    }

    #[test]
    fn pairs_join_with_slash() {
        assert_eq!(pair(&[20, 235]), "20 / 235");
    }
}
