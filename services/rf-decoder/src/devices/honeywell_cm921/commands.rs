//! Command interpretation
//!
//! Each known command accepts a fixed set of payload lengths. A command not
//! in the table, or a known one with an unexpected length, is reported as
//! `unknown` with the raw command code.

use super::message::Message;
use super::NAME;
use crate::decoder::DecodeContext;
use crate::reading::Reading;

type Interpret = fn(&[u8], &mut Reading, &DecodeContext<'_>);

/// One row of the command table
pub struct CommandSpec {
    pub code: u16,
    pub name: &'static str,
    pub payload_lengths: &'static [usize],
    interpret: Interpret,
}

/// Result of looking a message up in the table
pub enum Command {
    Known(&'static CommandSpec),
    Unknown(u16),
}

static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        code: 0x1030,
        name: "mix_valve_params",
        payload_lengths: &[16],
        interpret: mix_valve_params,
    },
    CommandSpec {
        code: 0x313F,
        name: "datetime",
        payload_lengths: &[1, 9],
        interpret: datetime,
    },
    CommandSpec {
        code: 0x0008,
        name: "relay_demand",
        payload_lengths: &[2],
        interpret: relay_demand,
    },
    CommandSpec {
        code: 0x3EF0,
        name: "actuator_state",
        payload_lengths: &[3, 6],
        interpret: actuator_state,
    },
    CommandSpec {
        code: 0x2309,
        name: "setpoint",
        payload_lengths: &[3],
        interpret: setpoint,
    },
    CommandSpec {
        code: 0x1100,
        name: "boiler_relay_info",
        payload_lengths: &[5, 8],
        interpret: boiler_relay_info,
    },
    CommandSpec {
        code: 0x0009,
        name: "relay_failsafe",
        payload_lengths: &[3],
        interpret: relay_failsafe,
    },
    CommandSpec {
        code: 0x3B00,
        name: "actuator_sync",
        payload_lengths: &[2],
        interpret: actuator_sync,
    },
];

/// Match a command code and payload length against the table
pub fn lookup(code: u16, payload_len: usize) -> Command {
    COMMANDS
        .iter()
        .find(|c| c.code == code && c.payload_lengths.contains(&payload_len))
        .map_or(Command::Unknown(code), Command::Known)
}

/// Append the fields for a message's command to `reading`
pub fn interpret(message: &Message, reading: &mut Reading, ctx: &DecodeContext<'_>) {
    match lookup(message.command, message.payload.len()) {
        Command::Known(spec) => {
            ctx.report(
                NAME,
                format_args!("command {:04x} ({})", spec.code, spec.name),
            );
            (spec.interpret)(&message.payload, reading, ctx);
        }
        Command::Unknown(code) => {
            reading.push_fmt("unknown", "", "%04x", code);
        }
    }
}

fn mix_valve_params(p: &[u8], reading: &mut Reading, ctx: &DecodeContext<'_>) {
    reading.push_fmt("zone_idx", "", "%02x", p[0]);
    for param in p[1..].chunks_exact(3) {
        let value = param[2];
        match param[0] {
            0xC8 => reading.push("max_flow_temp", "", value),
            0xC9 => reading.push("pump_run_time", "", value),
            0xCA => reading.push("actuator_run_time", "", value),
            0xCB => reading.push("min_flow_temp", "", value),
            0xCC => {}
            other => ctx.report(
                NAME,
                format_args!("unknown parameter to 1030: {:02x}={}", other, value),
            ),
        }
    }
}

fn datetime(p: &[u8], reading: &mut Reading, _ctx: &DecodeContext<'_>) {
    if p.len() == 1 {
        reading.push("time_request", "", p[0]);
        return;
    }
    let (second, minute, hour) = (p[2], p[3], p[4] & 0x1F);
    let (day, month) = (p[5], p[6]);
    let year = u16::from_be_bytes([p[7], p[8]]);
    reading.push(
        "time",
        "",
        format!(
            "{:02}:{:02}:{:02} {:02}-{:02}-{:04}",
            hour, minute, second, day, month, year
        ),
    );
}

fn relay_demand(p: &[u8], reading: &mut Reading, _ctx: &DecodeContext<'_>) {
    reading.push("domain_id", "", p[0]);
    reading.push("demand", "", f64::from(p[1]) / 200.0);
}

fn actuator_state(p: &[u8], reading: &mut Reading, _ctx: &DecodeContext<'_>) {
    if p.len() == 3 {
        reading.push("status", "", f64::from(p[1]) / 200.0);
    } else {
        reading.push("boiler_modulation_level", "", f64::from(p[1]) / 200.0);
        reading.push("flame_status", "", p[3]);
    }
}

fn setpoint(p: &[u8], reading: &mut Reading, _ctx: &DecodeContext<'_>) {
    reading.push("zone", "", p[0]);
    reading.push(
        "setpoint",
        "",
        f64::from(u16::from_be_bytes([p[1], p[2]])) / 100.0,
    );
}

fn boiler_relay_info(p: &[u8], reading: &mut Reading, _ctx: &DecodeContext<'_>) {
    reading.push("domain_id", "", p[0]);
    reading.push("cycle_rate", "", f64::from(p[1]) / 4.0);
    reading.push("minimum_on_time", "", f64::from(p[2]) / 4.0);
    reading.push("minimum_off_time", "", f64::from(p[3]) / 4.0);
    if p.len() == 8 {
        reading.push(
            "proportional_band_width",
            "",
            f64::from(u16::from_be_bytes([p[5], p[6]])) / 100.0,
        );
    }
}

fn relay_failsafe(p: &[u8], reading: &mut Reading, _ctx: &DecodeContext<'_>) {
    reading.push("device_number", "", p[0]);
    let mode = match p[1] {
        0 => "off",
        1 => "20-80",
        _ => "unknown",
    };
    reading.push("failsafe_mode", "", mode);
}

fn actuator_sync(p: &[u8], reading: &mut Reading, _ctx: &DecodeContext<'_>) {
    reading.push("domain_id", "", p[0]);
    reading.push("state", "", f64::from(p[1]) / 200.0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoder::testing::Recorder;
    use crate::decoder::DecodeMode;
    use crate::reading::FieldValue;

    fn message(command: u16, payload: &[u8]) -> Message {
        Message {
            header: 0x00,
            device_ids: Vec::new(),
            command,
            payload: payload.to_vec(),
            unparsed: Vec::new(),
            checksum: 0,
        }
    }

    fn run(command: u16, payload: &[u8]) -> Reading {
        let mut reading = Reading::new("Honeywell CM921");
        interpret(&message(command, payload), &mut reading, &DecodeContext::default());
        reading
    }

    #[test]
    fn test_setpoint() {
        let reading = run(0x2309, &[0x01, 0x09, 0xC4]);
        assert_eq!(reading.get("zone"), Some(&FieldValue::UInt(1)));
        assert_eq!(reading.get("setpoint"), Some(&FieldValue::Float(25.0)));
    }

    #[test]
    fn test_wrong_length_is_unknown() {
        let reading = run(0x2309, &[0x01, 0x09]);
        assert!(!reading.contains("zone"));
        let field = reading.fields().last().unwrap();
        assert_eq!(field.key, "unknown");
        assert_eq!(field.render(), "2309");
    }

    #[test]
    fn test_unlisted_command_is_unknown() {
        let reading = run(0x0004, &[]);
        assert_eq!(reading.fields().last().unwrap().render(), "0004");
    }

    #[test]
    fn test_datetime() {
        let reading = run(0x313F, &[0x00, 0xFC, 0x1E, 0x2D, 0x6E, 0x0F, 0x03, 0x07, 0xE4]);
        assert_eq!(
            reading.get("time"),
            Some(&FieldValue::Text("14:45:30 15-03-2020".to_string()))
        );

        let reading = run(0x313F, &[0x00]);
        assert_eq!(reading.get("time_request"), Some(&FieldValue::UInt(0)));
    }

    #[test]
    fn test_demand_and_state() {
        let reading = run(0x0008, &[0xFC, 0xC8]);
        assert_eq!(reading.get("domain_id"), Some(&FieldValue::UInt(0xFC)));
        assert_eq!(reading.get("demand"), Some(&FieldValue::Float(1.0)));

        let reading = run(0x3B00, &[0xFC, 0x64]);
        assert_eq!(reading.get("state"), Some(&FieldValue::Float(0.5)));
    }

    #[test]
    fn test_actuator_state_lengths() {
        let reading = run(0x3EF0, &[0x00, 0xC8, 0xFF]);
        assert_eq!(reading.get("status"), Some(&FieldValue::Float(1.0)));

        let reading = run(0x3EF0, &[0x00, 0x64, 0x10, 0x0A, 0x00, 0x00]);
        assert_eq!(
            reading.get("boiler_modulation_level"),
            Some(&FieldValue::Float(0.5))
        );
        assert_eq!(reading.get("flame_status"), Some(&FieldValue::UInt(10)));
    }

    #[test]
    fn test_boiler_relay_info() {
        let reading = run(0x1100, &[0xFC, 0x18, 0x04, 0x10, 0x00]);
        assert_eq!(reading.get("cycle_rate"), Some(&FieldValue::Float(6.0)));
        assert_eq!(reading.get("minimum_on_time"), Some(&FieldValue::Float(1.0)));
        assert_eq!(reading.get("minimum_off_time"), Some(&FieldValue::Float(4.0)));
        assert!(!reading.contains("proportional_band_width"));

        let reading = run(0x1100, &[0xFC, 0x18, 0x04, 0x10, 0x00, 0x01, 0xF4, 0x01]);
        assert_eq!(
            reading.get("proportional_band_width"),
            Some(&FieldValue::Float(5.0))
        );
    }

    #[test]
    fn test_relay_failsafe() {
        let reading = run(0x0009, &[0x00, 0x01, 0x00]);
        assert_eq!(reading.get("failsafe_mode"), Some(&FieldValue::from("20-80")));
        let reading = run(0x0009, &[0x00, 0x07, 0x00]);
        assert_eq!(reading.get("failsafe_mode"), Some(&FieldValue::from("unknown")));
    }

    #[test]
    fn test_mix_valve_params() {
        let payload = [
            0x01, 0xC8, 0x01, 0x41, 0xC9, 0x01, 0x0F, 0xCA, 0x01, 0x8C, 0xCB, 0x01, 0x14, 0xD0,
            0x01, 0x07,
        ];
        let recorder = Recorder::default();
        let ctx = DecodeContext::new(&recorder, DecodeMode::Strict);
        let mut reading = Reading::new("Honeywell CM921");
        interpret(&message(0x1030, &payload), &mut reading, &ctx);

        assert_eq!(reading.fields()[1].render(), "01");
        assert_eq!(reading.get("max_flow_temp"), Some(&FieldValue::UInt(65)));
        assert_eq!(reading.get("pump_run_time"), Some(&FieldValue::UInt(15)));
        assert_eq!(reading.get("actuator_run_time"), Some(&FieldValue::UInt(140)));
        assert_eq!(reading.get("min_flow_temp"), Some(&FieldValue::UInt(20)));
        assert!(recorder.contains("unknown parameter to 1030: d0=7"));
        assert!(recorder.contains("command 1030 (mix_valve_params)"));
    }
}
