//! Novation Launchpad driver over MIDI (`midir`), programmer mode.
//!
//! Addressing in programmer mode:
//! - row 0 (the top control row) is CC `91 + x`
//! - rows 1..=8 are notes `(9 - y) * 10 + x + 1`, i.e. 81..88 at the top down
//!   to 11..18 at the bottom
//!
//! LEDs are driven with the "LED lighting" SysEx (`F0 00 20 29 02 <dev> 03 ... F7`),
//! one batch per flush.

#![allow(missing_docs)]

use crossbeam_channel::Sender;
use midir::{Ignore, MidiInput, MidiInputConnection, MidiOutput, MidiOutputConnection};

use crate::core::errors::{DashpadError, Result};
use crate::surface::canvas::Canvas;
use crate::surface::grid::{ButtonEvent, GRID_COLUMNS, GridPos, GridSurface, Layer, PixelStyle};

const CLIENT_NAME: &str = "dashpad";
const SYSEX_HEADER: [u8; 5] = [0xF0, 0x00, 0x20, 0x29, 0x02];
const SYSEX_END: u8 = 0xF7;
const CMD_LED_LIGHTING: u8 = 0x03;
const CMD_PROGRAMMER_MODE: u8 = 0x0E;
/// The device accepts at most 81 LED specs per SysEx message.
const MAX_SPECS_PER_MESSAGE: usize = 81;
const TOP_ROW_FIRST_CC: u8 = 91;

// ──────────────────── models ────────────────────

/// Supported controllers. Both share the 8×8 pad grid plus a top CC row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LaunchpadModel {
    MiniMk3,
    X,
}

impl LaunchpadModel {
    /// Guess the model from a MIDI port name.
    #[must_use]
    pub fn from_port_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("lpminimk3") || lower.contains("launchpad mini mk3") {
            Some(Self::MiniMk3)
        } else if lower.contains("lpx") || lower.contains("launchpad x") {
            Some(Self::X)
        } else {
            None
        }
    }

    const fn device_id(self) -> u8 {
        match self {
            Self::MiniMk3 => 0x0D,
            Self::X => 0x0C,
        }
    }
}

// ──────────────────── addressing ────────────────────

/// LED / message index of a grid cell.
#[must_use]
pub const fn led_index(pos: GridPos) -> u8 {
    if pos.y == 0 {
        TOP_ROW_FIRST_CC + pos.x
    } else {
        (9 - pos.y) * 10 + pos.x + 1
    }
}

/// Decode an incoming short message into a button event.
///
/// Note-on with velocity 0, note-off, and CC value 0 are releases. Pads
/// outside the 8×9 grid (the right-hand scene column, the logo) are ignored.
#[must_use]
pub fn decode_message(message: &[u8]) -> Option<ButtonEvent> {
    let &[status, number, value] = message else {
        return None;
    };
    let pos = match status & 0xF0 {
        0x80 | 0x90 => pad_from_note(number)?,
        0xB0 => top_row_from_cc(number)?,
        _ => return None,
    };
    let pressed = status & 0xF0 != 0x80 && value > 0;
    Some(if pressed {
        ButtonEvent::Down(pos)
    } else {
        ButtonEvent::Up(pos)
    })
}

fn pad_from_note(note: u8) -> Option<GridPos> {
    let row = note / 10;
    let column = note % 10;
    if !(1..=8).contains(&row) || !(1..=GRID_COLUMNS).contains(&column) {
        return None;
    }
    GridPos::new(column - 1, 9 - row)
}

fn top_row_from_cc(cc: u8) -> Option<GridPos> {
    cc.checked_sub(TOP_ROW_FIRST_CC)
        .and_then(|x| GridPos::new(x, 0))
}

// ──────────────────── SysEx encoding ────────────────────

fn led_spec(pos: GridPos, style: PixelStyle) -> Vec<u8> {
    let index = led_index(pos);
    match style {
        PixelStyle::Off => vec![0, index, 0],
        PixelStyle::Palette { color } => vec![0, index, color],
        PixelStyle::Flash { color } => vec![1, index, 0, color],
        PixelStyle::Pulse { color } => vec![2, index, color],
        PixelStyle::Rgb { r, g, b } => vec![3, index, r, g, b],
    }
}

/// Encode LED updates as one or more SysEx messages.
#[must_use]
pub fn encode_led_batch(model: LaunchpadModel, cells: &[(GridPos, PixelStyle)]) -> Vec<Vec<u8>> {
    cells
        .chunks(MAX_SPECS_PER_MESSAGE)
        .map(|chunk| {
            let mut message = sysex_prefix(model, CMD_LED_LIGHTING);
            for (pos, style) in chunk {
                message.extend(led_spec(*pos, *style));
            }
            message.push(SYSEX_END);
            message
        })
        .collect()
}

fn programmer_mode_message(model: LaunchpadModel, enabled: bool) -> Vec<u8> {
    let mut message = sysex_prefix(model, CMD_PROGRAMMER_MODE);
    message.push(u8::from(enabled));
    message.push(SYSEX_END);
    message
}

fn sysex_prefix(model: LaunchpadModel, command: u8) -> Vec<u8> {
    let mut message = SYSEX_HEADER.to_vec();
    message.push(model.device_id());
    message.push(command);
    message
}

// ──────────────────── port discovery ────────────────────

/// Names of the MIDI ports currently visible.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PortListing {
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
}

pub fn list_ports() -> Result<PortListing> {
    let input = MidiInput::new(CLIENT_NAME).map_err(midi_err)?;
    let output = MidiOutput::new(CLIENT_NAME).map_err(midi_err)?;
    Ok(PortListing {
        inputs: input
            .ports()
            .iter()
            .filter_map(|p| input.port_name(p).ok())
            .collect(),
        outputs: output
            .ports()
            .iter()
            .filter_map(|p| output.port_name(p).ok())
            .collect(),
    })
}

/// Pick the port to use among `names`.
///
/// With a hint, the first name containing it (case-insensitive) wins.
/// Without one, the first recognised Launchpad port wins, preferring the
/// MIDI interface over the DAW interface the devices also expose.
#[must_use]
pub fn select_port(names: &[String], hint: Option<&str>) -> Option<usize> {
    if let Some(hint) = hint {
        let hint = hint.to_ascii_lowercase();
        return names
            .iter()
            .position(|name| name.to_ascii_lowercase().contains(&hint));
    }
    let candidates: Vec<usize> = names
        .iter()
        .enumerate()
        .filter(|(_, name)| LaunchpadModel::from_port_name(name).is_some())
        .map(|(i, _)| i)
        .collect();
    candidates
        .iter()
        .copied()
        .find(|&i| is_midi_interface(&names[i]))
        .or_else(|| candidates.first().copied())
}

fn is_midi_interface(name: &str) -> bool {
    name.split_whitespace()
        .any(|token| token.eq_ignore_ascii_case("mi") || token.eq_ignore_ascii_case("midi"))
}

// ──────────────────── connected device ────────────────────

/// Output half of a connected Launchpad.
pub struct LaunchpadSurface {
    connection: MidiOutputConnection,
    model: LaunchpadModel,
    canvas: Canvas,
}

impl LaunchpadSurface {
    #[must_use]
    pub const fn model(&self) -> LaunchpadModel {
        self.model
    }

    fn send(&mut self, message: &[u8]) -> Result<()> {
        self.connection.send(message).map_err(midi_err)
    }
}

impl GridSurface for LaunchpadSurface {
    fn set_pixel(&mut self, layer: Layer, pos: GridPos, style: PixelStyle) {
        self.canvas.set(layer, pos, style);
    }

    fn clear_layer(&mut self, layer: Layer) {
        self.canvas.clear(layer);
    }

    fn flush(&mut self, layer: Layer) -> Result<()> {
        let dirty = self.canvas.take_dirty(layer);
        if dirty.is_empty() {
            return Ok(());
        }
        for message in encode_led_batch(self.model, &dirty) {
            if let Err(e) = self.send(&message) {
                // Unknown device state after a partial write: resend everything next time.
                self.canvas.invalidate();
                return Err(e);
            }
        }
        Ok(())
    }
}

impl Drop for LaunchpadSurface {
    fn drop(&mut self) {
        let blank: Vec<(GridPos, PixelStyle)> =
            GridPos::all().map(|pos| (pos, PixelStyle::Off)).collect();
        for message in encode_led_batch(self.model, &blank) {
            let _ = self.connection.send(&message);
        }
        let _ = self
            .connection
            .send(&programmer_mode_message(self.model, false));
    }
}

/// Input half of a connected Launchpad. Events flow until this is dropped.
pub struct LaunchpadInput {
    _connection: MidiInputConnection<()>,
}

/// Both halves of a connected device.
pub struct Launchpad {
    pub surface: LaunchpadSurface,
    pub input: LaunchpadInput,
    pub port_name: String,
}

/// Find and open a Launchpad, switch it to programmer mode, and start
/// forwarding button events into `events`.
///
/// Failing to find a device is fatal for the caller; there is no retry.
pub fn connect(hint: Option<&str>, events: Sender<ButtonEvent>) -> Result<Launchpad> {
    let output = MidiOutput::new(CLIENT_NAME).map_err(midi_err)?;
    let out_ports = output.ports();
    let out_names: Vec<String> = out_ports
        .iter()
        .map(|p| output.port_name(p).unwrap_or_default())
        .collect();
    let out_index = select_port(&out_names, hint).ok_or_else(|| not_found(hint, &out_names))?;
    let port_name = out_names[out_index].clone();
    let model = LaunchpadModel::from_port_name(&port_name).unwrap_or(LaunchpadModel::MiniMk3);

    let mut input = MidiInput::new(CLIENT_NAME).map_err(midi_err)?;
    input.ignore(Ignore::All);
    let in_ports = input.ports();
    let in_names: Vec<String> = in_ports
        .iter()
        .map(|p| input.port_name(p).unwrap_or_default())
        .collect();
    let in_index = hint
        .and_then(|h| select_port(&in_names, Some(h)))
        .or_else(|| select_port(&in_names, None))
        .ok_or_else(|| not_found(hint, &in_names))?;

    let connection = output
        .connect(&out_ports[out_index], "dashpad-out")
        .map_err(midi_err)?;
    let mut surface = LaunchpadSurface {
        connection,
        model,
        canvas: Canvas::new(),
    };
    surface.send(&programmer_mode_message(model, true))?;

    let input_connection = input
        .connect(
            &in_ports[in_index],
            "dashpad-in",
            move |_stamp, message, _| {
                if let Some(event) = decode_message(message) {
                    // Never block the MIDI thread; a full queue drops the press.
                    let _ = events.try_send(event);
                }
            },
            (),
        )
        .map_err(midi_err)?;

    Ok(Launchpad {
        surface,
        input: LaunchpadInput {
            _connection: input_connection,
        },
        port_name,
    })
}

fn not_found(hint: Option<&str>, seen: &[String]) -> DashpadError {
    let wanted = hint.map_or_else(
        || "a Launchpad Mini MK3 or Launchpad X".to_string(),
        |h| format!("a port matching {h:?}"),
    );
    DashpadError::DeviceNotFound {
        details: format!("looked for {wanted}, saw {seen:?}"),
    }
}

fn midi_err(e: impl std::fmt::Display) -> DashpadError {
    DashpadError::Midi {
        details: e.to_string(),
    }
}
