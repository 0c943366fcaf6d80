//! Input surface: abstract controller/console events translated into the
//! RIOT port bits and TIA INPTx latches the running program actually reads.
//! No physical input device driver lives here (keyboard/gamepad polling is
//! out of scope) — callers feed `InputEvent`s in and this module only knows
//! how to turn them into the handful of bits 2600 software cares about.
//!
//! Built on a bit-mapping-table approach (event enum translated straight
//! into register bits), with the paddle capacitor-charge model added: real
//! paddle controllers are a
//! potentiometer charging a capacitor that TIA's INPTx comparator samples,
//! not a digital position readout, so a program that reads "how far along
//! has the capacitor charged since the last VBLANK discharge" sees a
//! consistent value because we model the RC charge curve the same way the
//! original source does.

use crate::riot::Riot;
use crate::tia::Tia;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stick {
    Up,
    Down,
    Left,
    Right,
    Fire,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    Reset,
    Select,
    ColorBw,
    LeftDifficulty,
    RightDifficulty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Joystick { port: u8, button: Stick, pressed: bool },
    Paddle { port: u8, position: u8 },
    Keyboard { port: u8, row: u8, col: u8, pressed: bool },
    Console { button: Panel, pressed: bool },
}

/// One paddle's capacitor charge state. `position` is 0-255 (fully
/// counter-clockwise to fully clockwise); `charge` approximates the voltage
/// across the real RC network, reset to zero by VBLANK's paddle-discharge
/// bit and climbing toward a ceiling set by `position` every TIA tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct PaddleState {
    pub position: u8,
    charge: u16,
}

impl PaddleState {
    fn tick(&mut self) {
        let ceiling = (self.position as u16) * 32;
        if self.charge < ceiling {
            self.charge += 1;
        }
    }

    fn discharge(&mut self) {
        self.charge = 0;
    }

    /// INPTx reads bit 7 as the comparator output: high once the capacitor
    /// has charged past threshold.
    fn comparator_bit(&self) -> u8 {
        if self.charge >= 0x3FFF.min((self.position as u16) * 32) && self.position > 0 {
            0x80
        } else {
            0x00
        }
    }
}

pub struct InputState {
    pub paddles: [PaddleState; 4],
    port0_stick: u8,
    port1_stick: u8,
    port0_fire: bool,
    port1_fire: bool,
    panel: u8,
}

const STICK_UP: u8 = 1 << 4;
const STICK_DOWN: u8 = 1 << 5;
const STICK_LEFT: u8 = 1 << 6;
const STICK_RIGHT: u8 = 1 << 7;

const PANEL_RESET: u8 = 1 << 0;
const PANEL_SELECT: u8 = 1 << 1;
const PANEL_COLOR_BW: u8 = 1 << 3;
const PANEL_LEFT_DIFFICULTY: u8 = 1 << 6;
const PANEL_RIGHT_DIFFICULTY: u8 = 1 << 7;

impl InputState {
    pub fn new() -> Self {
        Self {
            paddles: [PaddleState::default(); 4],
            port0_stick: 0xFF,
            port1_stick: 0xFF,
            port0_fire: false,
            port1_fire: false,
            panel: PANEL_COLOR_BW | PANEL_LEFT_DIFFICULTY | PANEL_RIGHT_DIFFICULTY,
        }
    }

    pub fn apply(&mut self, event: InputEvent) {
        match event {
            InputEvent::Joystick { port, button, pressed } => {
                if button == Stick::Fire {
                    let fire = if port == 0 { &mut self.port0_fire } else { &mut self.port1_fire };
                    *fire = pressed;
                    return;
                }
                let bit = match button {
                    Stick::Up => STICK_UP,
                    Stick::Down => STICK_DOWN,
                    Stick::Left => STICK_LEFT,
                    Stick::Right => STICK_RIGHT,
                    Stick::Fire => unreachable!(),
                };
                let reg = if port == 0 { &mut self.port0_stick } else { &mut self.port1_stick };
                if pressed {
                    *reg &= !bit;
                } else {
                    *reg |= bit;
                }
            }
            InputEvent::Paddle { port, position } => {
                if let Some(p) = self.paddles.get_mut(port as usize) {
                    p.position = position;
                }
            }
            InputEvent::Keyboard { .. } => {
                // Keyboard controller matrix decode is out of scope; the
                // byte-level hook exists for a future driver to populate.
            }
            InputEvent::Console { button, pressed } => {
                let bit = match button {
                    Panel::Reset => PANEL_RESET,
                    Panel::Select => PANEL_SELECT,
                    Panel::ColorBw => PANEL_COLOR_BW,
                    Panel::LeftDifficulty => PANEL_LEFT_DIFFICULTY,
                    Panel::RightDifficulty => PANEL_RIGHT_DIFFICULTY,
                };
                if pressed {
                    self.panel &= !bit;
                } else {
                    self.panel |= bit;
                }
            }
        }
    }

    /// Push the current joystick/panel bits into RIOT ports and the paddle
    /// comparator bits into TIA's INPTx latches. Called once per frame (or
    /// whenever an event changes state) rather than every colour clock.
    pub fn drive_ports(&self, riot: &mut Riot, tia: &mut Tia) {
        riot.set_port_a_external((self.port0_stick & 0x0F) | (self.port1_stick & 0xF0));
        riot.set_port_b_external(self.panel);
        for (i, p) in self.paddles.iter().enumerate() {
            tia.set_input_latch(i, p.comparator_bit());
        }
        // Fire buttons are digital, wired straight to INPT4/INPT5: bit 7
        // reads low while pressed, high while released.
        tia.set_input_latch(4, if self.port0_fire { 0x00 } else { 0x80 });
        tia.set_input_latch(5, if self.port1_fire { 0x00 } else { 0x80 });
    }

    /// Advance paddle RC charge by one colour clock.
    pub fn tick_paddles(&mut self) {
        for p in self.paddles.iter_mut() {
            p.tick();
        }
    }

    /// VBLANK's paddle-discharge control bit (bit 6) shorts the capacitors.
    pub fn discharge_paddles_if_requested(&mut self, vblank_register: u8) {
        if vblank_register & 0x40 != 0 {
            for p in self.paddles.iter_mut() {
                p.discharge();
            }
        }
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joystick_press_clears_active_low_bit() {
        let mut input = InputState::new();
        input.apply(InputEvent::Joystick { port: 0, button: Stick::Up, pressed: true });
        assert_eq!(input.port0_stick & STICK_UP, 0);
        input.apply(InputEvent::Joystick { port: 0, button: Stick::Up, pressed: false });
        assert_eq!(input.port0_stick & STICK_UP, STICK_UP);
    }

    #[test]
    fn paddle_comparator_fires_after_enough_ticks() {
        let mut input = InputState::new();
        input.apply(InputEvent::Paddle { port: 0, position: 4 });
        for _ in 0..200 {
            input.tick_paddles();
        }
        assert_eq!(input.paddles[0].comparator_bit(), 0x80);
    }

    #[test]
    fn discharge_resets_capacitor_charge() {
        let mut input = InputState::new();
        input.apply(InputEvent::Paddle { port: 0, position: 200 });
        for _ in 0..50 {
            input.tick_paddles();
        }
        input.discharge_paddles_if_requested(0x40);
        assert_eq!(input.paddles[0].comparator_bit(), 0x00);
    }

    #[test]
    fn console_switch_defaults_match_color_and_max_difficulty() {
        let input = InputState::new();
        assert_eq!(input.panel & PANEL_COLOR_BW, PANEL_COLOR_BW);
        assert_eq!(input.panel & PANEL_LEFT_DIFFICULTY, PANEL_LEFT_DIFFICULTY);
    }

    #[test]
    fn fire_button_drives_inpt4_and_inpt5_low_while_pressed() {
        let mut input = InputState::new();
        let mut riot = Riot::new();
        let mut tia = Tia::new();

        input.apply(InputEvent::Joystick { port: 0, button: Stick::Fire, pressed: true });
        input.drive_ports(&mut riot, &mut tia);
        assert_eq!(tia.read(0x0C), Some(0x00)); // INPT4

        input.apply(InputEvent::Joystick { port: 0, button: Stick::Fire, pressed: false });
        input.apply(InputEvent::Joystick { port: 1, button: Stick::Fire, pressed: true });
        input.drive_ports(&mut riot, &mut tia);
        assert_eq!(tia.read(0x0C), Some(0x80)); // INPT4 released
        assert_eq!(tia.read(0x0D), Some(0x00)); // INPT5 pressed
    }
}
