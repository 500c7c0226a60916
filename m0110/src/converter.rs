//! One scan cycle: ask the keyboard for an event, sort out what it means,
//! and record it in the matrix.

use log::{debug, warn};

use crate::command::{Keyboard, Model, SelfTest};
use crate::error::Error;
use crate::event::{KeyEvent, CAPS, CAPS_UP, SHIFT, SHIFT_UP};
use crate::matrix::Matrix;
use crate::transport::Port;

/// Converter options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// The keyboard has a mechanically latching Caps Lock key. Its
    /// down/up reports are translated against the host's Caps Lock LED so the
    /// host sees a toggle tap instead of a held key.
    pub locking_caps: bool,
    /// Report ghost rows from [`Converter::has_ghost`].
    pub ghost_detection: bool,
}

impl Config {
    pub const DEFAULT: Config = Config {
        locking_caps: false,
        ghost_detection: false,
    };
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Keyboard LED state as last set by the host (HID LED output report).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HostLeds(pub u8);

impl HostLeds {
    pub const NUM_LOCK: u8 = 1 << 0;
    pub const CAPS_LOCK: u8 = 1 << 1;

    pub fn caps_lock(self) -> bool {
        self.0 & Self::CAPS_LOCK != 0
    }
}

/// Transitions applied in one cycle, in order. At most a locking Caps
/// auto-release, an auxiliary key and the primary key.
pub type Transitions = heapless::Vec<KeyEvent, 3>;

/// What the keyboard said during [`Converter::init`]. Informational only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Diagnostics {
    pub model: Result<Model, Error>,
    pub self_test: Result<SelfTest, Error>,
}

pub struct Converter<P> {
    keyboard: Keyboard<P>,
    matrix: Matrix,
    config: Config,
}

impl<P: Port> Converter<P> {
    pub fn new(port: P, config: Config) -> Self {
        Self {
            keyboard: Keyboard::new(port),
            matrix: Matrix::new(),
            config,
        }
    }

    /// Power the keyboard up, query model and self test for the log, and
    /// start from an empty matrix. Nothing here can fail startup.
    pub fn init(&mut self) -> Diagnostics {
        self.keyboard.power_up();
        let model = self.keyboard.model();
        let self_test = self.keyboard.self_test();
        self.matrix.clear();
        self.matrix.begin_cycle();
        Diagnostics { model, self_test }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn keyboard(&self) -> &Keyboard<P> {
        &self.keyboard
    }

    pub fn keyboard_mut(&mut self) -> &mut Keyboard<P> {
        &mut self.keyboard
    }

    pub fn config(&self) -> Config {
        self.config
    }

    /// Ghost check, if enabled. Whether to act on it is up to the caller.
    pub fn has_ghost(&self) -> bool {
        self.config.ghost_detection && self.matrix.has_ghost()
    }

    /// Run one scan cycle and return the transitions it applied.
    pub fn scan(&mut self, leds: HostLeds) -> Transitions {
        let mut applied = Transitions::new();
        self.matrix.begin_cycle();

        let key = self.keyboard.recv_key();

        // a latched Caps press only lives for one cycle
        if self.config.locking_caps && self.matrix.is_held(CAPS) {
            self.apply(&mut applied, CAPS_UP);
        }

        match key {
            None => {}
            Some(shift) if shift == SHIFT || shift == SHIFT_UP => {
                self.resolve_shift(shift, &mut applied);
            }
            Some(key) => self.resolve_key(key, leds, &mut applied),
        }
        if !applied.is_empty() {
            debug!("m0110 scan: {applied:?}");
        }
        applied
    }

    /// A Shift event may be real, or the virtual Shift the keyboard wraps
    /// around a calc key. Read what follows and decide.
    fn resolve_shift(&mut self, shift: KeyEvent, applied: &mut Transitions) {
        let Some(mut aux) = self.keyboard.inst_key() else {
            self.apply(applied, shift);
            return;
        };

        if aux.is_plain() {
            self.apply(applied, aux);
            self.apply(applied, shift);
        } else if !aux.same_state(shift) {
            // Shift and the key moved in opposite directions: a user chord.
            // Calc keys never come that way, so this is the arrow.
            self.apply(applied, aux.as_keypad());
            self.apply(applied, shift);
        } else {
            // A calc key with its virtual Shift can't be told from Shift and
            // an arrow moving together. The one case the matrix settles is a
            // release: if the calc key isn't held but its arrow is, it was
            // the arrow.
            if aux.is_release()
                && aux.is_calc()
                && !self.matrix.is_held(aux)
                && self.matrix.is_held(aux.as_keypad())
            {
                aux = aux.as_keypad();
            }
            self.apply(applied, aux);
            // the Shift around a calc key is virtual
            if !aux.is_calc() {
                self.apply(applied, shift);
            }
        }
    }

    fn resolve_key(&mut self, mut key: KeyEvent, leds: HostLeds, applied: &mut Transitions) {
        if self.config.locking_caps {
            if leds.caps_lock() {
                if key == CAPS {
                    return;
                }
                if key == CAPS_UP {
                    key = CAPS;
                }
            } else if key == CAPS_UP {
                return;
            }
        }

        // A calc key pressed while the user already holds Shift arrives as
        // the full Shift + prefix + key press, but its release drops the
        // Shift and reads as an arrow release.
        if key.is_release()
            && key.is_keypad()
            && !self.matrix.is_held(key)
            && self.matrix.is_held(key.as_calc())
        {
            key = key.as_calc();
        }
        self.apply(applied, key);
    }

    fn apply(&mut self, applied: &mut Transitions, event: KeyEvent) {
        if self.matrix.apply(event) && applied.push(event).is_err() {
            warn!("m0110 scan: transition {event:?} not reported, {} already", applied.len());
            debug_assert!(false, "more transitions than Transitions holds");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::FAILED;
    use crate::replay::ReplayPort;
    use std::vec::Vec;

    const NO_LEDS: HostLeds = HostLeds(0);

    /// Keypad '*' and its logical code.
    const CALC_ASTERISK: u8 = 0x05;
    const CALC_ASTERISK_CODE: u8 = 0x62;
    /// Up arrow and keypad '/' share this byte.
    const UP_OR_SLASH: u8 = 0x1B;
    const UP: u8 = 0x4D;
    const SLASH: u8 = 0x6D;

    fn converter(trace: &[u8], config: Config) -> Converter<ReplayPort<'_>> {
        let mut c = Converter::new(ReplayPort::new(trace), config);
        c.init();
        c
    }

    fn run(c: &mut Converter<ReplayPort<'_>>, leds: HostLeds) -> Vec<u8> {
        let mut codes = Vec::new();
        while !c.keyboard().port().is_exhausted() {
            codes.extend(c.scan(leds).iter().map(|e| e.code()));
        }
        codes
    }

    fn held(m: &Matrix, code: u8) -> bool {
        m.is_held(KeyEvent::from_code(code))
    }

    #[test]
    fn init_queries_diagnostics_and_clears() {
        let mut c = Converter::new(ReplayPort::new(&[]), Config::DEFAULT);
        let diag = c.init();
        assert_eq!(diag.model, Ok(Model::M0110A));
        assert_eq!(diag.self_test, Ok(SelfTest::Ack));
        assert_eq!(c.matrix().pressed_count(), 0);
        assert_eq!(
            c.keyboard().port().recent_commands().collect::<Vec<_>>(),
            [0x14, 0x16]
        );
    }

    #[test]
    fn null_and_failure_change_nothing() {
        let mut c = converter(&[0x7B, FAILED], Config::DEFAULT);
        assert!(c.scan(NO_LEDS).is_empty());
        assert!(!c.matrix().was_modified_this_cycle());
        assert!(c.scan(NO_LEDS).is_empty());
        assert_eq!(c.matrix().pressed_count(), 0);
    }

    #[test]
    fn plain_press_and_release() {
        let mut c = converter(&[0x01], Config::DEFAULT);
        assert_eq!(c.scan(NO_LEDS).as_slice(), [KeyEvent::from_code(0x00)]);
        assert!(c.matrix().was_modified_this_cycle());
        assert!(c.matrix().is_pressed(0, 0));
    }

    #[test]
    fn shift_alone() {
        // Shift down, nothing behind it; later Shift up, nothing behind it
        let mut c = converter(&[0x71, 0x7B, 0xF1, 0x7B], Config::DEFAULT);
        assert_eq!(c.scan(NO_LEDS).as_slice(), [SHIFT]);
        assert!(held(c.matrix(), 0x38));
        assert_eq!(c.scan(NO_LEDS).as_slice(), [SHIFT_UP]);
        assert_eq!(c.matrix().pressed_count(), 0);
    }

    #[test]
    fn shift_with_plain_key_sets_both() {
        let mut c = converter(&[0x71, 0x01], Config::DEFAULT);
        assert_eq!(run(&mut c, NO_LEDS), [0x00, 0x38]);
        assert!(held(c.matrix(), 0x38));
        assert!(held(c.matrix(), 0x00));
        assert_eq!(c.matrix().pressed_count(), 2);
    }

    #[test]
    fn shift_up_with_return_down() {
        let trace = [
            0x71, 0x7B, // Shift down
            0xF1, 0x49, // Shift up while Return goes down
        ];
        let mut c = converter(&trace, Config::DEFAULT);
        assert_eq!(run(&mut c, NO_LEDS), [0x38, 0x24, 0xB8]);
        assert!(held(c.matrix(), 0x24));
        assert!(!held(c.matrix(), 0x04));
        assert!(!held(c.matrix(), 0x38));
        assert_eq!(c.matrix().pressed_count(), 1);
    }

    #[test]
    fn shift_down_with_space_up() {
        let trace = [
            0x63, // Space down
            0x71, 0xE3, // Shift down while Space goes up
        ];
        let mut c = converter(&trace, Config::DEFAULT);
        assert_eq!(run(&mut c, NO_LEDS), [0x31, 0xB1, 0x38]);
        assert!(!held(c.matrix(), 0x31));
        assert!(!held(c.matrix(), 0x11));
        assert!(held(c.matrix(), 0x38));
        assert_eq!(c.matrix().pressed_count(), 1);
    }

    #[test]
    fn calc_key_press_suppresses_virtual_shift() {
        let mut c = converter(&[0x71, 0x79, CALC_ASTERISK], Config::DEFAULT);
        assert_eq!(run(&mut c, NO_LEDS), [CALC_ASTERISK_CODE]);
        assert!(held(c.matrix(), CALC_ASTERISK_CODE));
        assert!(!held(c.matrix(), 0x38));
        assert_eq!(c.matrix().pressed_count(), 1);
    }

    #[test]
    fn calc_key_release_suppresses_virtual_shift() {
        let trace = [0x71, 0x79, CALC_ASTERISK, 0xF1, 0x79, CALC_ASTERISK | 0x80];
        let mut c = converter(&trace, Config::DEFAULT);
        assert_eq!(
            run(&mut c, NO_LEDS),
            [CALC_ASTERISK_CODE, CALC_ASTERISK_CODE | 0x80]
        );
        assert_eq!(c.matrix().pressed_count(), 0);
    }

    #[test]
    fn shift_and_arrow_released_together() {
        let trace = [
            0x71, 0x7B, // Shift down
            0x79, UP_OR_SLASH, // Up down
            0xF1, 0x79, UP_OR_SLASH | 0x80, // both up, looks like a calc release
        ];
        let mut c = converter(&trace, Config::DEFAULT);
        assert_eq!(run(&mut c, NO_LEDS), [0x38, UP, UP | 0x80, 0xB8]);
        assert_eq!(c.matrix().pressed_count(), 0);
    }

    #[test]
    fn calc_key_under_user_shift() {
        let trace = [
            0x71, 0x7B, // user holds Shift
            0x71, 0x79, UP_OR_SLASH, // keypad '/' down, full sequence
            0x79, UP_OR_SLASH | 0x80, // release without the Shift wrapper
        ];
        let mut c = converter(&trace, Config::DEFAULT);
        assert_eq!(run(&mut c, NO_LEDS), [0x38, SLASH, SLASH | 0x80]);
        assert!(held(c.matrix(), 0x38));
        assert!(!held(c.matrix(), UP));
        assert_eq!(c.matrix().pressed_count(), 1);
    }

    #[test]
    fn opposite_directions_are_a_chord() {
        let trace = [
            0x71, 0x7B, // Shift down
            0xF1, 0x79, 0x2F, // Shift up while keypad 5 goes down
        ];
        let mut c = converter(&trace, Config::DEFAULT);
        assert_eq!(run(&mut c, NO_LEDS), [0x38, 0x57, 0xB8]);
        assert!(held(c.matrix(), 0x57));
        assert!(!held(c.matrix(), 0x38));
    }

    #[test]
    fn opposite_direction_calc_code_becomes_arrow() {
        let trace = [0x71, 0x7B, 0xF1, 0x79, CALC_ASTERISK];
        let mut c = converter(&trace, Config::DEFAULT);
        assert_eq!(run(&mut c, NO_LEDS), [0x38, 0x42, 0xB8]);
        assert!(held(c.matrix(), 0x42));
    }

    #[test]
    fn locking_caps_latches_into_a_tap() {
        let config = Config {
            locking_caps: true,
            ..Config::DEFAULT
        };
        // LED dark: press goes through and is released on the next cycle
        let mut c = converter(&[0x73], config);
        assert_eq!(c.scan(NO_LEDS).as_slice(), [CAPS]);
        assert_eq!(c.scan(NO_LEDS).as_slice(), [CAPS_UP]);
        assert!(c.matrix().was_modified_this_cycle());
        assert!(c.scan(NO_LEDS).is_empty());

        // LED dark: the unlatching release is dropped
        let mut c = converter(&[0xF3], config);
        assert!(c.scan(NO_LEDS).is_empty());
        assert!(!c.matrix().was_modified_this_cycle());
    }

    #[test]
    fn locking_caps_with_led_lit() {
        let config = Config {
            locking_caps: true,
            ..Config::DEFAULT
        };
        let lit = HostLeds(HostLeds::CAPS_LOCK);
        let mut c = converter(&[0x73, 0xF3], config);
        // press while latched on is ignored
        assert!(c.scan(lit).is_empty());
        // release becomes the press that toggles it off
        assert_eq!(c.scan(lit).as_slice(), [CAPS]);
        assert_eq!(c.scan(lit).as_slice(), [CAPS_UP]);
    }

    #[test]
    fn busiest_cycle_reports_all_three_transitions() {
        let config = Config {
            locking_caps: true,
            ..Config::DEFAULT
        };
        // Caps tap release, then Shift and 'A' together
        let mut c = converter(&[0x73, 0x71, 0x01], config);
        assert_eq!(c.scan(NO_LEDS).as_slice(), [CAPS]);
        let applied = c.scan(NO_LEDS);
        assert_eq!(applied.len(), applied.capacity());
        assert_eq!(
            applied.as_slice(),
            [CAPS_UP, KeyEvent::from_code(0x00), SHIFT]
        );
    }

    #[test]
    fn caps_passes_through_without_locking() {
        let mut c = converter(&[0x73, 0xF3], Config::DEFAULT);
        assert_eq!(run(&mut c, HostLeds(HostLeds::CAPS_LOCK)), [0x39, 0xB9]);
    }

    #[test]
    fn ghost_report_follows_config() {
        // all four corners of a rectangle: A S H G
        let trace = [0x01, 0x03, 0x11, 0x13];
        let mut off = converter(&trace, Config::DEFAULT);
        run(&mut off, NO_LEDS);
        assert!(off.matrix().has_ghost());
        assert!(!off.has_ghost());

        let config = Config {
            ghost_detection: true,
            ..Config::DEFAULT
        };
        let mut on = converter(&trace, config);
        run(&mut on, NO_LEDS);
        assert!(on.has_ghost());
    }
}
