//! The transport and converter against a keyboard simulated at the line
//! level: open-collector CLOCK and DATA, keyboard-driven clock, and the bit
//! timings of a real M0110A.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use m0110::{
    Command, Config, Converter, Error, HostLeds, KeyEvent, Keyboard, Line, Model, Port, SelfTest,
    Transport,
};

const US: u64 = 1_000;
const MS: u64 = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Drive {
    Low,
    High,
    Released,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wire {
    Clock = 0,
    Data = 1,
}

/// Ways for the keyboard to stop clocking partway through a byte.
#[derive(Debug, Clone, Copy)]
enum Stall {
    /// Stop clocking the command in after this many bits, CLOCK released.
    Command(u8),
    /// Pull CLOCK low for the command bit after this many and never let go.
    CommandLow(u8),
    /// Stop clocking the reply out after this many bits, CLOCK released.
    ReplyHigh(u8),
    /// Pull CLOCK low for the reply bit after this many and never let go.
    ReplyLow(u8),
}

#[derive(Debug, Clone, Copy)]
enum State {
    Idle,
    Receiving { bits_left: u8, clock_low: bool, byte: u8 },
    Pending,
    Sending { bits_left: u8, clock_low: bool },
    Stalled,
}

struct Sim {
    now: u64,
    host: [Drive; 2],
    dev_clock_low: bool,
    dev_data_low: bool,
    state: State,
    next_at: u64,
    reply: u8,
    present: bool,
    stall: Option<Stall>,
    inquiry_delay: u64,
    events: VecDeque<u8>,
    commands: Vec<u8>,
}

impl Sim {
    fn new() -> Self {
        Self {
            now: 0,
            host: [Drive::Released; 2],
            dev_clock_low: false,
            dev_data_low: false,
            state: State::Idle,
            next_at: 0,
            reply: 0,
            present: true,
            stall: None,
            inquiry_delay: 300 * US,
            events: VecDeque::new(),
            commands: Vec::new(),
        }
    }

    fn is_low(&self, wire: Wire) -> bool {
        let device = match wire {
            Wire::Clock => self.dev_clock_low,
            Wire::Data => self.dev_data_low,
        };
        device || self.host[wire as usize] == Drive::Low
    }

    fn drive(&mut self, wire: Wire, drive: Drive) {
        self.host[wire as usize] = drive;
        self.notice_request();
    }

    fn advance(&mut self, ns: u64) {
        let target = self.now + ns;
        while self.scheduled() && self.next_at <= target {
            self.now = self.next_at;
            self.fire();
            self.notice_request();
        }
        self.now = target;
    }

    fn scheduled(&self) -> bool {
        !matches!(self.state, State::Idle | State::Stalled)
    }

    /// Host pulled DATA low with CLOCK high: start clocking a command in.
    fn notice_request(&mut self) {
        if self.present
            && matches!(self.state, State::Idle)
            && self.is_low(Wire::Data)
            && !self.is_low(Wire::Clock)
        {
            self.state = State::Receiving {
                bits_left: 8,
                clock_low: false,
                byte: 0,
            };
            self.next_at = self.now + 100 * US;
        }
    }

    fn answer(&mut self, command: u8) -> u8 {
        match command {
            0x10 | 0x12 => self.events.pop_front().unwrap_or(0x7B),
            0x14 => 0x0B,
            0x16 => 0x7D,
            _ => 0x7B,
        }
    }

    fn fire(&mut self) {
        match self.state {
            State::Receiving {
                bits_left,
                clock_low: false,
                byte,
            } => {
                let received = 8 - bits_left;
                match self.stall {
                    Some(Stall::Command(n)) if n == received => {
                        self.state = State::Stalled;
                        return;
                    }
                    Some(Stall::CommandLow(n)) if n == received => {
                        self.dev_clock_low = true;
                        self.state = State::Stalled;
                        return;
                    }
                    _ => {}
                }
                self.dev_clock_low = true;
                self.state = State::Receiving {
                    bits_left,
                    clock_low: true,
                    byte,
                };
                self.next_at += 180 * US;
            }
            State::Receiving {
                bits_left,
                clock_low: true,
                byte,
            } => {
                // sample on the rising edge
                self.dev_clock_low = false;
                let byte = byte << 1 | u8::from(!self.is_low(Wire::Data));
                if bits_left == 1 {
                    self.commands.push(byte);
                    self.reply = self.answer(byte);
                    self.state = State::Pending;
                    self.next_at += if byte == 0x10 {
                        self.inquiry_delay
                    } else {
                        300 * US
                    };
                } else {
                    self.state = State::Receiving {
                        bits_left: bits_left - 1,
                        clock_low: false,
                        byte,
                    };
                    self.next_at += 220 * US;
                }
            }
            State::Pending => {
                self.state = State::Sending {
                    bits_left: 8,
                    clock_low: false,
                };
            }
            State::Sending { bits_left: 0, .. } => {
                self.dev_data_low = false;
                self.state = State::Idle;
            }
            State::Sending {
                bits_left,
                clock_low: false,
            } => {
                let sent = 8 - bits_left;
                match self.stall {
                    Some(Stall::ReplyHigh(n)) if n == sent => {
                        self.state = State::Stalled;
                        return;
                    }
                    Some(Stall::ReplyLow(n)) if n == sent => {
                        self.dev_clock_low = true;
                        self.state = State::Stalled;
                        return;
                    }
                    _ => {}
                }
                // data changes on the falling edge
                self.dev_data_low = self.reply & (1 << (bits_left - 1)) == 0;
                self.dev_clock_low = true;
                self.state = State::Sending {
                    bits_left,
                    clock_low: true,
                };
                self.next_at += 160 * US;
            }
            State::Sending {
                bits_left,
                clock_low: true,
            } => {
                self.dev_clock_low = false;
                self.state = State::Sending {
                    bits_left: bits_left - 1,
                    clock_low: false,
                };
                self.next_at += 180 * US;
            }
            State::Idle | State::Stalled => {}
        }
    }
}

#[derive(Clone)]
struct Bus(Rc<RefCell<Sim>>);

impl Bus {
    fn new(setup: impl FnOnce(&mut Sim)) -> Self {
        let mut sim = Sim::new();
        setup(&mut sim);
        Self(Rc::new(RefCell::new(sim)))
    }

    fn with_events(events: &[u8]) -> Self {
        Self::new(|sim| sim.events.extend(events))
    }

    fn line(&self, wire: Wire) -> SimLine {
        SimLine {
            sim: self.0.clone(),
            wire,
        }
    }

    fn transport(&self) -> Transport<SimLine, SimLine, SimDelay> {
        Transport::new(
            self.line(Wire::Clock),
            self.line(Wire::Data),
            SimDelay(self.0.clone()),
        )
    }

    fn now(&self) -> u64 {
        self.0.borrow().now
    }

    fn commands(&self) -> Vec<u8> {
        self.0.borrow().commands.clone()
    }

    fn host_idle(&self) -> bool {
        self.0.borrow().host == [Drive::High, Drive::High]
    }
}

struct SimLine {
    sim: Rc<RefCell<Sim>>,
    wire: Wire,
}

impl Line for SimLine {
    fn drive_low(&mut self) {
        self.sim.borrow_mut().drive(self.wire, Drive::Low);
    }

    fn drive_high(&mut self) {
        self.sim.borrow_mut().drive(self.wire, Drive::High);
    }

    fn release_and_read(&mut self) -> bool {
        let mut sim = self.sim.borrow_mut();
        sim.host[self.wire as usize] = Drive::Released;
        !sim.is_low(self.wire)
    }
}

struct SimDelay(Rc<RefCell<Sim>>);

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.borrow_mut().advance(u64::from(ns));
    }
}

#[test]
fn command_and_reply() {
    let bus = Bus::with_events(&[0x71]);
    let mut t = bus.transport();

    assert_eq!(t.send(0x10), Ok(()));
    assert_eq!(t.receive(), Ok(0x71));
    assert_eq!(t.last_error(), None);
    assert_eq!(bus.commands(), [0x10]);
    assert!(bus.host_idle());
}

#[test]
fn reply_bit_patterns() {
    let replies = [0x00, 0xFF, 0xA5, 0x01];
    let bus = Bus::with_events(&replies);
    let mut t = bus.transport();

    for expected in replies {
        t.send(0x12).unwrap();
        assert_eq!(t.receive(), Ok(expected));
    }
    assert_eq!(bus.commands(), [0x12; 4]);
}

#[test]
fn init_reads_model_and_self_test() {
    let bus = Bus::with_events(&[]);
    let mut converter = Converter::new(bus.transport(), Config::DEFAULT);

    let diag = converter.init();
    assert_eq!(diag.model, Ok(Model::M0110A));
    assert_eq!(diag.self_test, Ok(SelfTest::Ack));
    assert_eq!(bus.commands(), [0x14, 0x16]);
    assert!(bus.now() >= 1000 * MS);
}

#[test]
fn scan_resolves_calc_key_over_the_wire() {
    // keypad '*': virtual Shift, prefix, key
    let bus = Bus::with_events(&[0x71, 0x79, 0x05]);
    let mut converter = Converter::new(bus.transport(), Config::DEFAULT);
    converter.init();

    let applied = converter.scan(HostLeds::default());
    assert_eq!(applied.as_slice(), [KeyEvent::from_code(0x62)]);
    assert!(converter.matrix().is_held(KeyEvent::from_code(0x62)));
    assert!(!converter.matrix().is_held(KeyEvent::from_code(0x38)));
    assert_eq!(bus.commands(), [0x14, 0x16, 0x10, 0x12, 0x12]);
}

#[test]
fn slow_inquiry_answer_is_received() {
    let bus = Bus::new(|sim| {
        sim.inquiry_delay = 200 * MS;
        sim.events.push_back(0x01);
    });
    let mut kb = Keyboard::new(bus.transport());
    assert_eq!(kb.recv_key(), Some(KeyEvent::from_code(0x00)));
}

#[test]
fn absent_keyboard_times_out() {
    let bus = Bus::new(|sim| sim.present = false);
    let mut t = bus.transport();

    assert_eq!(t.send(0x10), Err(Error::SendStart));
    assert_eq!(t.last_error().map(|e| e.code()), Some(1));
    assert_eq!(bus.now(), 750 * MS);
    assert!(bus.host_idle());

    assert_eq!(t.receive(), Err(Error::ReceiveStart));
    assert!(bus.host_idle());
}

#[test]
fn failed_send_skips_the_receive() {
    let bus = Bus::new(|sim| sim.present = false);
    let mut kb = Keyboard::new(bus.transport());

    assert_eq!(kb.query(Command::Inquiry), Err(Error::SendStart));
    // one start timeout plus one recovery pause, no receive attempt
    assert_eq!(bus.now(), 750 * MS);
    assert_eq!(kb.recv_key(), None);
}

#[test]
fn keyboard_stops_clocking_the_command() {
    let bus = Bus::new(|sim| sim.stall = Some(Stall::Command(3)));
    let mut t = bus.transport();

    let err = t.send(0x10).unwrap_err();
    assert_eq!(err, Error::SendClockLow { bit: 4 });
    assert_eq!(err.code(), 3);
    assert!(bus.host_idle());
}

#[test]
fn keyboard_holds_clock_low_during_the_command() {
    let bus = Bus::new(|sim| sim.stall = Some(Stall::CommandLow(2)));
    let mut t = bus.transport();

    let err = t.send(0x10).unwrap_err();
    assert_eq!(err, Error::SendClockHigh { bit: 5 });
    assert_eq!(err.code(), 4);
    assert_eq!(t.last_error(), Some(err));
    assert!(bus.host_idle());
    assert!(bus.commands().is_empty());
}

#[test]
fn keyboard_stops_clocking_the_reply() {
    let bus = Bus::new(|sim| sim.stall = Some(Stall::ReplyHigh(2)));
    let mut t = bus.transport();
    t.send(0x12).unwrap();
    let err = t.receive().unwrap_err();
    assert_eq!(err, Error::ReceiveClockLow { bit: 5 });
    assert_eq!(err.code(), 2);

    let bus = Bus::new(|sim| sim.stall = Some(Stall::ReplyLow(0)));
    let mut t = bus.transport();
    t.send(0x12).unwrap();
    let err = t.receive().unwrap_err();
    assert_eq!(err, Error::ReceiveClockHigh { bit: 7 });
    assert_eq!(err.code(), 3);
    assert!(bus.host_idle());
}
