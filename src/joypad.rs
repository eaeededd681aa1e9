use bitflags::bitflags;

bitflags! {
    // Bit order matches the hardware shift register: A is reported first.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct JoypadButton: u8 {
        const BUTTON_A = 0b0000_0001;
        const BUTTON_B = 0b0000_0010;
        const SELECT   = 0b0000_0100;
        const START    = 0b0000_1000;
        const UP       = 0b0001_0000;
        const DOWN     = 0b0010_0000;
        const LEFT     = 0b0100_0000;
        const RIGHT    = 0b1000_0000;
    }
}

/// Standard controller behind $4016/$4017.
///
/// While the strobe bit is high every read reports button A; once the strobe
/// drops the latched snapshot shifts out over eight reads, after which the
/// port reads as a constant 1.
pub struct Joypad {
    strobe: bool,
    index: u8,
    buttons: JoypadButton,
}

impl Joypad {
    pub fn new() -> Self {
        Joypad {
            strobe: false,
            index: 0,
            buttons: JoypadButton::empty(),
        }
    }

    pub fn write(&mut self, data: u8) {
        self.strobe = data & 0x01 == 1;
        if self.strobe {
            self.index = 0;
        }
    }

    pub fn read(&mut self) -> u8 {
        if self.index >= 8 {
            return 1;
        }
        let bit = (self.buttons.bits() >> self.index) & 0x01;
        if !self.strobe {
            self.index += 1;
        }
        bit
    }

    pub fn set_button_status(&mut self, button: JoypadButton, pressed: bool) {
        self.buttons.set(button, pressed);
    }

    /// Replace the whole snapshot at once, e.g. from a host input poll.
    pub fn set_buttons(&mut self, buttons: JoypadButton) {
        self.buttons = buttons;
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}
