//! Windows input injection via SendInput
//!
//! Keys are posted as hardware scan codes (`KEYEVENTF_SCANCODE`) rather
//! than virtual-key codes, so a recording replays on any keyboard layout.
//! Right Ctrl/Alt need `KEYEVENTF_EXTENDEDKEY` on top of their shared
//! make code.

use crate::events::MouseButton;
use crate::inject::{InjectError, InputPort, ScanKey};

use windows::Win32::UI::Input::KeyboardAndMouse::{
    MapVirtualKeyW, SendInput, INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT,
    KEYBD_EVENT_FLAGS, KEYEVENTF_EXTENDEDKEY, KEYEVENTF_KEYUP, KEYEVENTF_SCANCODE,
    MAPVK_VK_TO_VSC, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MIDDLEDOWN,
    MOUSEEVENTF_MIDDLEUP, MOUSEEVENTF_MOVE, MOUSEEVENTF_RIGHTDOWN, MOUSEEVENTF_RIGHTUP,
    MOUSEEVENTF_WHEEL, MOUSEINPUT, MOUSE_EVENT_FLAGS, VIRTUAL_KEY,
};

const WHEEL_DELTA: i32 = 120;

/// `InputPort` backed by the Win32 SendInput facility.
pub struct SendInputPort;

impl InputPort for SendInputPort {
    fn move_relative(&self, dx: i32, dy: i32) -> Result<(), InjectError> {
        send_inputs(&[make_mouse_input(MOUSEEVENTF_MOVE, dx, dy, 0)])
    }

    fn set_button(&self, button: MouseButton, pressed: bool) -> Result<(), InjectError> {
        let flags = match (button, pressed) {
            (MouseButton::Left, true) => MOUSEEVENTF_LEFTDOWN,
            (MouseButton::Left, false) => MOUSEEVENTF_LEFTUP,
            (MouseButton::Right, true) => MOUSEEVENTF_RIGHTDOWN,
            (MouseButton::Right, false) => MOUSEEVENTF_RIGHTUP,
            (MouseButton::Middle, true) => MOUSEEVENTF_MIDDLEDOWN,
            (MouseButton::Middle, false) => MOUSEEVENTF_MIDDLEUP,
        };
        send_inputs(&[make_mouse_input(flags, 0, 0, 0)])
    }

    fn scroll(&self, ticks: i32) -> Result<(), InjectError> {
        if ticks == 0 {
            return Ok(());
        }
        send_inputs(&[make_mouse_input(MOUSEEVENTF_WHEEL, 0, 0, ticks * WHEEL_DELTA)])
    }

    fn set_key(&self, key: ScanKey, pressed: bool) -> Result<(), InjectError> {
        let mut flags = KEYEVENTF_SCANCODE;
        if key.extended {
            flags |= KEYEVENTF_EXTENDEDKEY;
        }
        if !pressed {
            flags |= KEYEVENTF_KEYUP;
        }
        send_inputs(&[make_key_input(key.code, flags)])
    }
}

/// Map a raw virtual-key code to its scan code. Zero means the keyboard
/// driver has no mapping; the event is skipped upstream.
pub fn vk_to_scan(vk: u32) -> Option<u16> {
    let scan = unsafe { MapVirtualKeyW(vk, MAPVK_VK_TO_VSC) };
    (scan != 0).then_some(scan as u16)
}

fn make_mouse_input(flags: MOUSE_EVENT_FLAGS, dx: i32, dy: i32, data: i32) -> INPUT {
    INPUT {
        r#type: INPUT_MOUSE,
        Anonymous: INPUT_0 {
            mi: MOUSEINPUT {
                dx,
                dy,
                mouseData: data as u32,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn make_key_input(scan: u16, flags: KEYBD_EVENT_FLAGS) -> INPUT {
    INPUT {
        r#type: INPUT_KEYBOARD,
        Anonymous: INPUT_0 {
            ki: KEYBDINPUT {
                wVk: VIRTUAL_KEY(0),
                wScan: scan,
                dwFlags: flags,
                time: 0,
                dwExtraInfo: 0,
            },
        },
    }
}

fn send_inputs(inputs: &[INPUT]) -> Result<(), InjectError> {
    let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };

    if sent as usize != inputs.len() {
        return Err(InjectError(format!(
            "SendInput sent {} of {} inputs",
            sent,
            inputs.len()
        )));
    }

    Ok(())
}
