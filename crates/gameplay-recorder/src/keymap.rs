//! Key canonicalization and scan-code resolution
//!
//! Recordings store keys as canonical lowercase names so a file captured
//! under one keyboard layout replays identically under another. Replay
//! resolves those names back to hardware scan codes (set 1 make codes,
//! the values `SendInput` expects with `KEYEVENTF_SCANCODE`).

use crate::inject::ScanKey;

/// Prefix of the fallback token for keys with no symbolic name.
const RAW_PREFIX: &str = "vk_";

/// Canonical name for a captured key.
///
/// Generic left/right-ambiguous modifiers collapse to their `_l` variant;
/// everything the listener cannot name becomes a `vk_<code>` token.
pub fn canonical_key(key: rdev::Key) -> String {
    use rdev::Key::*;

    let name = match key {
        Alt => "alt_l",
        AltGr => "alt_r",
        Backspace => "backspace",
        CapsLock => "caps_lock",
        ControlLeft => "ctrl_l",
        ControlRight => "ctrl_r",
        Delete | KpDelete => "delete",
        DownArrow => "down",
        End => "end",
        Escape => "esc",
        F1 => "f1",
        F2 => "f2",
        F3 => "f3",
        F4 => "f4",
        F5 => "f5",
        F6 => "f6",
        F7 => "f7",
        F8 => "f8",
        F9 => "f9",
        F10 => "f10",
        F11 => "f11",
        F12 => "f12",
        Home => "home",
        Insert => "insert",
        LeftArrow => "left",
        MetaLeft => "cmd",
        MetaRight => "cmd_r",
        NumLock => "num_lock",
        PageDown => "page_down",
        PageUp => "page_up",
        Pause => "pause",
        PrintScreen => "print_screen",
        Return | KpReturn => "enter",
        RightArrow => "right",
        ScrollLock => "scroll_lock",
        ShiftLeft => "shift_l",
        ShiftRight => "shift_r",
        Space => "space",
        Tab => "tab",
        UpArrow => "up",
        Function => "fn",
        KeyA => "a",
        KeyB => "b",
        KeyC => "c",
        KeyD => "d",
        KeyE => "e",
        KeyF => "f",
        KeyG => "g",
        KeyH => "h",
        KeyI => "i",
        KeyJ => "j",
        KeyK => "k",
        KeyL => "l",
        KeyM => "m",
        KeyN => "n",
        KeyO => "o",
        KeyP => "p",
        KeyQ => "q",
        KeyR => "r",
        KeyS => "s",
        KeyT => "t",
        KeyU => "u",
        KeyV => "v",
        KeyW => "w",
        KeyX => "x",
        KeyY => "y",
        KeyZ => "z",
        Num0 | Kp0 => "0",
        Num1 | Kp1 => "1",
        Num2 | Kp2 => "2",
        Num3 | Kp3 => "3",
        Num4 | Kp4 => "4",
        Num5 | Kp5 => "5",
        Num6 | Kp6 => "6",
        Num7 | Kp7 => "7",
        Num8 | Kp8 => "8",
        Num9 | Kp9 => "9",
        Minus | KpMinus => "-",
        Equal => "=",
        KpPlus => "+",
        KpMultiply => "*",
        KpDivide | Slash => "/",
        LeftBracket => "[",
        RightBracket => "]",
        SemiColon => ";",
        Quote => "'",
        BackSlash | IntlBackslash => "\\",
        Comma => ",",
        Dot => ".",
        BackQuote => "`",
        Unknown(code) => return canonical_from_code(code),
    };
    name.to_string()
}

/// Canonical name for a raw virtual-key code the listener left unnamed.
///
/// Latin letters lower-case via their code point. Codes in 192..=223 are
/// what keyboards emit for the same physical keys under a secondary
/// (Cyrillic) layout; a fixed table maps them back to the Latin-layout
/// equivalent so recordings stay layout-portable.
pub fn canonical_from_code(code: u32) -> String {
    match code {
        65..=90 => char::from(code as u8).to_ascii_lowercase().to_string(),
        48..=57 => char::from(code as u8).to_string(),
        192..=217 => char::from(b'a' + (code - 192) as u8).to_string(),
        218 => "[".to_string(),
        219 => "]".to_string(),
        220 => "\\".to_string(),
        221 => ";".to_string(),
        222 => "'".to_string(),
        223 => "`".to_string(),
        _ => format!("{RAW_PREFIX}{code}"),
    }
}

/// Resolve a canonical key name to its scan code.
///
/// `None` means the key cannot be injected; the replay loop skips that
/// single event and keeps going.
pub fn resolve(key: &str) -> Option<ScanKey> {
    if let Some(code) = key.strip_prefix(RAW_PREFIX).and_then(|s| s.parse::<u32>().ok()) {
        return raw_code_to_scan(code);
    }

    let scan = match key {
        "esc" => ScanKey::new(0x01),
        "1" => ScanKey::new(0x02),
        "2" => ScanKey::new(0x03),
        "3" => ScanKey::new(0x04),
        "4" => ScanKey::new(0x05),
        "5" => ScanKey::new(0x06),
        "6" => ScanKey::new(0x07),
        "7" => ScanKey::new(0x08),
        "8" => ScanKey::new(0x09),
        "9" => ScanKey::new(0x0A),
        "0" => ScanKey::new(0x0B),
        "-" => ScanKey::new(0x0C),
        "=" => ScanKey::new(0x0D),
        "backspace" => ScanKey::new(0x0E),
        "tab" => ScanKey::new(0x0F),
        "q" => ScanKey::new(0x10),
        "w" => ScanKey::new(0x11),
        "e" => ScanKey::new(0x12),
        "r" => ScanKey::new(0x13),
        "t" => ScanKey::new(0x14),
        "y" => ScanKey::new(0x15),
        "u" => ScanKey::new(0x16),
        "i" => ScanKey::new(0x17),
        "o" => ScanKey::new(0x18),
        "p" => ScanKey::new(0x19),
        "[" => ScanKey::new(0x1A),
        "]" => ScanKey::new(0x1B),
        "enter" => ScanKey::new(0x1C),
        "ctrl_l" => ScanKey::new(0x1D),
        "ctrl_r" => ScanKey::extended(0x1D),
        "a" => ScanKey::new(0x1E),
        "s" => ScanKey::new(0x1F),
        "d" => ScanKey::new(0x20),
        "f" => ScanKey::new(0x21),
        "g" => ScanKey::new(0x22),
        "h" => ScanKey::new(0x23),
        "j" => ScanKey::new(0x24),
        "k" => ScanKey::new(0x25),
        "l" => ScanKey::new(0x26),
        ";" => ScanKey::new(0x27),
        "'" => ScanKey::new(0x28),
        "`" => ScanKey::new(0x29),
        "shift_l" => ScanKey::new(0x2A),
        "\\" => ScanKey::new(0x2B),
        "z" => ScanKey::new(0x2C),
        "x" => ScanKey::new(0x2D),
        "c" => ScanKey::new(0x2E),
        "v" => ScanKey::new(0x2F),
        "b" => ScanKey::new(0x30),
        "n" => ScanKey::new(0x31),
        "m" => ScanKey::new(0x32),
        "," => ScanKey::new(0x33),
        "." => ScanKey::new(0x34),
        "/" => ScanKey::new(0x35),
        "shift_r" => ScanKey::new(0x36),
        "*" => ScanKey::new(0x37),
        "alt_l" => ScanKey::new(0x38),
        "alt_r" => ScanKey::extended(0x38),
        "space" => ScanKey::new(0x39),
        "caps_lock" => ScanKey::new(0x3A),
        "f1" => ScanKey::new(0x3B),
        "f2" => ScanKey::new(0x3C),
        "f3" => ScanKey::new(0x3D),
        "f4" => ScanKey::new(0x3E),
        "f5" => ScanKey::new(0x3F),
        "f6" => ScanKey::new(0x40),
        "f7" => ScanKey::new(0x41),
        "f8" => ScanKey::new(0x42),
        "f9" => ScanKey::new(0x43),
        "f10" => ScanKey::new(0x44),
        "f11" => ScanKey::new(0x57),
        "f12" => ScanKey::new(0x58),
        "num_lock" => ScanKey::new(0x45),
        "scroll_lock" => ScanKey::new(0x46),
        "home" => ScanKey::new(0x47),
        "up" => ScanKey::new(0x48),
        "page_up" => ScanKey::new(0x49),
        "left" => ScanKey::new(0x4B),
        "right" => ScanKey::new(0x4D),
        "end" => ScanKey::new(0x4F),
        "down" => ScanKey::new(0x50),
        "page_down" => ScanKey::new(0x51),
        "insert" => ScanKey::new(0x52),
        "delete" => ScanKey::new(0x53),
        _ => return None,
    };
    Some(scan)
}

#[cfg(target_os = "windows")]
fn raw_code_to_scan(code: u32) -> Option<ScanKey> {
    crate::platform::windows::vk_to_scan(code).map(ScanKey::new)
}

#[cfg(not(target_os = "windows"))]
fn raw_code_to_scan(_code: u32) -> Option<ScanKey> {
    None
}
