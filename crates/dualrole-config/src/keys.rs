//! Key name table
//!
//! Resolves the names used in the configuration file to evdev key codes.
//! Friendly names (`CapsLock`, `Ctrl`, `Esc`, `[`) are matched first; anything
//! else is looked up as a kernel name, with or without the `KEY_` prefix, so
//! `LeftCtrl`, `F13` and `KEY_LEFTCTRL` all work.

use std::str::FromStr;

use evdev::Key;

/// Parse a key name string to an evdev Key (case-insensitive).
pub fn parse_key(name: &str) -> Option<Key> {
    let upper = name.trim().to_uppercase();
    if upper.is_empty() {
        return None;
    }

    if let Some(key) = alias(&upper) {
        return Some(key);
    }

    if upper.starts_with("KEY_") {
        return Key::from_str(&upper).ok();
    }

    Key::from_str(&format!("KEY_{}", upper)).ok()
}

/// Display name for a key code, without the `KEY_` prefix.
pub fn key_name(key: Key) -> String {
    let raw = format!("{:?}", key);
    raw.strip_prefix("KEY_").map(str::to_string).unwrap_or(raw)
}

/// Names whose spelling differs from the kernel name.
fn alias(upper: &str) -> Option<Key> {
    let key = match upper {
        "CAPS" | "CAPS_LOCK" => Key::KEY_CAPSLOCK,
        "ESCAPE" => Key::KEY_ESC,
        "RETURN" => Key::KEY_ENTER,

        // Modifiers default to the left variant
        "CTRL" | "CONTROL" | "LCTRL" => Key::KEY_LEFTCTRL,
        "RCTRL" => Key::KEY_RIGHTCTRL,
        "SHIFT" | "LSHIFT" => Key::KEY_LEFTSHIFT,
        "RSHIFT" => Key::KEY_RIGHTSHIFT,
        "ALT" | "LALT" => Key::KEY_LEFTALT,
        "RALT" | "ALTGR" => Key::KEY_RIGHTALT,
        "SUPER" | "META" | "WIN" | "LMETA" => Key::KEY_LEFTMETA,
        "RMETA" => Key::KEY_RIGHTMETA,

        "-" => Key::KEY_MINUS,
        "EQUALS" | "=" => Key::KEY_EQUAL,
        "LBRACE" | "[" => Key::KEY_LEFTBRACE,
        "RBRACE" | "]" => Key::KEY_RIGHTBRACE,
        ";" => Key::KEY_SEMICOLON,
        "'" => Key::KEY_APOSTROPHE,
        "`" => Key::KEY_GRAVE,
        "\\" => Key::KEY_BACKSLASH,
        "," => Key::KEY_COMMA,
        "PERIOD" | "." => Key::KEY_DOT,
        "/" => Key::KEY_SLASH,

        "UPARROW" => Key::KEY_UP,
        "DOWNARROW" => Key::KEY_DOWN,
        "LEFTARROW" => Key::KEY_LEFT,
        "RIGHTARROW" => Key::KEY_RIGHT,
        "PGUP" => Key::KEY_PAGEUP,
        "PGDN" | "PGDOWN" => Key::KEY_PAGEDOWN,
        "INS" => Key::KEY_INSERT,
        "DEL" => Key::KEY_DELETE,

        "NUMPAD0" => Key::KEY_KP0,
        "NUMPAD1" => Key::KEY_KP1,
        "NUMPAD2" => Key::KEY_KP2,
        "NUMPAD3" => Key::KEY_KP3,
        "NUMPAD4" => Key::KEY_KP4,
        "NUMPAD5" => Key::KEY_KP5,
        "NUMPAD6" => Key::KEY_KP6,
        "NUMPAD7" => Key::KEY_KP7,
        "NUMPAD8" => Key::KEY_KP8,
        "NUMPAD9" => Key::KEY_KP9,
        "KPDECIMAL" | "NUMPAD_DOT" => Key::KEY_KPDOT,
        "NUMPAD_ENTER" => Key::KEY_KPENTER,
        "KPADD" | "NUMPAD_PLUS" => Key::KEY_KPPLUS,
        "KPSUBTRACT" | "NUMPAD_MINUS" => Key::KEY_KPMINUS,
        "KPMULTIPLY" | "NUMPAD_MULTIPLY" => Key::KEY_KPASTERISK,
        "KPDIVIDE" | "NUMPAD_DIVIDE" => Key::KEY_KPSLASH,
        "NUM_LOCK" => Key::KEY_NUMLOCK,

        "XF86BACK" => Key::KEY_BACK,
        "XF86FORWARD" => Key::KEY_FORWARD,

        _ => return None,
    };
    Some(key)
}
