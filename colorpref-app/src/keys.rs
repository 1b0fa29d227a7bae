use colorpref_core::Key;
use winit::keyboard::KeyCode;

const DIGITS: [(KeyCode, KeyCode); 9] = [
    (KeyCode::Digit1, KeyCode::Numpad1),
    (KeyCode::Digit2, KeyCode::Numpad2),
    (KeyCode::Digit3, KeyCode::Numpad3),
    (KeyCode::Digit4, KeyCode::Numpad4),
    (KeyCode::Digit5, KeyCode::Numpad5),
    (KeyCode::Digit6, KeyCode::Numpad6),
    (KeyCode::Digit7, KeyCode::Numpad7),
    (KeyCode::Digit8, KeyCode::Numpad8),
    (KeyCode::Digit9, KeyCode::Numpad9),
];

/// Physical key to the subject's answer set. Everything else is ignored.
pub fn map_key(code: KeyCode) -> Option<Key> {
    let key = match code {
        KeyCode::Space => Key::Space,
        KeyCode::ArrowLeft => Key::Left,
        KeyCode::ArrowRight => Key::Right,
        KeyCode::ArrowUp => Key::Up,
        KeyCode::ArrowDown => Key::Down,
        KeyCode::KeyX => Key::Reset,
        KeyCode::KeyQ => Key::Quit,
        KeyCode::Escape => Key::Escape,
        other => {
            let i = DIGITS
                .iter()
                .position(|&(row, pad)| other == row || other == pad)?;
            Key::Digit(i as u8 + 1)
        }
    };
    Some(key)
}
