// Keyboard shortcuts of the editor

/// Key identity, reduced to what the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Delete,
    Char(char),
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub ctrl: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, ctrl: false }
    }

    pub fn ctrl(c: char) -> Self {
        Self {
            key: Key::Char(c),
            ctrl: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    /// `Delete`
    DeleteSelected,
    /// `Ctrl+A`
    PlaceSignature,
    /// `Ctrl+S`
    ExportCurrentPage,
}

/// Map a key press to an editor action, if any.
pub fn action_for(event: KeyEvent) -> Option<ShortcutAction> {
    match event.key {
        Key::Delete => Some(ShortcutAction::DeleteSelected),
        Key::Char(c) if event.ctrl => match c.to_ascii_lowercase() {
            'a' => Some(ShortcutAction::PlaceSignature),
            's' => Some(ShortcutAction::ExportCurrentPage),
            _ => None,
        },
        _ => None,
    }
}
