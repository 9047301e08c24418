//! Semantic input events decoded from crossterm events.
//!
//! The backend owns polling; the pipeline only consumes batches of
//! already-read events and routes pointer events through the last frame's
//! hit map.

use crossterm::event::{self, Event, KeyEventKind};

/// Key codes the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    /// A printable character.
    Char(char),
    /// Function key.
    F(u8),
    /// Backspace.
    Backspace,
    /// Enter.
    Enter,
    /// Left arrow.
    Left,
    /// Right arrow.
    Right,
    /// Up arrow.
    Up,
    /// Down arrow.
    Down,
    /// Home.
    Home,
    /// End.
    End,
    /// Page up.
    PageUp,
    /// Page down.
    PageDown,
    /// Tab.
    Tab,
    /// Shift+Tab.
    BackTab,
    /// Delete.
    Delete,
    /// Insert.
    Insert,
    /// Escape.
    Esc,
}

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeyModifiers {
    /// Shift.
    pub shift: bool,
    /// Control.
    pub control: bool,
    /// Alt/Option.
    pub alt: bool,
    /// Super/Command.
    pub super_key: bool,
}

impl KeyModifiers {
    /// No modifiers.
    pub const NONE: Self = Self {
        shift: false,
        control: false,
        alt: false,
        super_key: false,
    };

    /// Check if any modifier is held.
    pub const fn any(&self) -> bool {
        self.shift || self.control || self.alt || self.super_key
    }

    fn from_crossterm(mods: event::KeyModifiers) -> Self {
        Self {
            shift: mods.contains(event::KeyModifiers::SHIFT),
            control: mods.contains(event::KeyModifiers::CONTROL),
            alt: mods.contains(event::KeyModifiers::ALT),
            super_key: mods.contains(event::KeyModifiers::SUPER),
        }
    }
}

/// Mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseButton {
    /// Left.
    Left,
    /// Right.
    Right,
    /// Middle.
    Middle,
}

/// Kind of pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseKind {
    /// Button pressed.
    Down(MouseButton),
    /// Button released.
    Up(MouseButton),
    /// Moved, optionally dragging a button.
    Move(Option<MouseButton>),
    /// Wheel; positive is up.
    Scroll(i16),
}

/// Pointer event in cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    /// Column.
    pub x: i32,
    /// Row.
    pub y: i32,
    /// What happened.
    pub kind: MouseKind,
    /// Modifiers held.
    pub modifiers: KeyModifiers,
}

/// One semantic input event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// Key press.
    Key {
        /// The key.
        code: KeyCode,
        /// Modifiers held.
        modifiers: KeyModifiers,
    },
    /// Pointer event.
    Mouse(MouseEvent),
    /// Viewport resized.
    Resize {
        /// Columns.
        cols: i32,
        /// Rows.
        rows: i32,
    },
    /// Terminal gained focus.
    FocusGained,
    /// Terminal lost focus.
    FocusLost,
    /// Bracketed paste.
    Paste(String),
}

impl InputEvent {
    /// Decode one crossterm event. Key releases, repeats and unmapped keys
    /// yield `None`.
    pub fn from_crossterm(event: Event) -> Option<Self> {
        match event {
            Event::Key(key) => {
                if key.kind != KeyEventKind::Press {
                    return None;
                }
                Some(Self::Key {
                    code: key_code(key.code)?,
                    modifiers: KeyModifiers::from_crossterm(key.modifiers),
                })
            }
            Event::Mouse(mouse) => {
                let kind = match mouse.kind {
                    event::MouseEventKind::Down(b) => MouseKind::Down(mouse_button(b)),
                    event::MouseEventKind::Up(b) => MouseKind::Up(mouse_button(b)),
                    event::MouseEventKind::Drag(b) => MouseKind::Move(Some(mouse_button(b))),
                    event::MouseEventKind::Moved => MouseKind::Move(None),
                    event::MouseEventKind::ScrollUp => MouseKind::Scroll(1),
                    event::MouseEventKind::ScrollDown => MouseKind::Scroll(-1),
                    _ => return None,
                };
                Some(Self::Mouse(MouseEvent {
                    x: i32::from(mouse.column),
                    y: i32::from(mouse.row),
                    kind,
                    modifiers: KeyModifiers::from_crossterm(mouse.modifiers),
                }))
            }
            Event::Resize(cols, rows) => Some(Self::Resize {
                cols: i32::from(cols),
                rows: i32::from(rows),
            }),
            Event::FocusGained => Some(Self::FocusGained),
            Event::FocusLost => Some(Self::FocusLost),
            Event::Paste(text) => Some(Self::Paste(text)),
        }
    }

    /// Pointer position, if this is a pointer event.
    pub const fn position(&self) -> Option<(i32, i32)> {
        match self {
            Self::Mouse(m) => Some((m.x, m.y)),
            _ => None,
        }
    }
}

/// Decode a backend batch, dropping events with no semantic meaning.
pub fn decode_batch(events: impl IntoIterator<Item = Event>) -> Vec<InputEvent> {
    events
        .into_iter()
        .filter_map(InputEvent::from_crossterm)
        .collect()
}

fn key_code(code: event::KeyCode) -> Option<KeyCode> {
    Some(match code {
        event::KeyCode::Char(c) => KeyCode::Char(c),
        event::KeyCode::F(n) => KeyCode::F(n),
        event::KeyCode::Backspace => KeyCode::Backspace,
        event::KeyCode::Enter => KeyCode::Enter,
        event::KeyCode::Left => KeyCode::Left,
        event::KeyCode::Right => KeyCode::Right,
        event::KeyCode::Up => KeyCode::Up,
        event::KeyCode::Down => KeyCode::Down,
        event::KeyCode::Home => KeyCode::Home,
        event::KeyCode::End => KeyCode::End,
        event::KeyCode::PageUp => KeyCode::PageUp,
        event::KeyCode::PageDown => KeyCode::PageDown,
        event::KeyCode::Tab => KeyCode::Tab,
        event::KeyCode::BackTab => KeyCode::BackTab,
        event::KeyCode::Delete => KeyCode::Delete,
        event::KeyCode::Insert => KeyCode::Insert,
        event::KeyCode::Esc => KeyCode::Esc,
        _ => return None,
    })
}

const fn mouse_button(button: event::MouseButton) -> MouseButton {
    match button {
        event::MouseButton::Left => MouseButton::Left,
        event::MouseButton::Right => MouseButton::Right,
        event::MouseButton::Middle => MouseButton::Middle,
    }
}
