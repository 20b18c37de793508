//! Environment signals and their classification into violations.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A subscription channel the proctoring monitor attaches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalKind {
    Visibility,
    Focus,
    Fullscreen,
    Clipboard,
    ContextMenu,
    Keyboard,
}

impl SignalKind {
    pub const ALL: [SignalKind; 6] = [
        SignalKind::Visibility,
        SignalKind::Focus,
        SignalKind::Fullscreen,
        SignalKind::Clipboard,
        SignalKind::ContextMenu,
        SignalKind::Keyboard,
    ];
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::Visibility => "visibility",
            SignalKind::Focus => "focus",
            SignalKind::Fullscreen => "fullscreen",
            SignalKind::Clipboard => "clipboard",
            SignalKind::ContextMenu => "context-menu",
            SignalKind::Keyboard => "keyboard",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipboardAction {
    Copy,
    Cut,
    Paste,
}

impl fmt::Display for ClipboardAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClipboardAction::Copy => write!(f, "copy"),
            ClipboardAction::Cut => write!(f, "cut"),
            ClipboardAction::Paste => write!(f, "paste"),
        }
    }
}

/// A key press with its modifiers, e.g. `Ctrl+Shift+I`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct KeyChord {
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
    pub meta: bool,
    /// Upper-cased key name (`"C"`, `"F12"`).
    pub key: String,
}

impl KeyChord {
    pub fn key(key: &str) -> Self {
        Self {
            ctrl: false,
            alt: false,
            shift: false,
            meta: false,
            key: key.to_uppercase(),
        }
    }

    pub fn ctrl(key: &str) -> Self {
        Self {
            ctrl: true,
            ..Self::key(key)
        }
    }

    pub fn meta(key: &str) -> Self {
        Self {
            meta: true,
            ..Self::key(key)
        }
    }
}

impl fmt::Display for KeyChord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("Ctrl+")?;
        }
        if self.meta {
            f.write_str("Meta+")?;
        }
        if self.alt {
            f.write_str("Alt+")?;
        }
        if self.shift {
            f.write_str("Shift+")?;
        }
        f.write_str(&self.key)
    }
}

impl FromStr for KeyChord {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chord = KeyChord::key("");
        let parts: Vec<&str> = s.split('+').map(str::trim).collect();
        let Some((key, modifiers)) = parts.split_last() else {
            return Err(format!("empty key chord: '{s}'"));
        };
        if key.is_empty() {
            return Err(format!("key chord has no key: '{s}'"));
        }
        for modifier in modifiers {
            match modifier.to_lowercase().as_str() {
                "ctrl" | "control" => chord.ctrl = true,
                "alt" | "option" => chord.alt = true,
                "shift" => chord.shift = true,
                "meta" | "cmd" | "command" | "super" => chord.meta = true,
                other => return Err(format!("unknown modifier '{other}' in '{s}'")),
            }
        }
        chord.key = key.to_uppercase();
        Ok(chord)
    }
}

/// Shortcuts that end the session on first use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyBlocklist {
    chords: BTreeSet<KeyChord>,
}

impl KeyBlocklist {
    pub fn empty() -> Self {
        Self {
            chords: BTreeSet::new(),
        }
    }

    pub fn insert(&mut self, chord: KeyChord) {
        self.chords.insert(chord);
    }

    pub fn contains(&self, chord: &KeyChord) -> bool {
        self.chords.contains(chord)
    }

    pub fn len(&self) -> usize {
        self.chords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chords.is_empty()
    }
}

impl Default for KeyBlocklist {
    /// Copy, paste, select-all, cut, save, print and view-source with either
    /// Ctrl or Meta; the developer-tools shortcuts; F12.
    fn default() -> Self {
        let mut list = Self::empty();
        for key in ["C", "V", "A", "X", "S", "P", "U"] {
            list.insert(KeyChord::ctrl(key));
            list.insert(KeyChord::meta(key));
        }
        for key in ["I", "J", "C"] {
            list.insert(KeyChord {
                shift: true,
                ..KeyChord::ctrl(key)
            });
        }
        for key in ["I", "J", "C", "U"] {
            list.insert(KeyChord {
                alt: true,
                ..KeyChord::meta(key)
            });
        }
        list.insert(KeyChord::key("F12"));
        list
    }
}

impl Extend<KeyChord> for KeyBlocklist {
    fn extend<I: IntoIterator<Item = KeyChord>>(&mut self, iter: I) {
        self.chords.extend(iter);
    }
}

/// Something the environment reported while a session was running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "signal", rename_all = "kebab-case")]
pub enum EnvironmentSignal {
    VisibilityChanged { hidden: bool },
    FocusLost,
    FullscreenExited,
    Clipboard { action: ClipboardAction },
    ContextMenu,
    KeyPressed { chord: KeyChord },
}

impl EnvironmentSignal {
    /// The subscription channel that delivers this signal.
    pub fn kind(&self) -> SignalKind {
        match self {
            EnvironmentSignal::VisibilityChanged { .. } => SignalKind::Visibility,
            EnvironmentSignal::FocusLost => SignalKind::Focus,
            EnvironmentSignal::FullscreenExited => SignalKind::Fullscreen,
            EnvironmentSignal::Clipboard { .. } => SignalKind::Clipboard,
            EnvironmentSignal::ContextMenu => SignalKind::ContextMenu,
            EnvironmentSignal::KeyPressed { .. } => SignalKind::Keyboard,
        }
    }

    /// Map a signal to the violation it represents, if any.
    pub fn classify(&self, blocklist: &KeyBlocklist) -> Option<Violation> {
        let kind = match self {
            EnvironmentSignal::VisibilityChanged { hidden: true } => ViolationKind::TabSwitch,
            EnvironmentSignal::VisibilityChanged { hidden: false } => return None,
            EnvironmentSignal::FocusLost => ViolationKind::FocusLoss,
            EnvironmentSignal::FullscreenExited => ViolationKind::FullscreenExit,
            EnvironmentSignal::Clipboard { action } => ViolationKind::Clipboard(*action),
            EnvironmentSignal::ContextMenu => ViolationKind::ContextMenu,
            EnvironmentSignal::KeyPressed { chord } => {
                if !blocklist.contains(chord) {
                    return None;
                }
                ViolationKind::BlockedShortcut(chord.to_string())
            }
        };
        Some(Violation {
            severity: kind.severity(),
            kind,
        })
    }
}

impl FromStr for EnvironmentSignal {
    type Err = String;

    /// Parses the names used in session scripts, e.g. `visibility-hidden`,
    /// `blur`, `copy`, `context-menu`. Key presses use their own chord syntax.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let signal = match s.trim().to_lowercase().as_str() {
            "visibility-hidden" | "hidden" | "tab-switch" => {
                EnvironmentSignal::VisibilityChanged { hidden: true }
            }
            "visibility-visible" | "visible" => EnvironmentSignal::VisibilityChanged { hidden: false },
            "blur" | "focus-lost" => EnvironmentSignal::FocusLost,
            "fullscreen-exit" | "fullscreen-exited" => EnvironmentSignal::FullscreenExited,
            "copy" => EnvironmentSignal::Clipboard {
                action: ClipboardAction::Copy,
            },
            "cut" => EnvironmentSignal::Clipboard {
                action: ClipboardAction::Cut,
            },
            "paste" => EnvironmentSignal::Clipboard {
                action: ClipboardAction::Paste,
            },
            "context-menu" | "right-click" => EnvironmentSignal::ContextMenu,
            other => return Err(format!("unknown signal: {other}")),
        };
        Ok(signal)
    }
}

/// Soft violations warn first; hard violations end the session at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Soft,
    Hard,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViolationKind {
    TabSwitch,
    FocusLoss,
    FullscreenExit,
    Clipboard(ClipboardAction),
    ContextMenu,
    BlockedShortcut(String),
}

impl ViolationKind {
    pub fn severity(&self) -> Severity {
        match self {
            ViolationKind::TabSwitch | ViolationKind::FocusLoss | ViolationKind::FullscreenExit => {
                Severity::Soft
            }
            ViolationKind::Clipboard(_)
            | ViolationKind::ContextMenu
            | ViolationKind::BlockedShortcut(_) => Severity::Hard,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ViolationKind::TabSwitch => write!(f, "switching tabs"),
            ViolationKind::FocusLoss => write!(f, "leaving the test window"),
            ViolationKind::FullscreenExit => write!(f, "exiting fullscreen"),
            ViolationKind::Clipboard(action) => write!(f, "clipboard {action}"),
            ViolationKind::ContextMenu => write!(f, "right-clicking"),
            ViolationKind::BlockedShortcut(chord) => write!(f, "the {chord} shortcut"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    pub severity: Severity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chord_parse_and_display() {
        let chord: KeyChord = "ctrl+shift+i".parse().unwrap();
        assert!(chord.ctrl && chord.shift && !chord.alt && !chord.meta);
        assert_eq!(chord.key, "I");
        assert_eq!(chord.to_string(), "Ctrl+Shift+I");
        assert_eq!("Cmd+Option+J".parse::<KeyChord>().unwrap().to_string(), "Meta+Alt+J");
        assert_eq!("F12".parse::<KeyChord>().unwrap(), KeyChord::key("F12"));
        assert!("Hyper+X".parse::<KeyChord>().is_err());
        assert!("Ctrl+".parse::<KeyChord>().is_err());
    }

    #[test]
    fn default_blocklist() {
        let list = KeyBlocklist::default();
        for s in ["Ctrl+C", "Meta+V", "Ctrl+A", "Ctrl+S", "Ctrl+P", "Ctrl+U", "Ctrl+Shift+J", "Meta+Alt+I", "F12"] {
            assert!(list.contains(&s.parse().unwrap()), "{s} should be blocked");
        }
        assert!(!list.contains(&"Ctrl+Z".parse().unwrap()));
        assert!(!list.contains(&KeyChord::key("C")));
    }

    #[test]
    fn classification() {
        let list = KeyBlocklist::default();
        let soft = EnvironmentSignal::VisibilityChanged { hidden: true }
            .classify(&list)
            .unwrap();
        assert_eq!(soft.severity, Severity::Soft);
        assert!(EnvironmentSignal::VisibilityChanged { hidden: false }
            .classify(&list)
            .is_none());
        assert_eq!(
            EnvironmentSignal::FocusLost.classify(&list).unwrap().severity,
            Severity::Soft
        );
        assert_eq!(
            EnvironmentSignal::ContextMenu.classify(&list).unwrap().severity,
            Severity::Hard
        );
        let key = EnvironmentSignal::KeyPressed {
            chord: KeyChord::ctrl("c"),
        };
        assert_eq!(
            key.classify(&list).unwrap().kind,
            ViolationKind::BlockedShortcut("Ctrl+C".into())
        );
        let harmless = EnvironmentSignal::KeyPressed {
            chord: KeyChord::key("ArrowDown"),
        };
        assert!(harmless.classify(&list).is_none());
    }

    #[test]
    fn signal_names() {
        assert_eq!(
            "copy".parse::<EnvironmentSignal>().unwrap(),
            EnvironmentSignal::Clipboard {
                action: ClipboardAction::Copy
            }
        );
        assert_eq!("blur".parse::<EnvironmentSignal>().unwrap().kind(), SignalKind::Focus);
        assert!("teleport".parse::<EnvironmentSignal>().is_err());
    }
}
