use crate::clipboard::{clip_preview, ClipboardStore};
use crate::settings::Settings;
use crate::usage::UsageStore;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Frequent,
    Pinned,
    Clipboard,
    Shortcuts,
}

/// One selectable row of the popup. Built fresh for every menu, never
/// persisted. `key` is the launch path for launchable rows and the full
/// clip text for clipboard rows.
#[derive(Debug, Clone, PartialEq)]
pub struct MenuItem {
    pub label: String,
    pub icon: Option<String>,
    pub key: String,
    pub args: Vec<String>,
    pub kind: SectionKind,
    pub quick_index: Option<u8>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub kind: SectionKind,
    pub items: Vec<MenuItem>,
}

fn next_quick(counter: &mut u8) -> Option<u8> {
    if *counter > 9 {
        return None;
    }
    let index = *counter;
    *counter += 1;
    Some(index)
}

/// Assemble the popup content. Sections appear in a fixed order and empty
/// ones are dropped. Quick-select digits 1 to 9 run across frequent items
/// first, then pinned ones; clipboard and shortcut rows never get a digit.
pub fn build_sections(
    settings: &Settings,
    usage: &UsageStore,
    clips: &ClipboardStore,
    now: DateTime<Utc>,
) -> Vec<Section> {
    let pinned_keys = settings.pinned_keys();
    let mut quick = 1u8;

    let frequent: Vec<MenuItem> = usage
        .top_n(settings.max_frequent, now)
        .into_iter()
        .filter(|(key, _, _)| !pinned_keys.contains(key.as_str()))
        .map(|(key, record, score)| MenuItem {
            label: if record.display_name.is_empty() {
                key.clone()
            } else {
                record.display_name.clone()
            },
            icon: None,
            key: key.clone(),
            args: Vec::new(),
            kind: SectionKind::Frequent,
            quick_index: next_quick(&mut quick),
            detail: Some(format!("{:.2}", score)),
        })
        .collect();

    let pinned: Vec<MenuItem> = settings
        .pinned
        .iter()
        .map(|item| MenuItem {
            label: item.name.clone(),
            icon: item.icon.clone(),
            key: item.path.clone(),
            args: item.args.clone(),
            kind: SectionKind::Pinned,
            quick_index: next_quick(&mut quick),
            detail: None,
        })
        .collect();

    let clipboard: Vec<MenuItem> = clips
        .ranked()
        .into_iter()
        .filter(|entry| entry.is_hot(now))
        .take(settings.max_clipboard_display)
        .map(|entry| MenuItem {
            label: clip_preview(&entry.text, entry.count),
            icon: None,
            key: entry.text.clone(),
            args: Vec::new(),
            kind: SectionKind::Clipboard,
            quick_index: None,
            detail: None,
        })
        .collect();

    let shortcuts: Vec<MenuItem> = settings
        .shortcuts
        .iter()
        .map(|item| MenuItem {
            label: item.name.clone(),
            icon: item.icon.clone(),
            key: item.path.clone(),
            args: item.args.clone(),
            kind: SectionKind::Shortcuts,
            quick_index: None,
            detail: None,
        })
        .collect();

    let mut sections = Vec::new();
    if !frequent.is_empty() {
        sections.push(Section {
            title: "Frequent",
            kind: SectionKind::Frequent,
            items: frequent,
        });
    }
    if !pinned.is_empty() {
        sections.push(Section {
            title: "Pinned",
            kind: SectionKind::Pinned,
            items: pinned,
        });
    }
    if !clipboard.is_empty() {
        sections.push(Section {
            title: "Clipboard",
            kind: SectionKind::Clipboard,
            items: clipboard,
        });
    }
    if !shortcuts.is_empty() {
        sections.push(Section {
            title: "Shortcuts",
            kind: SectionKind::Shortcuts,
            items: shortcuts,
        });
    }
    sections
}
