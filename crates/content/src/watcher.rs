// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Watches the content tree for file changes using `notify`, translating
//! raw filesystem events into [`FsChange`]s scoped to content paths
//! (§4.7 "Watches the content tree").

use mud_core::ContentPath;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::Path;
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FsChange {
    Modified(ContentPath),
    Removed(ContentPath),
}

/// Start watching `content_root` recursively. The returned watcher must be
/// kept alive for as long as events should keep flowing; dropping it stops
/// the watch.
pub fn spawn_watcher(content_root: &Path) -> Result<(RecommendedWatcher, mpsc::Receiver<FsChange>), notify::Error> {
    let (tx, rx) = mpsc::channel(256);
    let root = content_root.to_path_buf();

    let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
        let Ok(event) = res else { return };
        for change in translate_event(&root, &event) {
            let _ = tx.blocking_send(change);
        }
    })?;
    watcher.watch(content_root, RecursiveMode::Recursive)?;
    Ok((watcher, rx))
}

fn translate_event(root: &Path, event: &Event) -> Vec<FsChange> {
    let removed = matches!(event.kind, EventKind::Remove(_));
    let relevant = removed || matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_));
    if !relevant {
        return Vec::new();
    }
    event
        .paths
        .iter()
        .filter_map(|path| to_content_path(root, path))
        .map(|path| if removed { FsChange::Removed(path) } else { FsChange::Modified(path) })
        .collect()
}

/// Map an absolute filesystem path under `root` to a `/`-rooted content
/// path, e.g. `root/domain/room.mud` -> `/domain/room.mud`.
fn to_content_path(root: &Path, path: &Path) -> Option<ContentPath> {
    let relative = path.strip_prefix(root).ok()?;
    let mut content_path = String::from("/");
    content_path.push_str(&relative.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
    Some(ContentPath::new(content_path))
}
