//! Attribution of clipboard payloads to the application that produced them.

use crate::source::ClipboardSource;

pub trait SourceResolver: Send + Sync {
    /// Best guess at the application behind the current clipboard content.
    fn resolve(&self) -> Option<ClipboardSource>;
}

impl<F> SourceResolver for F
where
    F: Fn() -> Option<ClipboardSource> + Send + Sync,
{
    fn resolve(&self) -> Option<ClipboardSource> {
        self()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoSource;

impl SourceResolver for NoSource {
    fn resolve(&self) -> Option<ClipboardSource> {
        None
    }
}

/// Owner of the foreground window at the time of the update.
///
/// Only Windows exposes a foreground window; elsewhere this never attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForegroundProcess;

impl SourceResolver for ForegroundProcess {
    fn resolve(&self) -> Option<ClipboardSource> {
        foreground_pid().and_then(process_source)
    }
}

#[cfg(target_os = "windows")]
fn foreground_pid() -> Option<u32> {
    crate::clipboard::windows::foreground_pid()
}

#[cfg(not(target_os = "windows"))]
fn foreground_pid() -> Option<u32> {
    None
}

fn process_source(pid: u32) -> Option<ClipboardSource> {
    use sysinfo::{Pid, System};

    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    if !system.refresh_process(pid) {
        tracing::trace!(%pid, "foreground process vanished before lookup");
        return None;
    }
    let process = system.process(pid)?;
    let source = ClipboardSource::new(app_name(process.name())).ok()?;
    Some(match process.exe() {
        Some(exe) => source.with_icon_path(exe),
        None => source,
    })
}

fn app_name(process_name: &str) -> &str {
    let stem_len = process_name.len().saturating_sub(4);
    match process_name.get(stem_len..) {
        Some(suffix) if stem_len > 0 && suffix.eq_ignore_ascii_case(".exe") => &process_name[..stem_len],
        _ => process_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_executable_suffix() {
        assert_eq!(app_name("notepad.exe"), "notepad");
        assert_eq!(app_name("EXCEL.EXE"), "EXCEL");
        assert_eq!(app_name("firefox"), "firefox");
        assert_eq!(app_name(".exe"), ".exe");
    }

    #[test]
    fn multibyte_names_are_kept_whole() {
        assert_eq!(app_name("日本語"), "日本語");
        assert_eq!(app_name("é"), "é");
        assert_eq!(app_name("日本語.exe"), "日本語");
        assert_eq!(app_name("exé"), "exé");
    }

    #[test]
    fn closures_resolve() {
        let resolver = || ClipboardSource::new("editor").ok();
        assert_eq!(resolver.resolve().map(|s| s.app_name().to_string()), Some("editor".into()));
        assert_eq!(NoSource.resolve(), None);
    }

    #[test]
    fn current_process_is_attributable() {
        let source = process_source(std::process::id()).unwrap();
        assert!(!source.app_name().is_empty());
        assert!(!source.app_name().to_ascii_lowercase().ends_with(".exe"));
    }

    #[cfg(not(target_os = "windows"))]
    #[test]
    fn no_foreground_window_off_windows() {
        assert_eq!(ForegroundProcess.resolve(), None);
    }
}
