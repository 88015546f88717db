use crate::error::LaunchError;
use std::process::{Command, Stdio};
use std::sync::OnceLock;

/// How the host platform opens a URL in the default browser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Opener {
    pub program: &'static str,
    pub args: &'static [&'static str],
}

static PLATFORM_OPENER: OnceLock<Option<Opener>> = OnceLock::new();

/// Resolve the opener for the current platform once. `None` on platforms without one.
pub fn platform_opener() -> Option<&'static Opener> {
    PLATFORM_OPENER
        .get_or_init(|| opener_for(std::env::consts::OS))
        .as_ref()
}

fn opener_for(os: &str) -> Option<Opener> {
    match os {
        "macos" => Some(Opener {
            program: "open",
            args: &[],
        }),
        "linux" | "freebsd" | "openbsd" | "netbsd" => Some(Opener {
            program: "xdg-open",
            args: &[],
        }),
        "windows" => Some(Opener {
            program: "rundll32",
            args: &["url.dll,FileProtocolHandler"],
        }),
        _ => None,
    }
}

/// Spawn the platform opener for `url` without waiting on it.
///
/// Failure is normal on headless hosts; callers only report it.
pub fn open_url(url: &str) -> Result<(), LaunchError> {
    let opener = platform_opener().ok_or(LaunchError::Unsupported)?;
    Command::new(opener.program)
        .args(opener.args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map(|_| ())
        .map_err(|source| LaunchError::Spawn {
            program: opener.program,
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selects_native_opener_per_platform() {
        assert_eq!(opener_for("macos").map(|o| o.program), Some("open"));
        assert_eq!(opener_for("linux").map(|o| o.program), Some("xdg-open"));
        let win = opener_for("windows").unwrap();
        assert_eq!(win.program, "rundll32");
        assert_eq!(win.args, &["url.dll,FileProtocolHandler"]);
        assert_eq!(opener_for("haiku"), None);
    }

    #[test]
    fn platform_opener_is_resolved_once() {
        let first = platform_opener();
        let second = platform_opener();
        assert_eq!(first, opener_for(std::env::consts::OS).as_ref());
        if let (Some(a), Some(b)) = (first, second) {
            assert!(std::ptr::eq(a, b));
        }
    }
}
