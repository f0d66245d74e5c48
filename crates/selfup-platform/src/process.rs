use std::ffi::OsStr;
use std::process::Stdio;

#[cfg(windows)]
use std::os::windows::process::CommandExt;

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

pub trait HideWindow {
    fn hide_window(&mut self) -> &mut Self;
}

impl HideWindow for tokio::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}

/// A helper-tool command with captured output that dies with its future.
///
/// Dropping the returned child's future (for example when a timeout elapses)
/// kills the process instead of leaving it running in the background.
pub fn background_command(program: impl AsRef<OsStr>) -> tokio::process::Command {
    let mut command = tokio::process::Command::new(program);
    command
        .hide_window()
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    command
}

#[cfg(test)]
mod tests {
    use super::background_command;

    #[cfg(unix)]
    #[tokio::test]
    async fn background_command_captures_stdout() {
        let output = background_command("echo")
            .arg("/Volumes/Viewer")
            .output()
            .await
            .expect("echo should run");

        assert!(output.status.success());
        assert_eq!(
            String::from_utf8_lossy(&output.stdout).trim(),
            "/Volumes/Viewer"
        );
    }
}
