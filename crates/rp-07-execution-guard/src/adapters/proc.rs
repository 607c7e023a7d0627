//! Process liveness from the operating system.

use crate::ports::outbound::ProcessProbe;

/// `/proc/<pid>` on Linux, `kill -0` on other Unixes. Elsewhere every
/// recorded process counts as alive, so a pidfile is never reclaimed.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsProcessProbe;

impl ProcessProbe for OsProcessProbe {
    #[cfg(target_os = "linux")]
    fn is_alive(&self, pid: u32) -> bool {
        pid != 0 && std::path::Path::new(&format!("/proc/{pid}")).exists()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    fn is_alive(&self, pid: u32) -> bool {
        pid != 0
            && std::process::Command::new("kill")
                .arg("-0")
                .arg(pid.to_string())
                .stdout(std::process::Stdio::null())
                .stderr(std::process::Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(true)
    }

    #[cfg(not(unix))]
    fn is_alive(&self, _pid: u32) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_own_process_is_alive() {
        assert!(OsProcessProbe.is_alive(std::process::id()));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_unused_pid_is_dead() {
        // Above the kernel's pid_max ceiling.
        assert!(!OsProcessProbe.is_alive(u32::MAX));
        assert!(!OsProcessProbe.is_alive(0));
    }
}
