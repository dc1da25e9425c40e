//! Echo ("ping") probes.
//!
//! [`SystemPing`] runs the operating system's `ping` utility with the target
//! passed as its own argv element, so the address never goes through a
//! shell. With the `icmp-socket` feature, [`IcmpSocket`] sends the echo
//! request directly.
use crate::error::EchoError;
use std::{
    process::{Command, Stdio},
    thread,
    time::{Duration, Instant},
};

const POLL_INTERVAL: Duration = Duration::from_millis(20);
const DEFAULT_KILL_GRACE: Duration = Duration::from_secs(1);

/// Sends one echo request to `address` and waits at most `timeout` for the
/// reply.
pub trait EchoProber: Send + Sync {
    fn echo(&self, address: &str, timeout: Duration) -> Result<(), EchoError>;
}

/// Echo through the system `ping` binary. Output is discarded.
#[derive(Debug, Clone)]
pub struct SystemPing {
    program: String,
    kill_grace: Duration,
}

impl Default for SystemPing {
    fn default() -> Self {
        Self::new(netprobe_config::settings::DEFAULT_PING_PROGRAM)
    }
}

impl SystemPing {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            kill_grace: DEFAULT_KILL_GRACE,
        }
    }

    /// How long past `timeout` the child may run before it gets killed.
    pub fn with_kill_grace(mut self, kill_grace: Duration) -> Self {
        self.kill_grace = kill_grace;
        self
    }
}

/// Arguments for a single echo with a reply timeout, per platform.
pub fn ping_args(address: &str, timeout: Duration) -> Vec<String> {
    if cfg!(target_os = "windows") {
        let millis = timeout.as_millis().max(1);
        vec![
            "-n".into(),
            "1".into(),
            "-w".into(),
            millis.to_string(),
            address.into(),
        ]
    } else if cfg!(any(
        target_os = "macos",
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd"
    )) {
        vec![
            "-c".into(),
            "1".into(),
            "-t".into(),
            whole_seconds(timeout).to_string(),
            address.into(),
        ]
    } else {
        vec![
            "-c".into(),
            "1".into(),
            "-W".into(),
            whole_seconds(timeout).to_string(),
            address.into(),
        ]
    }
}

// ping only takes whole seconds; round up so a 1.5s budget is not cut to 1s
fn whole_seconds(timeout: Duration) -> u64 {
    let secs = timeout
        .as_secs()
        .saturating_add(u64::from(timeout.subsec_nanos() > 0));
    secs.max(1)
}

impl EchoProber for SystemPing {
    fn echo(&self, address: &str, timeout: Duration) -> Result<(), EchoError> {
        let mut child = Command::new(&self.program)
            .args(ping_args(address, timeout))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| EchoError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let budget = timeout.saturating_add(self.kill_grace);
        // a budget past the end of the clock means "wait for ping to exit"
        let deadline = Instant::now().checked_add(budget);
        loop {
            if let Some(status) = child.try_wait()? {
                return if status.success() {
                    Ok(())
                } else {
                    Err(EchoError::Failed(status.to_string()))
                };
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                tracing::warn!(
                    "`{}` still running after {:?}, killing it",
                    self.program,
                    budget
                );
                let _ = child.kill();
                let _ = child.wait();
                return Err(EchoError::Timeout);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }
}

#[cfg(feature = "icmp-socket")]
pub use socket::IcmpSocket;

#[cfg(feature = "icmp-socket")]
mod socket {
    use super::EchoProber;
    use crate::error::EchoError;
    use std::net::{IpAddr, ToSocketAddrs};
    use std::time::Duration;
    use surge_ping::{Client, Config, PingIdentifier, PingSequence};

    const PAYLOAD: [u8; 8] = [0; 8];

    /// Echo from an ICMP socket. Needs `CAP_NET_RAW` or an unprivileged
    /// ICMP socket range that covers the current group.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct IcmpSocket;

    fn resolve_ipv4(address: &str) -> Result<IpAddr, EchoError> {
        (address, 0)
            .to_socket_addrs()
            .map_err(|_| EchoError::Resolve(address.to_string()))?
            .map(|addr| addr.ip())
            .find(IpAddr::is_ipv4)
            .ok_or_else(|| EchoError::Resolve(address.to_string()))
    }

    impl EchoProber for IcmpSocket {
        fn echo(&self, address: &str, timeout: Duration) -> Result<(), EchoError> {
            let ip = resolve_ipv4(address)?;
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;

            runtime.block_on(async move {
                let client = Client::new(&Config::default())?;
                let mut pinger =
                    client.pinger(ip, PingIdentifier(rand::random())).await;
                pinger.timeout(timeout);
                pinger.ping(PingSequence(0), &PAYLOAD).await?;
                Ok(())
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whole_seconds_rounds_up() {
        assert_eq!(whole_seconds(Duration::from_secs(3)), 3);
        assert_eq!(whole_seconds(Duration::from_millis(1500)), 2);
        assert_eq!(whole_seconds(Duration::from_millis(10)), 1);
        assert_eq!(whole_seconds(Duration::ZERO), 1);
        assert_eq!(whole_seconds(Duration::MAX), u64::MAX);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_args() {
        assert_eq!(
            ping_args("www.taobao.com", Duration::from_secs(3)),
            vec!["-c", "1", "-W", "3", "www.taobao.com"]
        );
    }

    #[test]
    fn address_is_last_discrete_arg() {
        let args = ping_args("example.com;reboot", Duration::from_secs(1));
        assert_eq!(args.last().map(String::as_str), Some("example.com;reboot"));
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let ping = SystemPing::new("/nonexistent/netprobe-ping");
        let result = ping.echo("127.0.0.1", Duration::from_secs(1));
        assert!(matches!(result, Err(EchoError::Spawn { .. })));
    }

    #[cfg(unix)]
    mod unix {
        use super::*;
        use serial_test::serial;
        use std::io::Write;
        use std::os::unix::fs::PermissionsExt;

        fn script(dir: &tempfile::TempDir, body: &str) -> String {
            let path = dir.path().join("fake-ping");
            {
                let mut file = std::fs::File::create(&path).unwrap();
                writeln!(file, "#!/bin/sh\n{body}").unwrap();
                file.sync_all().unwrap();
            }
            let mut perms = std::fs::metadata(&path).unwrap().permissions();
            perms.set_mode(0o755);
            std::fs::set_permissions(&path, perms).unwrap();
            path.to_string_lossy().into_owned()
        }

        #[test]
        #[serial]
        fn exit_zero_is_success() {
            let dir = tempfile::tempdir().unwrap();
            let ping = SystemPing::new(script(&dir, "exit 0"));
            assert!(ping.echo("127.0.0.1", Duration::from_secs(1)).is_ok());
        }

        #[test]
        #[serial]
        fn exit_nonzero_is_failure() {
            let dir = tempfile::tempdir().unwrap();
            let ping = SystemPing::new(script(&dir, "exit 2"));
            assert!(matches!(
                ping.echo("127.0.0.1", Duration::from_secs(1)),
                Err(EchoError::Failed(_))
            ));
        }

        #[test]
        #[serial]
        fn unbounded_timeout_waits_for_exit() {
            let dir = tempfile::tempdir().unwrap();
            let ping = SystemPing::new(script(&dir, "exit 0"));
            assert!(ping.echo("127.0.0.1", Duration::MAX).is_ok());

            let ping = SystemPing::new(script(&dir, "exit 1"))
                .with_kill_grace(Duration::MAX);
            assert!(matches!(
                ping.echo("127.0.0.1", Duration::from_secs(u64::MAX)),
                Err(EchoError::Failed(_))
            ));
        }

        #[test]
        #[serial]
        fn receives_discrete_arguments() {
            let dir = tempfile::tempdir().unwrap();
            let out = dir.path().join("args");
            let body = format!(
                "for a in \"$@\"; do echo \"$a\" >> {}; done",
                out.display()
            );
            let ping = SystemPing::new(script(&dir, &body));
            ping.echo("odd;name", Duration::from_secs(2)).unwrap();

            let recorded = std::fs::read_to_string(&out).unwrap();
            let expected = ping_args("odd;name", Duration::from_secs(2)).join("\n");
            assert_eq!(recorded.trim_end(), expected);
        }

        #[test]
        #[serial]
        fn hung_child_is_killed() {
            let dir = tempfile::tempdir().unwrap();
            let ping = SystemPing::new(script(&dir, "exec sleep 30"))
                .with_kill_grace(Duration::from_millis(100));

            let started = Instant::now();
            let result = ping.echo("127.0.0.1", Duration::from_millis(200));

            assert!(matches!(result, Err(EchoError::Timeout)));
            assert!(started.elapsed() < Duration::from_secs(5));
        }
    }
}
