use std::{
    net::{SocketAddr, TcpStream},
    thread,
    time::Duration,
};

use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevServerWait {
    Ready { attempts: u32 },
    Exhausted { attempts: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub probe_timeout: Duration,
    pub max_attempts: u32,
}

pub fn parse_dev_server_url(raw: &str) -> Result<Url, String> {
    let parsed = Url::parse(raw.trim())
        .map_err(|error| format!("Invalid dev server URL '{raw}': {error}"))?;
    match parsed.scheme() {
        "http" | "https" => {}
        scheme => {
            return Err(format!(
                "Unsupported dev server URL scheme '{scheme}', only http/https are allowed."
            ))
        }
    }
    if parsed.host_str().is_none() {
        return Err(format!("Dev server URL '{raw}' has no host."));
    }
    Ok(parsed)
}

fn socket_addrs(url: &Url) -> Vec<SocketAddr> {
    url.socket_addrs(|| url.port_or_known_default()).unwrap_or_default()
}

/// One TCP connect attempt against every address the URL resolves to.
pub fn probe_dev_server(url: &Url, timeout: Duration) -> bool {
    socket_addrs(url)
        .iter()
        .any(|addr| TcpStream::connect_timeout(addr, timeout).is_ok())
}

/// Polls until `probe` succeeds or the attempt budget is spent, whichever comes first.
pub fn wait_for_dev_server<P, F>(policy: PollPolicy, probe: P, log: F) -> DevServerWait
where
    P: Fn() -> bool,
    F: Fn(&str),
{
    for attempt in 1..=policy.max_attempts {
        if probe() {
            return DevServerWait::Ready { attempts: attempt };
        }
        if attempt == 1 || attempt % 10 == 0 {
            log(&format!(
                "dev server not reachable yet (attempt {attempt}/{})",
                policy.max_attempts
            ));
        }
        if attempt < policy.max_attempts {
            thread::sleep(policy.interval);
        }
    }
    DevServerWait::Exhausted {
        attempts: policy.max_attempts,
    }
}

/// User-facing message for a wait that ended without reaching the server.
pub fn dev_server_wait_report(url: &Url, wait: DevServerWait) -> Option<String> {
    match wait {
        DevServerWait::Ready { .. } => None,
        DevServerWait::Exhausted { attempts } => Some(format!(
            "The development server at {url} did not respond after {attempts} attempts.\n\nStart it and reload the window."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{cell::Cell, net::TcpListener};

    fn fast_policy(max_attempts: u32) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            probe_timeout: Duration::from_millis(200),
            max_attempts,
        }
    }

    #[test]
    fn probe_dev_server_connects_to_listening_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        let port = listener.local_addr().expect("listener addr").port();
        let url = parse_dev_server_url(&format!("http://127.0.0.1:{port}")).expect("parse url");

        assert!(probe_dev_server(&url, Duration::from_millis(400)));
    }

    #[test]
    fn probe_dev_server_fails_for_closed_port() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
            listener.local_addr().expect("listener addr").port()
        };
        let url = parse_dev_server_url(&format!("http://127.0.0.1:{port}")).expect("parse url");

        assert!(!probe_dev_server(&url, Duration::from_millis(200)));
    }

    #[test]
    fn wait_for_dev_server_returns_as_soon_as_probe_succeeds() {
        let calls = Cell::new(0);
        let result = wait_for_dev_server(
            fast_policy(40),
            || {
                calls.set(calls.get() + 1);
                calls.get() == 3
            },
            |_| {},
        );

        assert_eq!(result, DevServerWait::Ready { attempts: 3 });
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn wait_for_dev_server_gives_up_after_budget() {
        let calls = Cell::new(0);
        let result = wait_for_dev_server(
            fast_policy(5),
            || {
                calls.set(calls.get() + 1);
                false
            },
            |_| {},
        );

        assert_eq!(result, DevServerWait::Exhausted { attempts: 5 });
        assert_eq!(calls.get(), 5);
    }

    #[test]
    fn parse_dev_server_url_rejects_non_http_urls() {
        assert!(parse_dev_server_url("http://localhost:5173").is_ok());
        assert!(parse_dev_server_url("file:///tmp/index.html").is_err());
        assert!(parse_dev_server_url("not a url").is_err());
    }

    #[test]
    fn dev_server_wait_report_only_describes_exhausted_waits() {
        let url = parse_dev_server_url("http://localhost:5173").expect("parse url");

        assert_eq!(
            dev_server_wait_report(&url, DevServerWait::Ready { attempts: 2 }),
            None
        );
        let report = dev_server_wait_report(&url, DevServerWait::Exhausted { attempts: 40 })
            .expect("exhausted wait should be reported");
        assert!(report.contains("http://localhost:5173/"));
        assert!(report.contains("40 attempts"));
    }
}
