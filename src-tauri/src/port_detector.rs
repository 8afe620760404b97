//! Scans free-form backend console output for the address announcement and
//! for bind-conflict notices.

const ADDRESS_MARKERS: [&str; 2] = ["Address", "주소"];
const ADDRESS_IN_USE_PHRASES: [&str; 4] = [
    "address already in use",
    "only one usage of each socket address",
    "error while attempting to bind",
    "이미 사용 중",
];

/// Returns the port of the first `Address: http://<host>:<port>` announcement in `line`.
pub fn detect_port(line: &str) -> Option<u16> {
    let mut candidates: Vec<(usize, &str)> = ADDRESS_MARKERS
        .iter()
        .flat_map(|marker| {
            line.match_indices(marker)
                .map(|(index, matched)| (index, &line[index + matched.len()..]))
        })
        .collect();
    candidates.sort_by_key(|(index, _)| *index);
    // A marker may be a false start ("Address family ..."), so keep scanning.
    candidates
        .into_iter()
        .find_map(|(_, rest)| parse_announcement(rest))
}

fn parse_announcement(rest: &str) -> Option<u16> {
    let rest = rest.trim_start().strip_prefix(':')?.trim_start();
    let scheme_len = ["http://", "https://"]
        .iter()
        .find(|scheme| {
            rest.get(..scheme.len())
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case(scheme))
        })
        .map(|scheme| scheme.len())?;
    let authority = rest[scheme_len..]
        .split(|c: char| c.is_whitespace() || matches!(c, '/' | '?' | '#'))
        .next()?;
    let port = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after_host) = bracketed.split_once(']')?;
        if host.is_empty() {
            return None;
        }
        after_host.strip_prefix(':')?
    } else {
        let (host, port) = authority.rsplit_once(':')?;
        if host.is_empty() || host.contains(['[', ']']) {
            return None;
        }
        port
    };
    if port.is_empty() || !port.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    match port.parse::<u16>() {
        Ok(port) if port > 0 => Some(port),
        _ => None,
    }
}

pub fn detect_address_in_use(line: &str) -> bool {
    let lowered = line.to_lowercase();
    ADDRESS_IN_USE_PHRASES
        .iter()
        .any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_port_reads_english_announcement() {
        assert_eq!(detect_port("Address: http://127.0.0.1:8001"), Some(8001));
    }

    #[test]
    fn detect_port_reads_localized_announcement() {
        assert_eq!(detect_port("📍 주소: http://127.0.0.1:8000"), Some(8000));
    }

    #[test]
    fn detect_port_tolerates_extra_whitespace_and_trailing_text() {
        assert_eq!(
            detect_port("  INFO   Address :   http://localhost:8123/docs  (ready)\r"),
            Some(8123)
        );
    }

    #[test]
    fn detect_port_skips_false_start_markers() {
        assert_eq!(
            detect_port("Address family ok; Address: http://127.0.0.1:9001"),
            Some(9001)
        );
    }

    #[test]
    fn detect_port_returns_first_announcement() {
        assert_eq!(
            detect_port("Address: http://127.0.0.1:8001 Address: http://127.0.0.1:8002"),
            Some(8001)
        );
    }

    #[test]
    fn detect_port_handles_ipv6_hosts() {
        assert_eq!(detect_port("Address: http://[::1]:8004"), Some(8004));
    }

    #[test]
    fn detect_port_rejects_malformed_lines() {
        let malformed = [
            "",
            "Address",
            "Address:",
            "Address: ",
            "Address: http://",
            "Address: http://127.0.0.1",
            "Address: http://127.0.0.1:",
            "Address: http://127.0.0.1:abc",
            "Address: http://127.0.0.1:0",
            "Address: http://127.0.0.1:99999",
            "Address: ftp://127.0.0.1:8001",
            "Address: http://:8001",
            "Address: http://[::1]",
            "Address: http://[::1]8001",
            "Address: http://[]:8001",
            "Address: http://127.0.0.1:8001abc",
            "address: http://127.0.0.1:8001",
            "INFO: Uvicorn running on http://127.0.0.1:8001",
            "\u{0}\u{ffff}Address:\u{1b}[0m",
            "주소",
        ];
        for line in malformed {
            assert_eq!(detect_port(line), None, "line should not match: {line:?}");
        }
    }

    #[test]
    fn detect_address_in_use_matches_known_phrasings() {
        assert!(detect_address_in_use(
            "ERROR: [Errno 98] Address already in use"
        ));
        assert!(detect_address_in_use(
            "[WinError 10048] Only one usage of each socket address is normally permitted"
        ));
        assert!(detect_address_in_use(
            "error while attempting to bind on address ('127.0.0.1', 8000)"
        ));
        assert!(detect_address_in_use("포트 8000이 이미 사용 중입니다"));
        assert!(!detect_address_in_use("Address: http://127.0.0.1:8000"));
    }
}
