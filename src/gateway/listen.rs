use crate::infra::settings::DEFAULT_RELAY_PORT;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ParsedListenAddress {
    pub(crate) host: String,
    pub(crate) port: u16,
}

pub(crate) fn is_wildcard_host(host: &str) -> bool {
    matches!(host.trim(), "0.0.0.0" | "::")
}

pub(crate) fn format_host_port(host: &str, port: u16) -> String {
    if host.contains(':') {
        format!("[{host}]:{port}")
    } else {
        format!("{host}:{port}")
    }
}

/// Host used when printing a reachable base url for a bound address.
pub(crate) fn display_host(bind_host: &str) -> &str {
    if is_wildcard_host(bind_host) {
        "127.0.0.1"
    } else {
        bind_host
    }
}

fn parse_port(raw: &str) -> Result<u16, String> {
    raw.trim()
        .parse::<u16>()
        .map_err(|_| "invalid listen port".to_string())
}

pub(crate) fn parse_listen_address(input: &str) -> Result<ParsedListenAddress, String> {
    let raw = input.trim();
    if raw.is_empty() {
        return Ok(ParsedListenAddress {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_RELAY_PORT,
        });
    }
    if raw.contains("://") || raw.contains('/') {
        return Err("listen address must be host or host:port".to_string());
    }

    if let Some(rest) = raw.strip_prefix('[') {
        let idx = rest
            .find(']')
            .ok_or_else(|| "invalid IPv6 address: missing closing ']'".to_string())?;
        let host = rest[..idx].trim();
        if host.is_empty() {
            return Err("listen address missing host".to_string());
        }
        let tail = rest[idx + 1..].trim();
        if tail.is_empty() {
            return Ok(ParsedListenAddress {
                host: host.to_string(),
                port: DEFAULT_RELAY_PORT,
            });
        }
        let port_raw = tail
            .strip_prefix(':')
            .ok_or_else(|| "listen address must be [ipv6]:port".to_string())?;
        return Ok(ParsedListenAddress {
            host: host.to_string(),
            port: parse_port(port_raw)?,
        });
    }

    let parts: Vec<&str> = raw.split(':').collect();
    if parts.len() == 1 {
        return Ok(ParsedListenAddress {
            host: raw.to_string(),
            port: DEFAULT_RELAY_PORT,
        });
    }
    if parts.len() == 2 {
        let host = parts[0].trim();
        if host.is_empty() {
            return Err("listen address missing host".to_string());
        }
        return Ok(ParsedListenAddress {
            host: host.to_string(),
            port: parse_port(parts[1])?,
        });
    }

    Err("IPv6 must use [addr]:port".to_string())
}
