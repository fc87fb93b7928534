use crate::error::DiagError;
use std::collections::HashSet;
use std::str::FromStr;

/// Ports scanned by `--all`.
pub const DEFAULT_PORTS: &[u16] = &[21, 22, 80, 443, 3306, 8000, 8080];

/// A deduplicated list of TCP ports (1..=65535), in order of first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortSpec {
    ports: Vec<u16>,
}

impl PortSpec {
    /// Build from raw ports, dropping zeros and repeated values.
    pub fn from_ports(ports: impl IntoIterator<Item = u16>) -> Self {
        let mut seen = HashSet::new();
        let ports = ports
            .into_iter()
            .filter(|&p| p != 0 && seen.insert(p))
            .collect();
        Self { ports }
    }

    pub fn default_set() -> Self {
        Self::from_ports(DEFAULT_PORTS.iter().copied())
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

impl FromStr for PortSpec {
    type Err = DiagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_ports_str(s)
    }
}

/// Parse a comma separated port list into a `PortSpec`.
///
/// Supported tokens:
/// - single port number: `80`
/// - inclusive range: `8000-8010`
/// - surrounding whitespace and empty tokens are ignored
pub fn parse_ports_str(s: &str) -> Result<PortSpec, DiagError> {
    let mut out: Vec<u16> = Vec::new();
    let mut seen = HashSet::new();

    for raw in s.split(',') {
        let token = raw.trim();
        if token.is_empty() {
            continue;
        }

        if let Some((a, b)) = token.split_once('-') {
            let start = parse_port_str(a.trim())
                .map_err(|e| DiagError::InvalidPort(format!("invalid start in range '{token}': {e}")))?;
            let end = parse_port_str(b.trim())
                .map_err(|e| DiagError::InvalidPort(format!("invalid end in range '{token}': {e}")))?;
            if start > end {
                return Err(DiagError::InvalidPort(format!(
                    "invalid range {start}-{end} (start > end)"
                )));
            }
            for p in start..=end {
                if seen.insert(p) {
                    out.push(p);
                }
            }
            continue;
        }

        let p = parse_port_str(token)
            .map_err(|e| DiagError::InvalidPort(format!("'{token}': {e}")))?;
        if seen.insert(p) {
            out.push(p);
        }
    }

    Ok(PortSpec { ports: out })
}

fn parse_port_str(s: &str) -> Result<u16, String> {
    let val: u32 = s.parse::<u32>().map_err(|e| e.to_string())?;
    if val == 0 || val > 65535 {
        return Err(format!("port out of range: {val}"));
    }
    Ok(val as u16)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_single_ports() {
        let spec = parse_ports_str("80, 22 ,443").unwrap();
        assert_eq!(spec.ports(), &[80, 22, 443]);
    }

    #[test]
    fn duplicates_collapse_to_first_appearance() {
        let spec = parse_ports_str("443,80,443,22,80").unwrap();
        assert_eq!(spec.ports(), &[443, 80, 22]);
    }

    #[test]
    fn ranges_expand_and_dedup() {
        let spec = parse_ports_str("8000-8002,80,8001").unwrap();
        assert_eq!(spec.ports(), &[8000, 8001, 8002, 80]);
    }

    #[test]
    fn empty_tokens_are_skipped() {
        assert_eq!(parse_ports_str("80,,443,").unwrap().ports(), &[80, 443]);
        assert!(parse_ports_str("").unwrap().is_empty());
    }

    #[test]
    fn invalid_values_error() {
        assert!(parse_ports_str("70000").is_err());
        assert!(parse_ports_str("0").is_err());
        assert!(parse_ports_str("http").is_err());
        assert!(parse_ports_str("90-80").is_err());
    }

    #[test]
    fn default_set_matches_all_checks() {
        let d = PortSpec::default_set();
        assert_eq!(d.ports(), &[21, 22, 80, 443, 3306, 8000, 8080]);
    }

    #[test]
    fn from_ports_drops_zero_and_repeats() {
        let spec = PortSpec::from_ports([0, 53, 53, 25]);
        assert_eq!(spec.ports(), &[53, 25]);
    }
}
