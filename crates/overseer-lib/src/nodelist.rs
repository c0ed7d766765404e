//! Node-range expansion
//!
//! Expands compact scheduler node lists such as `learnfair[1078,1131-1132]`
//! into hostnames. Node numbers are zero-padded to four digits.

use crate::error::NodeListError;
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Width node numbers are zero-padded to
pub const NODE_NUMBER_WIDTH: usize = 4;

/// Most hostnames one expression may expand to
pub const MAX_NODELIST_HOSTS: u64 = 100_000;

fn nodelist_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^([^\[\],\s]+)\[([0-9]+(?:-[0-9]+)?(?:,[0-9]+(?:-[0-9]+)?)*)\]$")
            .expect("Failed to compile node list pattern")
    })
}

/// Expand `prefix[n,n-m,...]` into the hostnames it names.
///
/// Order follows the expression; repeated hosts are kept once. Anything not
/// matching the grammar is rejected rather than partially expanded.
pub fn parse_nodelist(expr: &str) -> Result<Vec<String>, NodeListError> {
    let expr = expr.trim();
    let caps = nodelist_regex()
        .captures(expr)
        .ok_or_else(|| NodeListError::Malformed(expr.to_string()))?;
    let prefix = &caps[1];

    let mut hosts: Vec<String> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut expanded: u64 = 0;
    for item in caps[2].split(',') {
        let (start, end) = match item.split_once('-') {
            Some((start, end)) => (parse_number(start)?, parse_number(end)?),
            None => {
                let n = parse_number(item)?;
                (n, n)
            }
        };

        if start > end {
            return Err(NodeListError::InvertedRange { start, end });
        }

        expanded = expanded.saturating_add((end - start).saturating_add(1));
        if expanded > MAX_NODELIST_HOSTS {
            return Err(NodeListError::TooLarge {
                limit: MAX_NODELIST_HOSTS,
            });
        }

        for n in start..=end {
            let host = format!("{prefix}{n:0width$}", width = NODE_NUMBER_WIDTH);
            if seen.insert(host.clone()) {
                hosts.push(host);
            }
        }
    }

    Ok(hosts)
}

fn parse_number(digits: &str) -> Result<u64, NodeListError> {
    digits
        .parse()
        .map_err(|_| NodeListError::Number(digits.to_string()))
}
