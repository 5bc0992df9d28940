//! Named-group discovery, group-id derivation and bare-asset detection.
//!
//! Groups are discovered by a one-time AST walk before evaluation starts;
//! their bodies are what the backfill engine re-evaluates for historical
//! dates. Group ids must be deterministic across runs because they address
//! the persistent return cache.

use crate::domain::ast::AstNode;
use crate::domain::context::Session;
use crate::domain::fragment::{PortfolioFragment, SOURCE_ASSET};

const SLUG_MAX_LEN: usize = 24;

/// Discovered-at-parse-time group metadata. Read-only after discovery.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupInfo {
    pub group_id: String,
    pub name: String,
    pub body: Vec<AstNode>,
    /// Nesting depth of the `group` form in the strategy tree.
    pub depth: usize,
    /// Metric name of the nearest enclosing filter's condition, if any.
    pub parent_metric: Option<String>,
}

/// Deterministic group id: human-readable slug plus a short hash suffix so
/// differently-spelled names never collide.
pub fn derive_group_id(name: &str) -> String {
    let mut slug = String::new();
    let mut last_was_sep = true;
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() {
            slug.push(ch.to_ascii_lowercase());
            last_was_sep = false;
        } else if !last_was_sep {
            slug.push('_');
            last_was_sep = true;
        }
    }
    let slug = slug.trim_matches('_');
    let slug = if slug.is_empty() { "group" } else { slug };
    let truncated: String = slug.chars().take(SLUG_MAX_LEN).collect();
    format!("{}_{:08x}", truncated.trim_end_matches('_'), fnv1a(name) as u32)
}

/// FNV-1a, 64-bit. Stable across runs and platforms, unlike the std hasher.
fn fnv1a(input: &str) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in input.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

/// Walk the strategy once and record every named group body in the session.
pub fn discover_groups(ast: &AstNode, session: &mut Session) {
    walk(ast, 0, None, session);
}

fn walk(node: &AstNode, depth: usize, parent_metric: Option<&str>, session: &mut Session) {
    match node {
        AstNode::List(children) => {
            let head = node.head_symbol();
            if head == Some("group") {
                if let [AstNode::Str(name), body @ ..] = node.call_args() {
                    let group_id = derive_group_id(name);
                    session.group_bodies.entry(group_id.clone()).or_insert_with(|| GroupInfo {
                        group_id,
                        name: name.clone(),
                        body: body.to_vec(),
                        depth,
                        parent_metric: parent_metric.map(str::to_string),
                    });
                }
            }
            // A filter's condition metric scopes every group inside its
            // portfolio expression.
            let metric = if head == Some("filter") {
                node.call_args().first().and_then(AstNode::head_symbol)
            } else {
                None
            };
            let metric = metric.or(parent_metric);
            for child in children {
                walk(child, depth + 1, metric, session);
            }
        }
        AstNode::Vector(children) => {
            for child in children {
                walk(child, depth + 1, parent_metric, session);
            }
        }
        AstNode::Map(pairs) => {
            for (_, value) in pairs {
                walk(value, depth + 1, parent_metric, session);
            }
        }
        _ => {}
    }
}

/// Strict ticker pattern: 1-5 ASCII alphanumerics, optional `.X` share-class
/// suffix (e.g. `BRK.B`).
pub fn looks_like_ticker(symbol: &str) -> bool {
    let (base, suffix) = match symbol.split_once('.') {
        Some((base, suffix)) => (base, Some(suffix)),
        None => (symbol, None),
    };
    if base.is_empty() || base.len() > 5 {
        return false;
    }
    if !base.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return false;
    }
    match suffix {
        None => true,
        Some(s) => s.len() == 1 && s.chars().all(|c| c.is_ascii_uppercase()),
    }
}

/// A fragment produced directly by wrapping a single ticker, as opposed to a
/// genuine named portfolio. Bare assets are never routed through the
/// group-scoring path.
pub fn is_bare_asset(fragment: &PortfolioFragment) -> bool {
    if fragment.weights.len() != 1 {
        return false;
    }
    if fragment.source_step != SOURCE_ASSET {
        return false;
    }
    fragment
        .weights
        .keys()
        .next()
        .is_some_and(|symbol| looks_like_ticker(symbol))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn group_id_is_deterministic() {
        let a = derive_group_id("Tech Momentum");
        let b = derive_group_id("Tech Momentum");
        assert_eq!(a, b);
        assert!(a.starts_with("tech_momentum_"));
    }

    #[test]
    fn distinct_names_yield_distinct_ids() {
        assert_ne!(derive_group_id("Tech Momentum"), derive_group_id("Tech-Momentum!"));
        assert_ne!(derive_group_id("A"), derive_group_id("B"));
    }

    #[test]
    fn group_id_collapses_non_alphanumeric_runs() {
        let id = derive_group_id("  Bonds — Long//Duration  ");
        assert!(id.starts_with("bonds_long_duration_"));
    }

    #[test]
    fn group_id_truncates_long_names() {
        let id = derive_group_id("An Extremely Verbose Group Name With Many Words");
        let slug_len = id.rsplit_once('_').unwrap().0.len();
        assert!(slug_len <= SLUG_MAX_LEN);
    }

    #[test]
    fn ticker_pattern() {
        assert!(looks_like_ticker("SPY"));
        assert!(looks_like_ticker("BRK.B"));
        assert!(looks_like_ticker("QQQ3"));
        assert!(!looks_like_ticker("spy"));
        assert!(!looks_like_ticker("TOOLONGX"));
        assert!(!looks_like_ticker("Tech Momentum"));
        assert!(!looks_like_ticker(""));
        assert!(!looks_like_ticker("BRK.BB"));
    }

    #[test]
    fn bare_asset_detection() {
        assert!(is_bare_asset(&PortfolioFragment::from_symbol("SPY")));

        // Multi-holding fragments are genuine portfolios.
        let mut multi = PortfolioFragment::from_symbol("SPY");
        multi.weights.insert("QQQ".into(), dec!(1));
        assert!(!is_bare_asset(&multi));

        // Wrong provenance means not produced by `asset`.
        let mut renamed = PortfolioFragment::from_symbol("SPY");
        renamed.source_step = "group:Defensive".into();
        assert!(!is_bare_asset(&renamed));
    }

    #[test]
    fn discovery_records_nested_groups_with_parent_metric() {
        let ast = AstNode::List(vec![
            AstNode::symbol("filter"),
            AstNode::List(vec![
                AstNode::symbol("cumulative-return"),
                AstNode::Map(vec![("window".into(), AstNode::Number(dec!(60)))]),
            ]),
            AstNode::List(vec![AstNode::symbol("select-top"), AstNode::Number(dec!(1))]),
            AstNode::Vector(vec![AstNode::List(vec![
                AstNode::symbol("group"),
                AstNode::string("Defensive"),
                AstNode::Vector(vec![AstNode::List(vec![
                    AstNode::symbol("asset"),
                    AstNode::string("BIL"),
                ])]),
            ])]),
        ]);

        let mut session = Session::new();
        discover_groups(&ast, &mut session);
        assert_eq!(session.group_bodies.len(), 1);
        let info = session.group_bodies.values().next().unwrap();
        assert_eq!(info.name, "Defensive");
        assert_eq!(info.parent_metric.as_deref(), Some("cumulative-return"));
        assert!(info.depth > 0);
    }
}
