//! Inline dice-directive parsing.
//!
//! The narration model requests rolls with a bracketed micro-syntax
//! embedded in its prose: `[ROLL D20 Brin]` or `[ROLL D6 ALL]`. The
//! orchestrator parses every directive out of the returned text,
//! translates each into a forced-roll demand, and strips it from the
//! displayed narration. Bracketed text that does not parse as a directive
//! is left untouched — the model may legitimately write `[sic]`.

use fireside_protocol::model::{DiceKind, RollTargets};

/// One parsed roll demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollDemand {
    /// Die kind to roll.
    pub kind: DiceKind,
    /// Who must roll.
    pub targets: RollTargets,
}

/// Extracts roll directives from narration text.
///
/// Returns the text with directives removed, plus the demands in
/// appearance order.
#[must_use]
pub fn extract_directives(text: &str) -> (String, Vec<RollDemand>) {
    let mut cleaned = String::with_capacity(text.len());
    let mut demands = Vec::new();
    let mut rest = text;

    while let Some(open) = rest.find('[') {
        let (before, bracketed) = rest.split_at(open);
        let Some(close) = bracketed.find(']') else {
            // Unbalanced bracket; keep everything as-is.
            cleaned.push_str(rest);
            rest = "";
            break;
        };
        let inside = &bracketed[1..close];
        match parse_directive(inside) {
            Some(demand) => {
                demands.push(demand);
                // Swallow one adjacent space so the prose does not keep a
                // double gap where the directive sat.
                let after = &bracketed[close + 1..];
                if let Some(trimmed) = after.strip_prefix(' ') {
                    cleaned.push_str(before);
                    rest = trimmed;
                } else {
                    cleaned.push_str(before.strip_suffix(' ').unwrap_or(before));
                    rest = after;
                }
            }
            None => {
                cleaned.push_str(before);
                cleaned.push_str(&bracketed[..=close]);
                rest = &bracketed[close + 1..];
            }
        }
    }
    cleaned.push_str(rest);
    (cleaned, demands)
}

fn parse_directive(inside: &str) -> Option<RollDemand> {
    let mut tokens = inside.split_whitespace();
    if !tokens.next()?.eq_ignore_ascii_case("ROLL") {
        return None;
    }
    let kind = DiceKind::parse(tokens.next()?)?;
    let target = tokens.collect::<Vec<_>>().join(" ");
    if target.is_empty() {
        return None;
    }
    let targets = if target.eq_ignore_ascii_case("ALL") {
        RollTargets::All
    } else {
        RollTargets::Named(vec![target])
    };
    Some(RollDemand { kind, targets })
}
