//! Source denylist
//!
//! A substring scan that runs before the parser ever sees the source. The
//! scan is deliberately coarse: matching inside a string literal or comment
//! still rejects the script. A false rejection costs an agent one retry; the
//! alternative costs an invariant.

/// One rejected construct with the reason reported back to the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForbiddenPattern {
    pub construct: &'static str,
    pub reason: &'static str,
}

const DENYLIST: &[ForbiddenPattern] = &[
    // Session lifecycle belongs to the connection manager alone
    ForbiddenPattern {
        construct: "connect(",
        reason: "session lifecycle is managed internally",
    },
    ForbiddenPattern {
        construct: "initialize(",
        reason: "session lifecycle is managed internally",
    },
    ForbiddenPattern {
        construct: "shutdown(",
        reason: "session lifecycle is managed internally",
    },
    ForbiddenPattern {
        construct: "disconnect(",
        reason: "session lifecycle is managed internally",
    },
    // No trading surface exists; reject the vocabulary outright
    ForbiddenPattern {
        construct: "order_send",
        reason: "trading operations are not available",
    },
    ForbiddenPattern {
        construct: "order_check",
        reason: "trading operations are not available",
    },
    ForbiddenPattern {
        construct: "position_",
        reason: "trading operations are not available",
    },
    ForbiddenPattern {
        construct: "history_deals",
        reason: "trading operations are not available",
    },
    // Host escape vocabulary
    ForbiddenPattern {
        construct: "eval(",
        reason: "dynamic evaluation is not available",
    },
    ForbiddenPattern {
        construct: "exec(",
        reason: "dynamic evaluation is not available",
    },
    ForbiddenPattern {
        construct: "compile(",
        reason: "dynamic evaluation is not available",
    },
    ForbiddenPattern {
        construct: "import ",
        reason: "module loading is not available",
    },
    ForbiddenPattern {
        construct: "__",
        reason: "reserved names are not available",
    },
    ForbiddenPattern {
        construct: "subprocess",
        reason: "process control is not available",
    },
    ForbiddenPattern {
        construct: "system(",
        reason: "process control is not available",
    },
    ForbiddenPattern {
        construct: "spawn(",
        reason: "process control is not available",
    },
    ForbiddenPattern {
        construct: "open(",
        reason: "file access is not available",
    },
    ForbiddenPattern {
        construct: "../",
        reason: "file access is not available",
    },
];

/// First denylisted construct found in `source`, if any
pub fn scan(source: &str) -> Option<&'static ForbiddenPattern> {
    let lowered = source.to_ascii_lowercase();
    DENYLIST
        .iter()
        .find(|pattern| lowered.contains(pattern.construct))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clean_source_passes() {
        assert!(scan("bars = copy_rates_from_pos(\"EURUSD\", \"H1\", 0, 100)").is_none());
    }

    #[test]
    fn lifecycle_and_trading_are_rejected() {
        assert_eq!(scan("shutdown()").unwrap().construct, "shutdown(");
        assert_eq!(scan("x = ORDER_SEND(req)").unwrap().construct, "order_send");
    }

    #[test]
    fn match_inside_a_string_still_rejects() {
        assert!(scan("note = \"please call eval(x)\"").is_some());
    }
}
