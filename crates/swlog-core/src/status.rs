use std::fmt;
use std::str::FromStr;

/// Icon shown for entries whose status is not one of the known kinds.
pub const UNSPECIFIED_ICON: &str = "📝";

/// The closed set of lifecycle states used for log entries and the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Idle,
    Registered,
    Installed,
    Activating,
    Fetching,
    Active,
    Error,
}

impl StatusKind {
    /// Every status kind, in lifecycle order.
    pub const ALL: [StatusKind; 7] = [
        StatusKind::Idle,
        StatusKind::Registered,
        StatusKind::Installed,
        StatusKind::Activating,
        StatusKind::Fetching,
        StatusKind::Active,
        StatusKind::Error,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusKind::Idle => "idle",
            StatusKind::Registered => "registered",
            StatusKind::Installed => "installed",
            StatusKind::Activating => "activating",
            StatusKind::Fetching => "fetching",
            StatusKind::Active => "active",
            StatusKind::Error => "error",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            StatusKind::Idle => "💤",
            StatusKind::Registered => "📋",
            StatusKind::Installed => "🔧",
            StatusKind::Activating => "⚡",
            StatusKind::Fetching => "🌐",
            StatusKind::Active => "✅",
            StatusKind::Error => "❌",
        }
    }

    /// `true` only for [`StatusKind::Active`]; drives the on/off indicator.
    pub fn is_active(self) -> bool {
        matches!(self, StatusKind::Active)
    }
}

/// Icon for an optional status, falling back to [`UNSPECIFIED_ICON`].
pub fn icon_for(status: Option<StatusKind>) -> &'static str {
    status.map(StatusKind::icon).unwrap_or(UNSPECIFIED_ICON)
}

impl fmt::Display for StatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StatusKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        StatusKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lowered)
            .ok_or_else(|| format!("unknown status: '{}'", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icons_match_display_table() {
        assert_eq!(StatusKind::Idle.icon(), "💤");
        assert_eq!(StatusKind::Registered.icon(), "📋");
        assert_eq!(StatusKind::Installed.icon(), "🔧");
        assert_eq!(StatusKind::Activating.icon(), "⚡");
        assert_eq!(StatusKind::Fetching.icon(), "🌐");
        assert_eq!(StatusKind::Active.icon(), "✅");
        assert_eq!(StatusKind::Error.icon(), "❌");
    }

    #[test]
    fn missing_status_uses_fallback_icon() {
        assert_eq!(icon_for(None), "📝");
        assert_eq!(icon_for(Some(StatusKind::Error)), "❌");
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Activating".parse::<StatusKind>(), Ok(StatusKind::Activating));
        assert_eq!(" fetching ".parse::<StatusKind>(), Ok(StatusKind::Fetching));
    }

    #[test]
    fn parse_rejects_unknown() {
        assert!("redundant".parse::<StatusKind>().is_err());
    }

    #[test]
    fn display_round_trips_through_parse() {
        for kind in StatusKind::ALL {
            assert_eq!(kind.to_string().parse::<StatusKind>(), Ok(kind));
        }
    }

    #[test]
    fn only_active_lights_indicator() {
        let lit: Vec<_> = StatusKind::ALL.into_iter().filter(|k| k.is_active()).collect();
        assert_eq!(lit, vec![StatusKind::Active]);
    }
}
