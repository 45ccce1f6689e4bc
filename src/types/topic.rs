use std::fmt;
use std::str::FromStr;

/// A training module the operator can switch between.
///
/// The set is closed; every topic has a display label, a short command name and a
/// fixed greeting that opens its transcript.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum Topic {
    /// General security consultation.
    #[default]
    General,

    /// Reconnaissance and OSINT.
    Reconnaissance,

    /// Web application exploitation.
    WebExploitation,

    /// Network attacks.
    Network,

    /// Privilege escalation.
    PrivilegeEscalation,

    /// Blue team and defensive work.
    Defense,
}

impl Topic {
    /// All topics in menu order.
    pub const ALL: [Topic; 6] = [
        Topic::General,
        Topic::Reconnaissance,
        Topic::WebExploitation,
        Topic::Network,
        Topic::PrivilegeEscalation,
        Topic::Defense,
    ];

    /// Returns the human-facing module name.
    pub fn label(&self) -> &'static str {
        match self {
            Topic::General => "General Consultation",
            Topic::Reconnaissance => "Reconnaissance & OSINT",
            Topic::WebExploitation => "Web Exploitation",
            Topic::Network => "Network Attacks",
            Topic::PrivilegeEscalation => "Privilege Escalation",
            Topic::Defense => "Blue Team / Defense",
        }
    }

    /// Returns the short name accepted by `/topic`.
    pub fn slug(&self) -> &'static str {
        match self {
            Topic::General => "general",
            Topic::Reconnaissance => "recon",
            Topic::WebExploitation => "web",
            Topic::Network => "network",
            Topic::PrivilegeEscalation => "privesc",
            Topic::Defense => "defense",
        }
    }

    /// Returns the greeting the instructor opens this module with.
    pub fn greeting(&self) -> &'static str {
        match self {
            Topic::General => {
                "Session initialized. Ready for general security inquiry. What's your objective?"
            }
            Topic::Reconnaissance => {
                "Module: Reconnaissance. Target enumeration protocol active. Are we looking at passive OSINT or active scanning?"
            }
            Topic::WebExploitation => {
                "Module: Web Exploitation. OWASP Top 10 vectors loaded. Input validation analysis ready. What's the target stack?"
            }
            Topic::Network => {
                "Module: Network Security. L2/L3 protocols analysis. Man-in-the-Middle and lateral movement concepts available."
            }
            Topic::PrivilegeEscalation => {
                "Module: Privilege Escalation. Checking for misconfigurations, weak permissions, and kernel exploits. Linux or Windows?"
            }
            Topic::Defense => {
                "Module: Blue Team. Threat hunting and hardening protocols. Let's analyze the logs and secure the perimeter."
            }
        }
    }

    /// Returns the system notice shown while the module loads.
    pub fn initialization_notice(&self) -> String {
        format!("Initializing environment... Loading {} modules...", self.label())
    }

    /// Returns the label as an upper-case path segment, e.g. `NETWORK_ATTACKS`.
    pub fn path_segment(&self) -> String {
        self.label().replace(' ', "_").to_uppercase()
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl FromStr for Topic {
    type Err = String;

    /// Parses a topic from its short name, its label, or its 1-based menu number.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim();
        if let Ok(index) = needle.parse::<usize>() {
            return index
                .checked_sub(1)
                .and_then(|i| Topic::ALL.get(i).copied())
                .ok_or_else(|| format!("no topic numbered {index} (1-{})", Topic::ALL.len()));
        }
        Topic::ALL
            .iter()
            .find(|topic| {
                topic.slug().eq_ignore_ascii_case(needle)
                    || topic.label().eq_ignore_ascii_case(needle)
            })
            .copied()
            .ok_or_else(|| format!("unknown topic: {needle}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_topic_has_distinct_greeting() {
        for (i, a) in Topic::ALL.iter().enumerate() {
            for b in &Topic::ALL[i + 1..] {
                assert_ne!(a.greeting(), b.greeting());
            }
        }
    }

    #[test]
    fn parse_by_slug_label_and_number() {
        assert_eq!("recon".parse::<Topic>(), Ok(Topic::Reconnaissance));
        assert_eq!("WEB".parse::<Topic>(), Ok(Topic::WebExploitation));
        assert_eq!("network attacks".parse::<Topic>(), Ok(Topic::Network));
        assert_eq!("5".parse::<Topic>(), Ok(Topic::PrivilegeEscalation));
        assert!("0".parse::<Topic>().is_err());
        assert!("7".parse::<Topic>().is_err());
        assert!("cooking".parse::<Topic>().is_err());
    }

    #[test]
    fn initialization_notice_names_label() {
        assert_eq!(
            Topic::Defense.initialization_notice(),
            "Initializing environment... Loading Blue Team / Defense modules..."
        );
    }

    #[test]
    fn path_segment() {
        assert_eq!(Topic::Network.path_segment(), "NETWORK_ATTACKS");
        assert_eq!(Topic::General.path_segment(), "GENERAL_CONSULTATION");
    }
}
