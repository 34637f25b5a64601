use serde::{Deserialize, Serialize};

/// Priority classes for dispatch ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Urgent work, drained before anything else
    High,

    /// Everything that is not urgent
    Default,
}

impl Priority {
    /// Numeric dispatch rank: high maps to 1, default to 10. The queue
    /// always hands out the lowest rank first, so high drains before
    /// default whenever both are visible.
    pub fn rank(self) -> u8 {
        match self {
            Self::High => 1,
            Self::Default => 10,
        }
    }

    /// Get all priority classes in dispatch order
    pub fn all() -> &'static [Priority] {
        &[Self::High, Self::Default]
    }

    /// Get human-readable name
    pub fn name(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Default => "default",
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::Default
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "high" => Ok(Self::High),
            "default" => Ok(Self::Default),
            _ => Err(format!("Invalid priority: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn high_ranks_ahead_of_default() {
        assert!(Priority::High.rank() < Priority::Default.rank());
        assert_eq!(Priority::High.rank(), 1);
        assert_eq!(Priority::Default.rank(), 10);
    }

    #[test]
    fn parses_wire_names() {
        assert_eq!("high".parse::<Priority>().unwrap(), Priority::High);
        assert_eq!("DEFAULT".parse::<Priority>().unwrap(), Priority::Default);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Priority::High).unwrap(), "\"high\"");
        let parsed: Priority = serde_json::from_str("\"default\"").unwrap();
        assert_eq!(parsed, Priority::Default);
    }
}
