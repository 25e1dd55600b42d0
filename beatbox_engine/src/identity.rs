/// Who we are on the relay, and how many patterns we've sent so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdentity {
    name: String,
    sequence: u64,
}

impl LocalIdentity {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sequence: 0,
        }
    }

    /// Falls back to `$USER`, then "Player", when `name` is blank
    pub fn resolve(name: &str) -> Self {
        let name = name.trim();
        if !name.is_empty() {
            return Self::new(name);
        }
        let from_env = std::env::var("USER")
            .ok()
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Self::new(from_env.unwrap_or_else(|| "Player".to_string()))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// Label for the next send. Doesn't consume the sequence number.
    pub fn label_for(&self, message: &str) -> String {
        format!("{} {}: {}", self.name, self.sequence, message)
    }

    /// Call once per successful send
    pub fn advance(&mut self) {
        self.sequence += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        let mut me = LocalIdentity::new("alice");
        assert_eq!(me.label_for("hi"), "alice 0: hi");
        assert_eq!(me.label_for("hi"), "alice 0: hi");

        me.advance();
        assert_eq!(me.sequence(), 1);
        assert_eq!(me.label_for("again"), "alice 1: again");
    }

    #[test]
    fn test_resolve_keeps_explicit_name() {
        assert_eq!(LocalIdentity::resolve("  bob ").name(), "bob");
        assert!(!LocalIdentity::resolve("").name().is_empty());
    }
}
