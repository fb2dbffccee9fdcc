//! Skill identity and topic naming.

use uuid::Uuid;

/// Identity of one running skill instance.
///
/// Vendor, name, and version are fixed at construction; the instance id is
/// generated per process and identifies this instance to the discovery
/// backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkillIdentity {
    vendor: String,
    name: String,
    version: String,
    instance_id: String,
}

impl SkillIdentity {
    /// Create an identity with a freshly generated instance id.
    pub fn new(
        vendor: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            vendor: vendor.into(),
            name: name.into(),
            version: version.into(),
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Skill vendor.
    pub fn vendor(&self) -> &str {
        &self.vendor
    }

    /// Skill name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Skill version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Unique id of this running instance.
    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Fully-qualified inbound topic for a command of this skill.
    pub fn topic(&self, command: &str) -> String {
        format!("skill/{}/{}/{}", self.vendor, self.name, command)
    }

    /// Namespace prefix for this skill's configuration keys.
    pub fn config_prefix(&self) -> String {
        format!("skill/{}/{}", self.vendor, self.name)
    }
}

impl std::fmt::Display for SkillIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} v{}", self.vendor, self.name, self.version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn topic_is_fully_qualified() {
        let identity = SkillIdentity::new("acme", "greeter", "1.0.0");
        assert_eq!(identity.topic("greet"), "skill/acme/greeter/greet");
    }

    #[test]
    fn config_prefix_omits_command() {
        let identity = SkillIdentity::new("acme", "greeter", "1.0.0");
        assert_eq!(identity.config_prefix(), "skill/acme/greeter");
    }

    #[test]
    fn instance_ids_are_unique() {
        let a = SkillIdentity::new("acme", "greeter", "1.0.0");
        let b = SkillIdentity::new("acme", "greeter", "1.0.0");
        assert_ne!(a.instance_id(), b.instance_id());
    }

    #[test]
    fn display_includes_vendor_name_version() {
        let identity = SkillIdentity::new("acme", "greeter", "1.0.0");
        assert_eq!(identity.to_string(), "acme/greeter v1.0.0");
    }
}
