use std::fmt;

/// Load balancing subsystem serving a VPC
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum LbProvider {
    #[default]
    None,
    /// Load balancer service hosted by the backend inside the VPC
    Native,
    /// Externally managed load balancer controller
    Alternate,
}

impl LbProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LbProvider::None => "none",
            LbProvider::Native => "native",
            LbProvider::Alternate => "alternate",
        }
    }
}

impl fmt::Display for LbProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
