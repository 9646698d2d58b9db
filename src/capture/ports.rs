// Well-known port -> service name, for host-mode attribution only.

use std::collections::HashMap;

#[derive(Debug, Clone, Default)]
pub struct PortRegistry {
    ports: HashMap<u16, String>,
}

impl PortRegistry {
    pub fn new(entries: impl IntoIterator<Item = (u16, String)>) -> Self {
        Self {
            ports: entries.into_iter().collect(),
        }
    }

    pub fn resolve(&self, port: u16) -> Option<&str> {
        self.ports.get(&port).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_known_ports_only() {
        let r = PortRegistry::new([(8096, "Emby".to_string()), (443, "Nginx (SSL)".to_string())]);
        assert_eq!(r.resolve(8096), Some("Emby"));
        assert_eq!(r.resolve(443), Some("Nginx (SSL)"));
        assert_eq!(r.resolve(22), None);
        assert_eq!(r.len(), 2);
    }
}
