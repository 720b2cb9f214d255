use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash_kind::HashKind;
use crate::key::HexKey;

/// A node that may hold or contribute content.
///
/// Peers are inert records: nothing in UL connects to them. They exist so a
/// log entry's node id can eventually be mapped to somewhere the content
/// lives. The list fields are only reachable through read-only views and
/// explicit add methods.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Peer {
    node_id: HexKey,
    hash_kind: HashKind,
    node_ndx: Option<u32>,
    ip_addrs: Vec<Ipv4Addr>,
    fqdns: Vec<String>,
}

impl Peer {
    /// Create a peer record, checking the node id against `kind`.
    pub fn new(node_id: HexKey, hash_kind: HashKind) -> Result<Self, TypeError> {
        if !node_id.fits(hash_kind) {
            return Err(TypeError::InvalidLength {
                expected: hash_kind.hex_len(),
                actual: node_id.len(),
            });
        }
        Ok(Self {
            node_id,
            hash_kind,
            node_ndx: None,
            ip_addrs: Vec::new(),
            fqdns: Vec::new(),
        })
    }

    pub fn node_id(&self) -> &HexKey {
        &self.node_id
    }

    pub fn hash_kind(&self) -> HashKind {
        self.hash_kind
    }

    /// Local index assigned to this peer, if any.
    pub fn node_ndx(&self) -> Option<u32> {
        self.node_ndx
    }

    /// Assign the local index. May only be done once.
    pub fn set_node_ndx(&mut self, ndx: u32) -> Result<(), TypeError> {
        if let Some(existing) = self.node_ndx {
            return Err(TypeError::NodeIndexAlreadySet(existing));
        }
        self.node_ndx = Some(ndx);
        Ok(())
    }

    pub fn ip_addrs(&self) -> &[Ipv4Addr] {
        &self.ip_addrs
    }

    /// Record an address; duplicates are ignored.
    pub fn add_ip_addr(&mut self, addr: Ipv4Addr) {
        if !self.ip_addrs.contains(&addr) {
            self.ip_addrs.push(addr);
        }
    }

    pub fn fqdns(&self) -> &[String] {
        &self.fqdns
    }

    /// Record a fully qualified domain name; duplicates are ignored.
    pub fn add_fqdn(&mut self, fqdn: impl Into<String>) {
        let fqdn = fqdn.into();
        if !self.fqdns.contains(&fqdn) {
            self.fqdns.push(fqdn);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_id() -> HexKey {
        HexKey::new("fedcba9876543210fedcba9876543210fedcba98").unwrap()
    }

    #[test]
    fn new_checks_width() {
        assert!(Peer::new(node_id(), HashKind::Sha1).is_ok());
        let err = Peer::new(node_id(), HashKind::Sha2).unwrap_err();
        assert_eq!(err, TypeError::InvalidLength { expected: 64, actual: 40 });
    }

    #[test]
    fn node_ndx_is_set_once() {
        let mut peer = Peer::new(node_id(), HashKind::Sha1).unwrap();
        assert_eq!(peer.node_ndx(), None);
        peer.set_node_ndx(7).unwrap();
        assert_eq!(peer.node_ndx(), Some(7));
        assert_eq!(peer.set_node_ndx(8), Err(TypeError::NodeIndexAlreadySet(7)));
        assert_eq!(peer.node_ndx(), Some(7));
    }

    #[test]
    fn address_lists_deduplicate() {
        let mut peer = Peer::new(node_id(), HashKind::Sha1).unwrap();
        peer.add_ip_addr(Ipv4Addr::new(10, 0, 0, 1));
        peer.add_ip_addr(Ipv4Addr::new(10, 0, 0, 1));
        peer.add_fqdn("u.example.com");
        peer.add_fqdn("u.example.com");
        assert_eq!(peer.ip_addrs().len(), 1);
        assert_eq!(peer.fqdns(), ["u.example.com".to_string()]);
    }
}
