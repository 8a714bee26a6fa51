use std::ops::{Index, IndexMut};

use rustc_hash::FxHashMap;

use crate::{ident::EndpointId, Error};

/// A port index internal to a switch.
///
/// Ports are numbered from zero up to the switch's configured port count.
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialOrd,
    Ord,
    PartialEq,
    Eq,
    Hash,
    derive_more::Display,
    serde::Serialize,
    serde::Deserialize,
)]
pub struct PortIndex(usize);

impl PortIndex {
    /// Port index zero.
    pub const ZERO: PortIndex = PortIndex::new(0);
    /// Port index one.
    pub const ONE: PortIndex = PortIndex::new(1);

    /// Create a new port index.
    pub const fn new(val: usize) -> Self {
        Self(val)
    }

    /// Get the inner value of the port index.
    pub const fn inner(&self) -> usize {
        self.0
    }
}

/// One attachment of an external endpoint to a switch port.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct PortBinding {
    pub endpoint: EndpointId,
    pub port: PortIndex,
}

/// Maps external endpoints onto a switch's internal ports.
///
/// Input ports are looked up by the endpoint that sent a message; output ports by the endpoint a
/// message is addressed to. The map is filled once from configuration and is read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct PortMap {
    inputs: FxHashMap<EndpointId, PortIndex>,
    outputs: FxHashMap<EndpointId, PortIndex>,
}

impl PortMap {
    pub(crate) fn new(inputs: &[PortBinding], outputs: &[PortBinding]) -> Self {
        Self {
            inputs: inputs.iter().map(|b| (b.endpoint, b.port)).collect(),
            outputs: outputs.iter().map(|b| (b.endpoint, b.port)).collect(),
        }
    }

    pub(crate) fn input(&self, endpoint: EndpointId) -> Result<PortIndex, Error> {
        self.inputs
            .get(&endpoint)
            .copied()
            .ok_or(Error::UnresolvedRouting { endpoint })
    }

    pub(crate) fn output(&self, endpoint: EndpointId) -> Result<PortIndex, Error> {
        self.outputs
            .get(&endpoint)
            .copied()
            .ok_or(Error::UnresolvedRouting { endpoint })
    }

    /// The largest port index referenced in either direction.
    pub(crate) fn max_port(&self) -> Option<PortIndex> {
        self.inputs.values().chain(self.outputs.values()).copied().max()
    }
}

/// Per-port storage, indexed by [`PortIndex`].
#[derive(Debug, Clone)]
pub(crate) struct Ports<T> {
    inner: Vec<T>,
}

impl<T: Default> Ports<T> {
    pub(crate) fn new(nr_ports: usize) -> Self {
        Self {
            inner: (0..nr_ports).map(|_| T::default()).collect(),
        }
    }
}

impl<T> Ports<T> {
    pub(crate) fn iter(&self) -> impl Iterator<Item = &T> {
        self.inner.iter()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.inner.iter_mut()
    }

    pub(crate) fn indices(&self) -> impl Iterator<Item = PortIndex> {
        (0..self.inner.len()).map(PortIndex::new)
    }
}

impl<T> Index<PortIndex> for Ports<T> {
    type Output = T;

    fn index(&self, index: PortIndex) -> &Self::Output {
        &self.inner[index.inner()]
    }
}

impl<T> IndexMut<PortIndex> for Ports<T> {
    fn index_mut(&mut self, index: PortIndex) -> &mut Self::Output {
        &mut self.inner[index.inner()]
    }
}
