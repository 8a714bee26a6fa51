use std::path::Path;

use rustc_hash::FxHashMap;

use crate::{
    config::ElementDesc,
    ident::{ElementId, EndpointId},
    simulation::{RouteTable, Simulation, Slot},
    units::Nanosecs,
    Error, Record,
};

/// The path a message takes from `source` to `dest`, as a list of elements.
///
/// An empty `hops` list connects the two endpoints directly.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct Route {
    pub source: EndpointId,
    pub dest: EndpointId,
    #[serde(default)]
    pub hops: Vec<ElementId>,
}

/// Elements and the routes through them.
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct Topology {
    pub elements: Vec<ElementDesc>,
    #[serde(default)]
    pub routes: Vec<Route>,
}

/// A send initiated by an endpoint.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, typed_builder::TypedBuilder)]
pub struct SendDesc<P> {
    pub source: EndpointId,
    pub dest: EndpointId,
    #[builder(setter(into))]
    pub at: Nanosecs,
    pub payload: P,
}

#[derive(Debug, typed_builder::TypedBuilder)]
pub struct Config<P> {
    topology: Topology,
    sends: Vec<SendDesc<P>>,

    #[builder(default, setter(into, strip_option))]
    timeout: Option<Nanosecs>,
}

/// Runs `cfg` until no work remains or the timeout passes, and returns every message that reached
/// its receiver, in delivery order.
pub fn run<P>(cfg: Config<P>) -> Result<Vec<Record<P>>, Error> {
    let mut elements = FxHashMap::default();
    for desc in &cfg.topology.elements {
        let element = desc.config.build(desc.id)?;
        if elements.insert(desc.id, Slot::new(element)).is_some() {
            return Err(Error::config(
                format!("element {}", desc.id),
                "duplicate element ID",
            ));
        }
    }
    let mut routes = RouteTable::default();
    for route in cfg.topology.routes {
        if let Some(&hop) = route.hops.iter().find(|hop| !elements.contains_key(hop)) {
            return Err(Error::UnknownElement(hop));
        }
        routes.insert((route.source, route.dest), route.hops);
    }
    let mut sim = Simulation::builder()
        .elements(elements)
        .routes(routes)
        .timeout(cfg.timeout.map(|v| v.into_time()))
        .build();
    for send in cfg.sends {
        sim.inject(send.source, send.dest, send.at.into_time(), send.payload);
    }
    sim.run()
}

pub fn read_topology(path: impl AsRef<Path>) -> Result<Topology, Error> {
    let s = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&s)?)
}
