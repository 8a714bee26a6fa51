pub mod config;
pub mod driver;
pub mod elements;
pub mod ident;
pub mod message;
pub mod port;
pub mod time;
pub mod units;

pub(crate) mod data;
pub(crate) mod error;
pub(crate) mod queue;
pub(crate) mod simulation;

pub use config::{ElementConfig, ElementDesc};
pub use data::Record;
pub use driver::{read_topology, run, Config, Route, SendDesc, Topology};
pub use elements::{Effects, Element, NetworkElement};
pub use error::Error;
pub use ident::{ElementId, EndpointId, MuxName, VlinkName};
pub use message::{Delivery, FrameTag, Message};
