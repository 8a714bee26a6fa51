use crate::{
    elements::{
        afdx::AfdxSwitchConfig, basic::SwitchConfig, bus::BusConfig, can::CanConfig,
        end_system::EndSystemConfig, ttet::TtEtConfig, Element,
    },
    ident::ElementId,
    Error,
};

/// Parameters of one network element, tagged by its kind.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, derive_more::From)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ElementConfig {
    Bus(BusConfig),
    Can(CanConfig),
    #[from(ignore)]
    Basic(SwitchConfig),
    #[from(ignore)]
    Crossbar(SwitchConfig),
    AfdxSwitch(AfdxSwitchConfig),
    AfdxEndSystem(EndSystemConfig),
    TtEt(TtEtConfig),
}

impl ElementConfig {
    /// Validates the parameters and builds an element in its initial state.
    pub fn build<P>(&self, id: ElementId) -> Result<Element<P>, Error> {
        let element = match self {
            ElementConfig::Bus(cfg) => Element::Bus(cfg.build(id)?),
            ElementConfig::Can(cfg) => Element::CanBus(cfg.build(id)?),
            ElementConfig::Basic(cfg) => Element::Basic(cfg.build(id)?),
            ElementConfig::Crossbar(cfg) => Element::Crossbar(cfg.build_crossbar(id)?),
            ElementConfig::AfdxSwitch(cfg) => Element::AfdxSwitch(cfg.build(id)?),
            ElementConfig::AfdxEndSystem(cfg) => Element::AfdxEndSystem(cfg.build(id)?),
            ElementConfig::TtEt(cfg) => Element::TtEt(cfg.build(id)?),
        };
        Ok(element)
    }
}

/// An element of a topology, as read from a topology file.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, derive_new::new)]
pub struct ElementDesc {
    pub id: ElementId,
    #[serde(flatten)]
    pub config: ElementConfig,
}
