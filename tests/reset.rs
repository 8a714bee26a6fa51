mod common;

use common::{el, ep, init_tracing, ms};
use fabric_sim::{
    elements::{
        afdx::AfdxSwitchConfig, basic::SwitchConfig, bus::BusConfig, can::CanConfig,
        end_system::EndSystemConfig, ttet::TtEtConfig, vlink::VlinkPort,
    },
    message::FrameTag,
    port::{PortBinding, PortIndex},
    time::Time,
    units::{Bits, Kbps, Mbps, Millisecs, Nanosecs},
    Element, ElementConfig, Message, NetworkElement,
};

fn configs() -> Vec<ElementConfig> {
    let delay = Millisecs::new(1).into_ns();
    let inputs = vec![PortBinding::new(ep(1), PortIndex::ZERO)];
    let outputs = vec![PortBinding::new(ep(2), PortIndex::ONE)];
    let switch = SwitchConfig::builder()
        .nr_ports(2)
        .input_buffer_delay(delay)
        .switch_fabric_delay(delay)
        .output_buffer_delay(delay)
        .inputs(inputs.clone())
        .outputs(outputs.clone())
        .build();
    vec![
        BusConfig::builder().service_time_factor(delay).build().into(),
        CanConfig::builder().bit_rate(Kbps::new(125)).build().into(),
        ElementConfig::Basic(switch.clone()),
        ElementConfig::Crossbar(switch),
        AfdxSwitchConfig::builder()
            .nr_ports(2)
            .bit_rate(Mbps::new(10))
            .inputs(inputs)
            .outputs(outputs)
            .build()
            .into(),
        EndSystemConfig::builder()
            .bit_rate(Mbps::new(10))
            .vlinks(vec![VlinkPort::builder()
                .endpoint(ep(2))
                .vlink("VL1")
                .bag(delay)
                .frame_size(Bits::new(1_000))
                .group("SM1")
                .build()])
            .build()
            .into(),
        TtEtConfig::builder()
            .service_time(Nanosecs::new(500))
            .time_triggered(vec![ep(1)])
            .build()
            .into(),
    ]
}

fn frame(origin: Time) -> Message<u32> {
    Message::builder()
        .payload(0)
        .source(ep(1))
        .origin(origin)
        .frame(FrameTag::new("VL1".into(), Bits::new(1_000)))
        .build()
}

// After a reset, processing at any instant releases nothing and asks for no wake-up
#[test]
fn reset_discards_all_pending_work() -> anyhow::Result<()> {
    init_tracing();
    for (i, cfg) in configs().into_iter().enumerate() {
        let mut element: Element<u32> = cfg.build(el(i))?;
        let fx = element.accept(ep(2), frame(Time::ZERO), Time::ZERO)?;
        assert!(fx.wakeup.is_some(), "{cfg:?} should have pending work");
        element.reset();
        assert_eq!(element.next_wakeup(), None);
        for now in [Time::ZERO, ms(1), ms(2), ms(3), ms(10)] {
            assert!(element.process(now)?.is_idle(), "{cfg:?} released work after reset");
        }
    }
    Ok(())
}

// A reset element behaves exactly like a freshly built one
#[test]
fn reset_element_matches_fresh_element() -> anyhow::Result<()> {
    init_tracing();
    for (i, cfg) in configs().into_iter().enumerate() {
        let mut fresh: Element<u32> = cfg.build(el(i))?;
        let mut reused: Element<u32> = cfg.build(el(i))?;
        reused.accept(ep(2), frame(Time::ZERO), Time::ZERO)?;
        reused.reset();

        let start = ms(5);
        let a = fresh.accept(ep(2), frame(start), start)?;
        let b = reused.accept(ep(2), frame(start), start)?;
        assert_eq!(a.wakeup, b.wakeup, "{cfg:?}");
    }
    Ok(())
}
