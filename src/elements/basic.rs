use tracing::{debug, trace};

use crate::{
    elements::{check_missed, Context, Effects, NetworkElement},
    ident::{ElementId, EndpointId},
    message::{Message, Transit},
    port::{PortBinding, PortMap, Ports},
    queue::{self, TimedQueue},
    time::{Delta, Time},
    units::Nanosecs,
    Error,
};

/// Configuration shared by the basic and crossbar switches.
#[derive(Debug, Clone, typed_builder::TypedBuilder, serde::Serialize, serde::Deserialize)]
pub struct SwitchConfig {
    pub nr_ports: usize,
    #[builder(setter(into))]
    pub input_buffer_delay: Nanosecs,
    #[builder(setter(into))]
    pub switch_fabric_delay: Nanosecs,
    #[builder(setter(into))]
    pub output_buffer_delay: Nanosecs,
    /// Sender endpoint to input port.
    pub inputs: Vec<PortBinding>,
    /// Receiver endpoint to output port.
    pub outputs: Vec<PortBinding>,
}

impl SwitchConfig {
    pub(crate) fn validate(&self, name: &str) -> Result<(), Error> {
        if self.nr_ports == 0 {
            return Err(Error::config(name, "number of ports must be positive"));
        }
        for (delay, what) in [
            (self.input_buffer_delay, "input buffer delay"),
            (self.switch_fabric_delay, "switch fabric delay"),
            (self.output_buffer_delay, "output buffer delay"),
        ] {
            if delay == Nanosecs::ZERO {
                return Err(Error::config(name, format!("{what} must be positive")));
            }
        }
        check_port_map(name, self.nr_ports, &self.port_map())
    }

    pub(crate) fn port_map(&self) -> PortMap {
        PortMap::new(&self.inputs, &self.outputs)
    }

    pub(crate) fn build<P>(&self, id: ElementId) -> Result<BasicSwitch<P>, Error> {
        self.validate(&format!("switch {id}"))?;
        Ok(BasicSwitch {
            id,
            ports: self.port_map(),
            input_delay: self.input_buffer_delay.into_delta(),
            fabric_delay: self.switch_fabric_delay.into_delta(),
            output_delay: self.output_buffer_delay.into_delta(),
            inputs: Ports::new(self.nr_ports),
            fabric: TimedQueue::default(),
            outputs: Ports::new(self.nr_ports),
        })
    }
}

pub(crate) fn check_port_map(name: &str, nr_ports: usize, ports: &PortMap) -> Result<(), Error> {
    match ports.max_port() {
        Some(max) if max.inner() >= nr_ports => Err(Error::config(
            name,
            format!("port {max} out of range for {nr_ports} ports"),
        )),
        _ => Ok(()),
    }
}

/// A store-and-forward switch with a single shared fabric.
///
/// Every message passes an input buffer, the fabric, and an output buffer, each adding a fixed
/// delay on top of whatever is already queued there. Because the fabric is one queue, all
/// traffic through the switch is serialized regardless of which ports it uses.
#[derive(Debug)]
pub struct BasicSwitch<P> {
    id: ElementId,
    ports: PortMap,
    input_delay: Delta,
    fabric_delay: Delta,
    output_delay: Delta,

    inputs: Ports<TimedQueue<Transit<P>>>,
    fabric: TimedQueue<Transit<P>>,
    outputs: Ports<TimedQueue<Transit<P>>>,
}

impl<P> BasicSwitch<P> {
    fn queues(&self) -> impl Iterator<Item = &TimedQueue<Transit<P>>> {
        self.inputs
            .iter()
            .chain(std::iter::once(&self.fabric))
            .chain(self.outputs.iter())
    }

    /// Number of messages held anywhere in the switch.
    pub fn backlog(&self) -> usize {
        self.queues().map(TimedQueue::len).sum()
    }
}

impl<P> NetworkElement<P> for BasicSwitch<P> {
    fn id(&self) -> ElementId {
        self.id
    }

    fn accept(
        &mut self,
        dest: EndpointId,
        msg: Message<P>,
        now: Time,
    ) -> Result<Effects<P>, Error> {
        let ctx = Context::new(now);
        let port = self.ports.input(msg.source)?;
        let queue = &mut self.inputs[port];
        let due = queue.tail_or(now) + self.input_delay;
        debug!(element = %self.id, %port, %dest, due = %due, "switch accepted");
        queue.push(due, Transit::new(dest, msg));
        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn process(&mut self, now: Time) -> Result<Effects<P>, Error> {
        check_missed(self.id, self.next_wakeup(), now);
        let mut ctx = Context::new(now);

        // Input buffers to the fabric
        for input in self.inputs.iter_mut() {
            while let Some(transit) = input.pop_due(now) {
                let due = self.fabric.tail_or(now) + self.fabric_delay;
                trace!(element = %self.id, dest = %transit.dest, due = %due, "into fabric");
                self.fabric.push(due, transit);
            }
        }

        // Fabric to output buffers
        while let Some(transit) = self.fabric.peek_due(now) {
            let port = self.ports.output(transit.dest)?;
            let Some(transit) = self.fabric.pop_due(now) else {
                break;
            };
            let output = &mut self.outputs[port];
            let due = output.tail_or(now) + self.output_delay;
            trace!(element = %self.id, %port, dest = %transit.dest, due = %due, "into output buffer");
            output.push(due, transit);
        }

        // Output buffers to receivers
        for output in self.outputs.iter_mut() {
            while let Some(transit) = output.pop_due(now) {
                debug!(element = %self.id, dest = %transit.dest, at = %now, "switch delivered");
                ctx.deliver(transit);
            }
        }

        Ok(ctx.into_effects(self.next_wakeup()))
    }

    fn reset(&mut self) {
        self.inputs.iter_mut().for_each(TimedQueue::clear);
        self.fabric.clear();
        self.outputs.iter_mut().for_each(TimedQueue::clear);
    }

    fn next_wakeup(&self) -> Option<Time> {
        queue::next_wakeup(self.queues())
    }
}
